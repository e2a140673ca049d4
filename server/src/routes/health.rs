use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::AppState;

pub async fn health(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let postgres = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();

    Ok(Json(json!({
        "status": if postgres { "ok" } else { "degraded" },
        "postgres": postgres,
        "timestamp": Utc::now(),
    })))
}
