use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::generate_token;
use crate::models::staff::{LoginRequest, Staff, StaffPublic};
use crate::AppState;

/// Staff sign-in. Agents hold no credentials and may not sign in even if a
/// password was somehow stored for them.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<Value>> {
    let staff: Staff = sqlx::query_as("SELECT * FROM staff WHERE login = $1")
        .bind(&body.login)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !staff.role.may_sign_in() {
        return Err(AppError::RoleForbidden("Agents may not sign in".into()));
    }

    let hash = staff
        .password_hash
        .as_deref()
        .ok_or(AppError::InvalidCredentials)?;
    let valid =
        bcrypt::verify(&body.password, hash).map_err(|e| AppError::Internal(e.to_string()))?;
    if !valid {
        return Err(AppError::InvalidCredentials);
    }

    let token = generate_token(
        staff.id,
        staff.role,
        &state.config.jwt.secret,
        state.config.jwt.expiry_secs,
    )?;

    Ok(Json(json!({
        "token": token,
        "staff": StaffPublic::from(&staff),
    })))
}
