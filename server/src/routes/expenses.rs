use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::booking::parse_day_range;
use crate::models::expense::{
    CreateExpenseRequest, Expense, ExpenseKind, UpdateExpenseRequest,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ExpenseListQuery {
    pub kind: Option<ExpenseKind>,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}

pub async fn list_expenses(
    State(state): State<AppState>,
    Query(q): Query<ExpenseListQuery>,
) -> AppResult<Json<Value>> {
    let range = if q.start_date.is_some() || q.end_date.is_some() {
        Some(parse_day_range(q.start_date.as_deref(), q.end_date.as_deref())?)
    } else {
        None
    };
    let (from, to) = range.map_or((None, None), |(f, t)| (Some(f), Some(t)));

    let expenses: Vec<Expense> = sqlx::query_as(
        r#"SELECT * FROM expenses
        WHERE ($1::text IS NULL OR kind = $1)
          AND ($2::timestamptz IS NULL OR created_at >= $2)
          AND ($3::timestamptz IS NULL OR created_at <= $3)
        ORDER BY created_at DESC"#,
    )
    .bind(q.kind)
    .bind(from)
    .bind(to)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "expenses": expenses })))
}

pub async fn create_expense(
    State(state): State<AppState>,
    Json(body): Json<CreateExpenseRequest>,
) -> AppResult<Json<Value>> {
    if body.amount <= 0 {
        return Err(AppError::InvalidAmount("amount must be positive".into()));
    }
    if body.category.trim().is_empty() {
        return Err(AppError::Validation("category is required".into()));
    }

    let expense: Expense = sqlx::query_as(
        r#"INSERT INTO expenses
            (kind, payment_method, currency, category, amount, description, worker_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *"#,
    )
    .bind(body.kind)
    .bind(body.payment_method)
    .bind(body.currency)
    .bind(&body.category)
    .bind(body.amount)
    .bind(&body.description)
    .bind(body.worker_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({ "expense": expense })))
}

pub async fn update_expense(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateExpenseRequest>,
) -> AppResult<Json<Value>> {
    if matches!(body.amount, Some(a) if a <= 0) {
        return Err(AppError::InvalidAmount("amount must be positive".into()));
    }

    let expense: Expense = sqlx::query_as(
        r#"UPDATE expenses SET
            kind = COALESCE($2, kind),
            payment_method = COALESCE($3, payment_method),
            currency = COALESCE($4, currency),
            category = COALESCE($5, category),
            amount = COALESCE($6, amount),
            description = COALESCE($7, description),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *"#,
    )
    .bind(id)
    .bind(body.kind)
    .bind(body.payment_method)
    .bind(body.currency)
    .bind(&body.category)
    .bind(body.amount)
    .bind(&body.description)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Expense not found".into()))?;

    Ok(Json(json!({ "expense": expense })))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let deleted = sqlx::query("DELETE FROM expenses WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Expense not found".into()));
    }
    Ok(Json(json!({ "deleted": true })))
}
