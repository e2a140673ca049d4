use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::staff::{CreateStaffRequest, Staff, StaffPublic, UpdateStaffRequest};
use crate::services::events;
use crate::AppState;

pub async fn list_staff(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let staff: Vec<Staff> = sqlx::query_as("SELECT * FROM staff ORDER BY created_at DESC")
        .fetch_all(&state.db)
        .await?;

    let list: Vec<StaffPublic> = staff.iter().map(StaffPublic::from).collect();
    Ok(Json(json!({ "staff": list })))
}

pub async fn get_staff(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let staff: Staff = sqlx::query_as("SELECT * FROM staff WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Staff member not found".into()))?;

    Ok(Json(json!({ "staff": StaffPublic::from(&staff) })))
}

async fn phone_taken(state: &AppState, phone: &str, exclude: Option<Uuid>) -> AppResult<bool> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM staff WHERE phone = $1 AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(phone)
    .bind(exclude)
    .fetch_one(&state.db)
    .await?;
    Ok(taken)
}

async fn login_taken(state: &AppState, login: &str, exclude: Option<Uuid>) -> AppResult<bool> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM staff WHERE login = $1 AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(login)
    .bind(exclude)
    .fetch_one(&state.db)
    .await?;
    Ok(taken)
}

fn hash_password(password: &str) -> AppResult<String> {
    bcrypt::hash(password, 10).map_err(|e| AppError::Internal(e.to_string()))
}

pub async fn create_staff(
    State(state): State<AppState>,
    Json(body): Json<CreateStaffRequest>,
) -> AppResult<Json<Value>> {
    if phone_taken(&state, &body.phone, None).await? {
        return Err(AppError::DuplicatePhone);
    }

    // Credentials are stored only for roles that carry them; everyone else
    // has login and password dropped on the floor.
    let (login, password_hash) = if body.role.stores_credentials() {
        if body.role.requires_credentials() && (body.login.is_none() || body.password.is_none()) {
            return Err(AppError::Validation(
                "login and password are required for this role".into(),
            ));
        }
        let hash = body.password.as_deref().map(hash_password).transpose()?;
        (body.login.clone(), hash)
    } else {
        (None, None)
    };

    if let Some(ref login) = login {
        if login_taken(&state, login, None).await? {
            return Err(AppError::DuplicateLogin);
        }
    }

    let staff: Staff = sqlx::query_as(
        r#"INSERT INTO staff (first_name, last_name, phone, login, password_hash, role, position, address, salary)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *"#,
    )
    .bind(&body.first_name)
    .bind(&body.last_name)
    .bind(&body.phone)
    .bind(&login)
    .bind(&password_hash)
    .bind(body.role)
    .bind(body.position.as_deref().unwrap_or(""))
    .bind(&body.address)
    .bind(body.salary.unwrap_or(0))
    .fetch_one(&state.db)
    .await?;

    let public = StaffPublic::from(&staff);
    state.events.emit(events::NEW_ADMIN, json!(&public));
    Ok(Json(json!({ "staff": public })))
}

pub async fn update_staff(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStaffRequest>,
) -> AppResult<Json<Value>> {
    let existing: Staff = sqlx::query_as("SELECT * FROM staff WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Staff member not found".into()))?;

    if let Some(ref phone) = body.phone {
        if phone_taken(&state, phone, Some(id)).await? {
            return Err(AppError::DuplicatePhone);
        }
    }

    let role = body.role.unwrap_or(existing.role);

    // Login changes ride along with a password change for credentialed roles;
    // a role change away from credentials wipes both.
    let (login, password_hash) = if role.stores_credentials() {
        match body.password.as_deref() {
            Some(password) => {
                let login = body.login.clone().or(existing.login.clone());
                (login, Some(hash_password(password)?))
            }
            None => (existing.login.clone(), existing.password_hash.clone()),
        }
    } else {
        (None, None)
    };

    if let Some(ref login) = login {
        if login_taken(&state, login, Some(id)).await? {
            return Err(AppError::DuplicateLogin);
        }
    }

    let staff: Staff = sqlx::query_as(
        r#"UPDATE staff SET
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            phone = COALESCE($4, phone),
            login = $5,
            password_hash = $6,
            role = $7,
            position = COALESCE($8, position),
            address = COALESCE($9, address),
            salary = COALESCE($10, salary),
            is_active = COALESCE($11, is_active),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *"#,
    )
    .bind(id)
    .bind(&body.first_name)
    .bind(&body.last_name)
    .bind(&body.phone)
    .bind(&login)
    .bind(&password_hash)
    .bind(role)
    .bind(&body.position)
    .bind(&body.address)
    .bind(body.salary)
    .bind(body.is_active)
    .fetch_one(&state.db)
    .await?;

    let public = StaffPublic::from(&staff);
    state.events.emit(events::ADMIN_UPDATED, json!(&public));
    Ok(Json(json!({ "staff": public })))
}

pub async fn delete_staff(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let deleted = sqlx::query("DELETE FROM staff WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Staff member not found".into()));
    }

    state.events.emit(events::ADMIN_DELETED, json!({ "id": id }));
    Ok(Json(json!({ "deleted": true })))
}
