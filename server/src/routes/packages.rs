use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::package::{
    capacity_percentage, CreatePackageRequest, Package, ReserveRequest, UnreserveRequest,
    UpdatePackageRequest,
};
use crate::services::{capacity, events};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PackageListQuery {
    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
    #[serde(rename = "startDate")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(rename = "endDate")]
    pub end_date: Option<DateTime<Utc>>,
}

pub async fn list_packages(
    State(state): State<AppState>,
    Query(q): Query<PackageListQuery>,
) -> AppResult<Json<Value>> {
    let annotated =
        capacity::list_with_occupancy(&state.db, q.is_active, q.start_date, q.end_date).await?;

    let packages: Vec<Value> = annotated
        .into_iter()
        .map(|(p, occ)| {
            let pct = capacity_percentage(p.capacity, occ.taken, occ.reserved);
            let mut v = json!(p);
            v["taken"] = json!(occ.taken);
            v["reserved"] = json!(occ.reserved);
            v["available"] = json!(occ.available);
            v["isFull"] = json!(occ.is_full());
            v["capacityPercentage"] = json!(pct);
            v
        })
        .collect();

    Ok(Json(json!({ "packages": packages })))
}

/// Active packages with room left, annotated with occupancy and the agent
/// holds against them. This is the sales screen's main listing.
pub async fn list_active(
    State(state): State<AppState>,
    Query(q): Query<PackageListQuery>,
) -> AppResult<Json<Value>> {
    let packages =
        capacity::list_active_with_availability(&state.db, q.start_date, q.end_date).await?;
    Ok(Json(json!({ "packages": packages })))
}

pub async fn get_package(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let package = package_with_state(&state, id).await?;
    Ok(Json(json!({ "package": package })))
}

pub async fn create_package(
    State(state): State<AppState>,
    Json(body): Json<CreatePackageRequest>,
) -> AppResult<Json<Value>> {
    if body.capacity <= 0 {
        return Err(AppError::Validation("capacity must be positive".into()));
    }
    if body.title.trim().is_empty() {
        return Err(AppError::Validation("title is required".into()));
    }

    let package: Package = sqlx::query_as(
        r#"INSERT INTO packages (title, capacity, min_price, description, start_date, end_date)
        VALUES ($1, $2, $3, $4, COALESCE($5, NOW()), $6)
        RETURNING *"#,
    )
    .bind(&body.title)
    .bind(body.capacity)
    .bind(body.min_price)
    .bind(&body.description)
    .bind(body.start_date)
    .bind(body.end_date)
    .fetch_one(&state.db)
    .await?;

    state.events.emit(events::NEW_PACKAGE, json!(&package));
    Ok(Json(json!({ "package": package })))
}

pub async fn update_package(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePackageRequest>,
) -> AppResult<Json<Value>> {
    if let Some(capacity) = body.capacity {
        if capacity <= 0 {
            return Err(AppError::Validation("capacity must be positive".into()));
        }
    }

    let package: Package = sqlx::query_as(
        r#"UPDATE packages SET
            title = COALESCE($2, title),
            capacity = COALESCE($3, capacity),
            min_price = COALESCE($4, min_price),
            description = COALESCE($5, description),
            is_active = COALESCE($6, is_active),
            start_date = COALESCE($7, start_date),
            end_date = COALESCE($8, end_date),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *"#,
    )
    .bind(id)
    .bind(&body.title)
    .bind(body.capacity)
    .bind(body.min_price)
    .bind(&body.description)
    .bind(body.is_active)
    .bind(body.start_date)
    .bind(body.end_date)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Package not found".into()))?;

    state.events.emit(events::PACKAGE_UPDATED, json!(&package));
    Ok(Json(json!({ "package": package })))
}

pub async fn delete_package(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let deleted = sqlx::query("DELETE FROM packages WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Package not found".into()));
    }

    state.events.emit(events::PACKAGE_DELETED, json!({ "id": id }));
    Ok(Json(json!({ "deleted": true })))
}

/// Takes a soft hold of capacity for an agent.
pub async fn reserve(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ReserveRequest>,
) -> AppResult<Json<Value>> {
    capacity::reserve(&state.db, id, body.agent_id, body.count).await?;

    let updated = package_with_state(&state, id).await?;
    state.events.emit(events::PACKAGE_UPDATED, updated.clone());
    Ok(Json(json!({ "package": updated })))
}

/// Releases part or all of a hold. The reservation row stays behind even at
/// zero; emptied holds are history, not garbage.
pub async fn unreserve(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UnreserveRequest>,
) -> AppResult<Json<Value>> {
    capacity::unreserve(&state.db, id, body.reservation_id, body.dec_count).await?;

    let updated = package_with_state(&state, id).await?;
    state.events.emit(events::PACKAGE_UPDATED, updated.clone());
    Ok(Json(json!({ "package": updated })))
}

async fn fetch_package(state: &AppState, id: Uuid) -> AppResult<Package> {
    let package: Package = sqlx::query_as("SELECT * FROM packages WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Package not found".into()))?;
    Ok(package)
}

async fn package_with_state(state: &AppState, id: Uuid) -> AppResult<Value> {
    let package = fetch_package(state, id).await?;
    let occ = capacity::occupancy(&state.db, id).await?;
    let reservations = capacity::load_reservations(&state.db, &[id]).await?;

    let mut v = json!(package);
    v["taken"] = json!(occ.taken);
    v["reserved"] = json!(occ.reserved);
    v["available"] = json!(occ.available);
    v["reservations"] = json!(reservations);
    Ok(v)
}
