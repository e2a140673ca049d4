use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::booking::{
    parse_day_range, Booking, CreateBookingRequest, Member, Payment, PaymentSummary,
    RecordPaymentRequest, UpdateBookingRequest,
};
use crate::services::{capacity, events};
use crate::AppState;

/// Booking joined with its package and agent display columns plus the paid
/// total, all in one read.
const BOOKING_SELECT: &str = r#"
SELECT b.id, b.package_id, b.group_name, b.price_per_one, b.total_price, b.is_paid,
    b.region, b.district, b.target, b.agent_id, b.is_active, b.created_at, b.updated_at,
    p.title AS package_title,
    p.min_price AS package_min_price,
    s.first_name || ' ' || s.last_name AS agent_name,
    s.phone AS agent_phone,
    COALESCE((SELECT SUM(pay.amount) FROM booking_payments pay
        WHERE pay.booking_id = b.id), 0)::bigint AS paid_amount
FROM bookings b
LEFT JOIN packages p ON p.id = b.package_id
LEFT JOIN staff s ON s.id = b.agent_id"#;

#[derive(Debug, sqlx::FromRow)]
struct BookingJoined {
    #[sqlx(flatten)]
    booking: Booking,
    package_title: Option<String>,
    package_min_price: Option<i64>,
    agent_name: Option<String>,
    agent_phone: Option<String>,
    paid_amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct BookingListQuery {
    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
}

pub async fn list_bookings(
    State(state): State<AppState>,
    Query(q): Query<BookingListQuery>,
) -> AppResult<Json<Value>> {
    let rows: Vec<BookingJoined> = sqlx::query_as(&format!(
        "{BOOKING_SELECT}
        WHERE ($1::boolean IS NULL OR b.is_active = $1)
        ORDER BY b.created_at DESC"
    ))
    .bind(q.is_active)
    .fetch_all(&state.db)
    .await?;

    let bookings = load_views(&state.db, rows).await?;
    Ok(Json(json!({ "bookings": bookings })))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let booking = booking_view(&state.db, id).await?;
    Ok(Json(json!({ "booking": booking })))
}

pub async fn bookings_by_package(
    State(state): State<AppState>,
    Path(package_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let rows: Vec<BookingJoined> = sqlx::query_as(&format!(
        "{BOOKING_SELECT} WHERE b.package_id = $1 ORDER BY b.created_at DESC"
    ))
    .bind(package_id)
    .fetch_all(&state.db)
    .await?;

    let bookings = load_views(&state.db, rows).await?;
    Ok(Json(json!({ "bookings": bookings })))
}

/// Creates a booking with its member list. When the booking targets a package,
/// the members are admitted against its capacity inside the same transaction
/// that writes them, behind the package row lock.
pub async fn create_booking(
    State(state): State<AppState>,
    Json(body): Json<CreateBookingRequest>,
) -> AppResult<Json<Value>> {
    if body.members.is_empty() {
        return Err(AppError::Validation("at least one member is required".into()));
    }
    if body.target.trim().is_empty() {
        return Err(AppError::Validation("target is required".into()));
    }
    if body.price_per_one < 0 || body.total_price < 0 {
        return Err(AppError::InvalidAmount("prices must not be negative".into()));
    }

    let mut tx = state.db.begin().await?;

    if let Some(package_id) = body.package_id {
        capacity::admit_members(&mut tx, package_id, body.members.len() as i64).await?;
    }

    let is_paid = PaymentSummary::compute(body.total_price, 0).is_paid;
    let (region, district) = match &body.address {
        Some(a) => (a.region.clone(), a.district.clone()),
        None => (None, None),
    };

    let (booking_id,): (Uuid,) = sqlx::query_as(
        r#"INSERT INTO bookings
            (package_id, group_name, price_per_one, total_price, is_paid,
             region, district, target, agent_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id"#,
    )
    .bind(body.package_id)
    .bind(&body.group_name)
    .bind(body.price_per_one)
    .bind(body.total_price)
    .bind(is_paid)
    .bind(&region)
    .bind(&district)
    .bind(&body.target)
    .bind(body.agent_id)
    .fetch_one(&mut *tx)
    .await?;

    for m in &body.members {
        sqlx::query(
            r#"INSERT INTO booking_members
                (booking_id, first_name, last_name, middle_name, birth_date,
                 id_number, id_number_expiry_date, phones)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(booking_id)
        .bind(&m.first_name)
        .bind(&m.last_name)
        .bind(&m.middle_name)
        .bind(m.birth_date)
        .bind(&m.id_number)
        .bind(m.id_number_expiry_date)
        .bind(&m.phones)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let booking = booking_view(&state.db, booking_id).await?;
    state.events.emit(events::NEW_CLIENT, booking.clone());
    Ok(Json(json!({ "booking": booking })))
}

pub async fn update_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateBookingRequest>,
) -> AppResult<Json<Value>> {
    if matches!(body.price_per_one, Some(p) if p < 0)
        || matches!(body.total_price, Some(p) if p < 0)
    {
        return Err(AppError::InvalidAmount("prices must not be negative".into()));
    }

    let (region, district) = match &body.address {
        Some(a) => (a.region.clone(), a.district.clone()),
        None => (None, None),
    };

    let mut tx = state.db.begin().await?;

    let updated: Option<(i64,)> = sqlx::query_as(
        r#"UPDATE bookings SET
            group_name = COALESCE($2, group_name),
            price_per_one = COALESCE($3, price_per_one),
            total_price = COALESCE($4, total_price),
            region = COALESCE($5, region),
            district = COALESCE($6, district),
            target = COALESCE($7, target),
            agent_id = COALESCE($8, agent_id),
            is_active = COALESCE($9, is_active),
            updated_at = NOW()
        WHERE id = $1
        RETURNING total_price"#,
    )
    .bind(id)
    .bind(&body.group_name)
    .bind(body.price_per_one)
    .bind(body.total_price)
    .bind(&region)
    .bind(&district)
    .bind(&body.target)
    .bind(body.agent_id)
    .bind(body.is_active)
    .fetch_optional(&mut *tx)
    .await?;
    let (total_price,) = updated.ok_or_else(|| AppError::NotFound("Booking not found".into()))?;

    // total_price may have moved past or under the paid total, so the paid
    // flag is recomputed from the history rather than trusted.
    let (paid,): (i64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(amount), 0)::bigint FROM booking_payments WHERE booking_id = $1",
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE bookings SET is_paid = $2 WHERE id = $1")
        .bind(id)
        .bind(PaymentSummary::compute(total_price, paid).is_paid)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let booking = booking_view(&state.db, id).await?;
    state.events.emit(events::CLIENT_UPDATED, booking.clone());
    Ok(Json(json!({ "booking": booking })))
}

pub async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let deleted = sqlx::query("DELETE FROM bookings WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Booking not found".into()));
    }

    state.events.emit(events::CLIENT_DELETED, json!({ "id": id }));
    Ok(Json(json!({ "deleted": true })))
}

/// Removes one member from a booking. Removal frees a unit of package
/// capacity, so it takes the package row lock like any admission does.
pub async fn delete_member(
    State(state): State<AppState>,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Value>> {
    let mut tx = state.db.begin().await?;

    let booking: Option<(Option<Uuid>,)> =
        sqlx::query_as("SELECT package_id FROM bookings WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    let (package_id,) = booking.ok_or_else(|| AppError::NotFound("Booking not found".into()))?;

    capacity::lock_booking_package(&mut tx, package_id).await?;

    let deleted = sqlx::query("DELETE FROM booking_members WHERE id = $1 AND booking_id = $2")
        .bind(member_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Member not found".into()));
    }

    tx.commit().await?;

    let booking = booking_view(&state.db, id).await?;
    state.events.emit(events::CLIENT_UPDATED, booking.clone());
    Ok(Json(json!({ "booking": booking })))
}

/// Appends a payment to the booking's history and recomputes the paid state
/// from the new total. The booking row is locked so two tellers posting at
/// once both land in the history and the final flag reflects the full sum.
pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RecordPaymentRequest>,
) -> AppResult<Json<Value>> {
    if body.amount <= 0 {
        return Err(AppError::InvalidAmount("payment amount must be positive".into()));
    }

    let mut tx = state.db.begin().await?;

    let booking: Option<(i64,)> =
        sqlx::query_as("SELECT total_price FROM bookings WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    let (total_price,) = booking.ok_or_else(|| AppError::NotFound("Booking not found".into()))?;

    let payment: Payment = sqlx::query_as(
        r#"INSERT INTO booking_payments (booking_id, amount, payment_type)
        VALUES ($1, $2, COALESCE($3, 'cash'))
        RETURNING id, booking_id, amount, payment_type, paid_at"#,
    )
    .bind(id)
    .bind(body.amount)
    .bind(body.payment_type)
    .fetch_one(&mut *tx)
    .await?;

    let (paid,): (i64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(amount), 0)::bigint FROM booking_payments WHERE booking_id = $1",
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    let summary = PaymentSummary::compute(total_price, paid);
    sqlx::query("UPDATE bookings SET is_paid = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(summary.is_paid)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    state.events.emit(
        events::CLIENT_UPDATED,
        json!({ "id": id, "isPaid": summary.is_paid }),
    );
    Ok(Json(json!({
        "bookingId": id,
        "payment": payment,
        "summary": summary,
    })))
}

/// Bookings whose payment history has not covered the agreed price yet.
pub async fn debtors(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let rows: Vec<BookingJoined> = sqlx::query_as(&format!(
        "SELECT * FROM ({BOOKING_SELECT}) t
        WHERE t.total_price > t.paid_amount AND t.is_active = true
        ORDER BY t.created_at DESC"
    ))
    .fetch_all(&state.db)
    .await?;

    let total_debt: i64 = rows
        .iter()
        .map(|r| r.booking.total_price - r.paid_amount)
        .sum();
    let debtors = load_views(&state.db, rows).await?;
    Ok(Json(json!({ "totalDebt": total_debt, "debtors": debtors })))
}

#[derive(Debug, Deserialize)]
pub struct PaymentRangeQuery {
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRangeRow {
    #[sqlx(flatten)]
    payment: Payment,
    group_name: Option<String>,
    target: String,
    total_price: i64,
    agent_name: Option<String>,
}

/// Payments whose `paid_at` falls inside an inclusive day range, grouped by
/// booking with per-booking and grand totals.
pub async fn payments_in_range(
    State(state): State<AppState>,
    Query(q): Query<PaymentRangeQuery>,
) -> AppResult<Json<Value>> {
    let (from, to) = parse_day_range(q.start_date.as_deref(), q.end_date.as_deref())?;

    let rows: Vec<PaymentRangeRow> = sqlx::query_as(
        r#"SELECT pay.id, pay.booking_id, pay.amount, pay.payment_type, pay.paid_at,
            b.group_name, b.target, b.total_price,
            s.first_name || ' ' || s.last_name AS agent_name
        FROM booking_payments pay
        JOIN bookings b ON b.id = pay.booking_id
        LEFT JOIN staff s ON s.id = b.agent_id
        WHERE pay.paid_at BETWEEN $1 AND $2
        ORDER BY pay.paid_at DESC"#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(&state.db)
    .await?;

    let grand_total: i64 = rows.iter().map(|r| r.payment.amount).sum();

    let mut order: Vec<Uuid> = Vec::new();
    let mut grouped: HashMap<Uuid, Value> = HashMap::new();
    for r in rows {
        let entry = grouped.entry(r.payment.booking_id).or_insert_with(|| {
            order.push(r.payment.booking_id);
            json!({
                "bookingId": r.payment.booking_id,
                "groupName": r.group_name,
                "target": r.target,
                "totalPrice": r.total_price,
                "agentName": r.agent_name,
                "paidInRange": 0,
                "payments": [],
            })
        });
        entry["paidInRange"] =
            json!(entry["paidInRange"].as_i64().unwrap_or(0) + r.payment.amount);
        if let Some(payments) = entry["payments"].as_array_mut() {
            payments.push(json!(r.payment));
        }
    }

    let bookings: Vec<Value> = order
        .iter()
        .filter_map(|id| grouped.remove(id))
        .collect();

    Ok(Json(json!({
        "startDate": from,
        "endDate": to,
        "totalPaid": grand_total,
        "bookings": bookings,
    })))
}

/// Distinct regions and districts seen across bookings, for address pickers.
pub async fn addresses(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let regions: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT region FROM bookings WHERE region IS NOT NULL ORDER BY region",
    )
    .fetch_all(&state.db)
    .await?;
    let districts: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT district FROM bookings WHERE district IS NOT NULL ORDER BY district",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({
        "regions": regions.into_iter().map(|(r,)| r).collect::<Vec<_>>(),
        "districts": districts.into_iter().map(|(d,)| d).collect::<Vec<_>>(),
    })))
}

async fn booking_view(db: &PgPool, id: Uuid) -> AppResult<Value> {
    let row: Option<BookingJoined> =
        sqlx::query_as(&format!("{BOOKING_SELECT} WHERE b.id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?;
    let row = row.ok_or_else(|| AppError::NotFound("Booking not found".into()))?;

    let mut views = load_views(db, vec![row]).await?;
    views
        .pop()
        .ok_or_else(|| AppError::NotFound("Booking not found".into()))
}

/// Attaches members and payment history to joined booking rows, loading both
/// in one batch per table instead of per booking.
async fn load_views(db: &PgPool, rows: Vec<BookingJoined>) -> AppResult<Vec<Value>> {
    let ids: Vec<Uuid> = rows.iter().map(|r| r.booking.id).collect();

    let members: Vec<Member> = sqlx::query_as(
        "SELECT * FROM booking_members WHERE booking_id = ANY($1) ORDER BY last_name, first_name",
    )
    .bind(&ids)
    .fetch_all(db)
    .await?;
    let payments: Vec<Payment> = sqlx::query_as(
        "SELECT * FROM booking_payments WHERE booking_id = ANY($1) ORDER BY paid_at",
    )
    .bind(&ids)
    .fetch_all(db)
    .await?;

    let mut members_by: HashMap<Uuid, Vec<Member>> = HashMap::new();
    for m in members {
        members_by.entry(m.booking_id).or_default().push(m);
    }
    let mut payments_by: HashMap<Uuid, Vec<Payment>> = HashMap::new();
    for p in payments {
        payments_by.entry(p.booking_id).or_default().push(p);
    }

    Ok(rows
        .into_iter()
        .map(|r| {
            let members = members_by.remove(&r.booking.id).unwrap_or_default();
            let payments = payments_by.remove(&r.booking.id).unwrap_or_default();
            let summary = PaymentSummary::compute(r.booking.total_price, r.paid_amount);

            let package = r.booking.package_id.map(|pid| {
                json!({
                    "id": pid,
                    "title": r.package_title,
                    "minPrice": r.package_min_price,
                })
            });
            let agent = r.booking.agent_id.map(|aid| {
                json!({
                    "id": aid,
                    "name": r.agent_name,
                    "phone": r.agent_phone,
                })
            });

            let mut v = json!(r.booking);
            v["isPaid"] = json!(summary.is_paid);
            v["paidAmount"] = json!(summary.total_paid);
            v["remainingDebt"] = json!(summary.remaining_debt);
            v["memberCount"] = json!(members.len());
            v["members"] = json!(members);
            v["paymentHistory"] = json!(payments);
            v["package"] = package.unwrap_or(Value::Null);
            v["agent"] = agent.unwrap_or(Value::Null);
            v
        })
        .collect())
}
