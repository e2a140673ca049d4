use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::booking::parse_day_range;
use crate::models::expense::ExpenseKind;
use crate::models::salary::{current_month, month_bounds, Currency};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub month: Option<String>,
}

/// One-call aggregation for the back-office dashboard: sales, collections,
/// expenses, salaries and the breakdowns by agent, target and address, all
/// over one month.
pub async fn dashboard(
    State(state): State<AppState>,
    Query(q): Query<DashboardQuery>,
) -> AppResult<Json<Value>> {
    let month = q.month.unwrap_or_else(current_month);
    let (from, to) = month_bounds(&month)?;

    let (booking_count, total_sales): (i64, i64) = sqlx::query_as(
        r#"SELECT COUNT(*), COALESCE(SUM(total_price), 0)::bigint
        FROM bookings WHERE created_at BETWEEN $1 AND $2"#,
    )
    .bind(from)
    .bind(to)
    .fetch_one(&state.db)
    .await?;

    let (total_collected,): (i64,) = sqlx::query_as(
        r#"SELECT COALESCE(SUM(amount), 0)::bigint
        FROM booking_payments WHERE paid_at BETWEEN $1 AND $2"#,
    )
    .bind(from)
    .bind(to)
    .fetch_one(&state.db)
    .await?;

    let expense_rows: Vec<(ExpenseKind, Currency, i64)> = sqlx::query_as(
        r#"SELECT kind, currency, COALESCE(SUM(amount), 0)::bigint
        FROM expenses WHERE created_at BETWEEN $1 AND $2
        GROUP BY kind, currency"#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(&state.db)
    .await?;
    let expenses: Vec<Value> = expense_rows
        .into_iter()
        .map(|(kind, currency, total)| {
            json!({ "kind": kind, "currency": currency, "total": total })
        })
        .collect();

    let (salaries_paid,): (i64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(amount), 0)::bigint FROM salary_payments WHERE month = $1",
    )
    .bind(&month)
    .fetch_one(&state.db)
    .await?;

    let agent_rows: Vec<(Uuid, String, i64, i64)> = sqlx::query_as(
        r#"SELECT s.id, s.first_name || ' ' || s.last_name AS name,
            COUNT(b.id), COALESCE(SUM(b.total_price), 0)::bigint
        FROM staff s
        JOIN bookings b ON b.agent_id = s.id AND b.created_at BETWEEN $1 AND $2
        GROUP BY s.id, name
        ORDER BY COALESCE(SUM(b.total_price), 0) DESC"#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(&state.db)
    .await?;
    let agents: Vec<Value> = agent_rows
        .into_iter()
        .map(|(id, name, bookings, sales)| {
            json!({ "id": id, "name": name, "bookings": bookings, "sales": sales })
        })
        .collect();

    let target_rows: Vec<(String, i64, i64)> = sqlx::query_as(
        r#"SELECT target, COUNT(*), COALESCE(SUM(total_price), 0)::bigint
        FROM bookings WHERE created_at BETWEEN $1 AND $2
        GROUP BY target ORDER BY COUNT(*) DESC"#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(&state.db)
    .await?;
    let targets: Vec<Value> = target_rows
        .into_iter()
        .map(|(target, count, sales)| {
            json!({ "target": target, "count": count, "sales": sales })
        })
        .collect();

    let region_rows: Vec<(String, i64)> = sqlx::query_as(
        r#"SELECT region, COUNT(*) FROM bookings
        WHERE region IS NOT NULL AND created_at BETWEEN $1 AND $2
        GROUP BY region ORDER BY COUNT(*) DESC"#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(&state.db)
    .await?;
    let district_rows: Vec<(String, i64)> = sqlx::query_as(
        r#"SELECT district, COUNT(*) FROM bookings
        WHERE district IS NOT NULL AND created_at BETWEEN $1 AND $2
        GROUP BY district ORDER BY COUNT(*) DESC"#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(&state.db)
    .await?;

    let regions: Vec<Value> = region_rows
        .into_iter()
        .map(|(region, count)| json!({ "region": region, "count": count }))
        .collect();
    let districts: Vec<Value> = district_rows
        .into_iter()
        .map(|(district, count)| json!({ "district": district, "count": count }))
        .collect();

    Ok(Json(json!({
        "month": month,
        "sales": {
            "bookings": booking_count,
            "total": total_sales,
            "collected": total_collected,
        },
        "expenses": expenses,
        "salariesPaid": salaries_paid,
        "agents": agents,
        "targets": targets,
        "regions": regions,
        "districts": districts,
    })))
}

/// The kassa screen: today's cash flow plus the outstanding debt across all
/// bookings. Debt here is the raw price-minus-paid balance, so overpaid
/// bookings reduce the total.
pub async fn kassa(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let today = Utc::now().format("%Y-%m-%d").to_string();
    let (from, to) = parse_day_range(Some(&today), Some(&today))?;

    let (collected_today,): (i64,) = sqlx::query_as(
        r#"SELECT COALESCE(SUM(amount), 0)::bigint
        FROM booking_payments WHERE paid_at BETWEEN $1 AND $2"#,
    )
    .bind(from)
    .bind(to)
    .fetch_one(&state.db)
    .await?;

    let expense_rows: Vec<(ExpenseKind, Currency, i64)> = sqlx::query_as(
        r#"SELECT kind, currency, COALESCE(SUM(amount), 0)::bigint
        FROM expenses WHERE created_at BETWEEN $1 AND $2
        GROUP BY kind, currency"#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(&state.db)
    .await?;
    let expenses_today: Vec<Value> = expense_rows
        .into_iter()
        .map(|(kind, currency, total)| {
            json!({ "kind": kind, "currency": currency, "total": total })
        })
        .collect();

    let (total_debt,): (i64,) = sqlx::query_as(
        r#"SELECT COALESCE(SUM(b.total_price
            - COALESCE((SELECT SUM(pay.amount) FROM booking_payments pay
                WHERE pay.booking_id = b.id), 0)), 0)::bigint
        FROM bookings b WHERE b.is_active = true"#,
    )
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({
        "date": today,
        "collectedToday": collected_today,
        "expensesToday": expenses_today,
        "totalDebt": total_debt,
    })))
}
