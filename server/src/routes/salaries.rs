use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::booking::parse_day_range;
use crate::models::salary::{
    agent_bonus, current_month, month_bounds, settle, AgentBookingFigures, Currency,
    PaySalaryRequest, SalaryPayment, StaffStatementLine, StatementStaff,
};
use crate::models::staff::{Role, Staff};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StatementQuery {
    pub month: Option<String>,
}

/// Monthly salary statement for every active staff member. Agents are owed
/// their commission over the month's bookings; everyone else is owed their
/// fixed salary. Payouts already recorded for the month count against the owed
/// amount, floored at zero.
pub async fn monthly_statement(
    State(state): State<AppState>,
    Query(q): Query<StatementQuery>,
) -> AppResult<Json<Value>> {
    let month = q.month.unwrap_or_else(current_month);
    let (from, to) = month_bounds(&month)?;

    let staff: Vec<Staff> =
        sqlx::query_as("SELECT * FROM staff WHERE is_active = true ORDER BY first_name, last_name")
            .fetch_all(&state.db)
            .await?;

    let figure_rows: Vec<(Uuid, i64, i64, i64)> = sqlx::query_as(
        r#"SELECT b.agent_id,
            (SELECT COUNT(*) FROM booking_members m
                WHERE m.booking_id = b.id)::bigint AS member_count,
            COALESCE(p.min_price, 0) AS min_price,
            COALESCE((SELECT SUM(pay.amount) FROM booking_payments pay
                WHERE pay.booking_id = b.id), 0)::bigint AS paid_amount
        FROM bookings b
        LEFT JOIN packages p ON p.id = b.package_id
        WHERE b.agent_id IS NOT NULL
          AND b.created_at BETWEEN $1 AND $2"#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(&state.db)
    .await?;

    let mut figures_by_agent: HashMap<Uuid, Vec<AgentBookingFigures>> = HashMap::new();
    for (agent_id, member_count, min_price, paid_amount) in figure_rows {
        figures_by_agent
            .entry(agent_id)
            .or_default()
            .push(AgentBookingFigures {
                member_count,
                min_price,
                paid_amount,
            });
    }

    let paid_rows: Vec<(Uuid, i64)> = sqlx::query_as(
        r#"SELECT staff_id, COALESCE(SUM(amount), 0)::bigint
        FROM salary_payments WHERE month = $1 GROUP BY staff_id"#,
    )
    .bind(&month)
    .fetch_all(&state.db)
    .await?;
    let paid_by_staff: HashMap<Uuid, i64> = paid_rows.into_iter().collect();

    let mut lines = Vec::with_capacity(staff.len());
    let (mut total_must_pay, mut total_paid, mut total_debt) = (0i64, 0i64, 0i64);
    for s in &staff {
        let must_pay = if s.role == Role::Agent {
            agent_bonus(
                figures_by_agent
                    .get(&s.id)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]),
            )
        } else {
            s.salary
        };
        let already_paid = paid_by_staff.get(&s.id).copied().unwrap_or(0);
        let (debt, paid) = settle(must_pay, already_paid);

        total_must_pay += must_pay;
        total_paid += already_paid;
        total_debt += debt;

        lines.push(StaffStatementLine {
            staff: StatementStaff {
                id: s.id,
                name: format!("{} {}", s.first_name, s.last_name),
                role: s.role,
                position: s.position.clone(),
            },
            month: month.clone(),
            must_pay,
            already_paid,
            debt,
            paid,
        });
    }

    Ok(Json(json!({
        "month": month,
        "totalMustPay": total_must_pay,
        "totalPaid": total_paid,
        "totalDebt": total_debt,
        "list": lines,
    })))
}

/// Records a payout towards a staff member's month. The history is append
/// only; the statement always derives the remaining debt from the sum.
pub async fn pay_salary(
    State(state): State<AppState>,
    Json(body): Json<PaySalaryRequest>,
) -> AppResult<Json<Value>> {
    if body.amount <= 0 {
        return Err(AppError::InvalidAmount("payout amount must be positive".into()));
    }
    month_bounds(&body.month)?;

    let staff: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM staff WHERE id = $1 AND is_active = true")
            .bind(body.staff_id)
            .fetch_optional(&state.db)
            .await?;
    if staff.is_none() {
        return Err(AppError::NotFound("Staff member not found".into()));
    }

    let payment: SalaryPayment = sqlx::query_as(
        r#"INSERT INTO salary_payments (staff_id, month, amount, payment_type, currency)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *"#,
    )
    .bind(body.staff_id)
    .bind(&body.month)
    .bind(body.amount)
    .bind(body.payment_type)
    .bind(body.currency.unwrap_or(Currency::Uzs))
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({ "payment": payment })))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    #[sqlx(flatten)]
    payment: SalaryPayment,
    staff_name: Option<String>,
}

/// Payout history over a day range, defaulting to the current month.
pub async fn salary_history(
    State(state): State<AppState>,
    Query(q): Query<HistoryQuery>,
) -> AppResult<Json<Value>> {
    let (from, to) = if q.start_date.is_some() || q.end_date.is_some() {
        parse_day_range(q.start_date.as_deref(), q.end_date.as_deref())?
    } else {
        month_bounds(&current_month())?
    };

    let rows: Vec<HistoryRow> = sqlx::query_as(
        r#"SELECT sp.id, sp.staff_id, sp.month, sp.amount, sp.payment_type, sp.currency,
            sp.created_at,
            s.first_name || ' ' || s.last_name AS staff_name
        FROM salary_payments sp
        LEFT JOIN staff s ON s.id = sp.staff_id
        WHERE sp.created_at BETWEEN $1 AND $2
        ORDER BY sp.created_at DESC"#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(&state.db)
    .await?;

    let total: i64 = rows.iter().map(|r| r.payment.amount).sum();
    let payments: Vec<Value> = rows
        .into_iter()
        .map(|r| {
            let mut v = json!(r.payment);
            v["staffName"] = json!(r.staff_name);
            v
        })
        .collect();

    Ok(Json(json!({
        "startDate": from,
        "endDate": to,
        "total": total,
        "payments": payments,
    })))
}
