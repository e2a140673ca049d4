use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::booking::PaymentType;
use crate::models::staff::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum Currency {
    #[serde(rename = "UZS")]
    #[sqlx(rename = "UZS")]
    Uzs,
    #[serde(rename = "USD")]
    #[sqlx(rename = "USD")]
    Usd,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SalaryPayment {
    pub id: Uuid,
    pub staff_id: Uuid,
    pub month: String,
    pub amount: i64,
    pub payment_type: PaymentType,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct PaySalaryRequest {
    #[serde(rename = "staffId")]
    pub staff_id: Uuid,
    pub amount: i64,
    pub month: String,
    #[serde(rename = "paymentType")]
    pub payment_type: PaymentType,
    pub currency: Option<Currency>,
}

/// Per-booking figures needed to settle an agent's commission.
#[derive(Debug, Clone, Copy)]
pub struct AgentBookingFigures {
    pub member_count: i64,
    pub min_price: i64,
    pub paid_amount: i64,
}

/// Agent bonus: commission collected above the package floor price, summed
/// only where positive. A losing booking never offsets a winning one.
pub fn agent_bonus(bookings: &[AgentBookingFigures]) -> i64 {
    bookings
        .iter()
        .map(|b| (b.paid_amount - b.member_count * b.min_price).max(0))
        .sum()
}

/// What one staff member is owed for a month, before and after payouts.
#[derive(Debug, Clone, Serialize)]
pub struct StaffStatementLine {
    pub staff: StatementStaff,
    pub month: String,
    #[serde(rename = "mustPay")]
    pub must_pay: i64,
    #[serde(rename = "alreadyPaid")]
    pub already_paid: i64,
    pub debt: i64,
    pub paid: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatementStaff {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub position: String,
}

pub fn settle(must_pay: i64, already_paid: i64) -> (i64, bool) {
    ((must_pay - already_paid).max(0), already_paid > 0)
}

/// `YYYY-MM` month key used by salary records and the dashboard.
pub fn current_month() -> String {
    Utc::now().format("%Y-%m").to_string()
}

/// Resolves a month key to its inclusive timestamp bounds.
pub fn month_bounds(month: &str) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let parsed = NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .map_err(|_| AppError::InvalidDateRange(format!("invalid month '{month}', expected YYYY-MM")))?;

    let (next_y, next_m) = if parsed.month() == 12 {
        (parsed.year() + 1, 1)
    } else {
        (parsed.year(), parsed.month() + 1)
    };
    let first_of_next = NaiveDate::from_ymd_opt(next_y, next_m, 1)
        .ok_or_else(|| AppError::InvalidDateRange(format!("invalid month '{month}'")))?;

    let start = Utc.from_utc_datetime(&parsed.and_hms_opt(0, 0, 0).unwrap());
    let end = Utc.from_utc_datetime(
        &first_of_next
            .pred_opt()
            .unwrap()
            .and_hms_micro_opt(23, 59, 59, 999_999)
            .unwrap(),
    );
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn figures(member_count: i64, min_price: i64, paid_amount: i64) -> AgentBookingFigures {
        AgentBookingFigures {
            member_count,
            min_price,
            paid_amount,
        }
    }

    #[test]
    fn bonus_is_profit_above_floor_price() {
        // 3 members at a 1M floor, 4M collected -> 1M bonus
        let b = [figures(3, 1_000_000, 4_000_000)];
        assert_eq!(agent_bonus(&b), 1_000_000);
    }

    #[test]
    fn losing_bookings_never_go_negative() {
        let b = [figures(4, 1_000_000, 2_500_000)];
        assert_eq!(agent_bonus(&b), 0);
    }

    #[test]
    fn losses_do_not_offset_wins() {
        let b = [
            figures(2, 1_000_000, 2_600_000), // +600k
            figures(3, 1_000_000, 1_000_000), // -2M, clamped to 0
        ];
        assert_eq!(agent_bonus(&b), 600_000);
    }

    #[test]
    fn agent_with_no_bookings_is_owed_nothing() {
        assert_eq!(agent_bonus(&[]), 0);
    }

    #[test]
    fn settle_floors_debt_at_zero() {
        assert_eq!(settle(1_000_000, 400_000), (600_000, true));
        assert_eq!(settle(1_000_000, 1_200_000), (0, true));
        assert_eq!(settle(500_000, 0), (500_000, false));
    }

    #[test]
    fn month_bounds_cover_the_whole_month() {
        let (start, end) = month_bounds("2025-10").unwrap();
        assert_eq!(start.to_rfc3339(), "2025-10-01T00:00:00+00:00");
        assert!(end > Utc.with_ymd_and_hms(2025, 10, 31, 23, 59, 58).unwrap());
        assert!(end < Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn december_rolls_into_the_next_year() {
        let (start, end) = month_bounds("2025-12").unwrap();
        assert_eq!(start.to_rfc3339(), "2025-12-01T00:00:00+00:00");
        assert!(end < Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn month_bounds_reject_garbage() {
        assert!(month_bounds("2025").is_err());
        assert!(month_bounds("2025-13").is_err());
        assert!(month_bounds("october").is_err());
    }
}
