use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub package_id: Option<Uuid>,
    pub group_name: Option<String>,
    pub price_per_one: i64,
    pub total_price: i64,
    pub is_paid: bool,
    pub region: Option<String>,
    pub district: Option<String>,
    pub target: String,
    pub agent_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub birth_date: NaiveDate,
    pub id_number: Option<String>,
    pub id_number_expiry_date: NaiveDate,
    pub phones: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum PaymentType {
    Cash,
    Card,
}

/// One entry of a booking's append-only payment history.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: i64,
    pub payment_type: PaymentType,
    pub paid_at: DateTime<Utc>,
}

/// Paid/owed totals recomputed from the payment history. `is_paid` is never
/// set independently of this computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaymentSummary {
    #[serde(rename = "totalPaid")]
    pub total_paid: i64,
    #[serde(rename = "totalPrice")]
    pub total_price: i64,
    #[serde(rename = "remainingDebt")]
    pub remaining_debt: i64,
    #[serde(rename = "isPaid")]
    pub is_paid: bool,
}

impl PaymentSummary {
    pub fn compute(total_price: i64, total_paid: i64) -> Self {
        Self {
            total_paid,
            total_price,
            remaining_debt: (total_price - total_paid).max(0),
            is_paid: total_paid >= total_price,
        }
    }
}

/// Parses an inclusive `[start, end]` day range; both bounds are required in
/// `YYYY-MM-DD` form. The range covers the whole of both days.
pub fn parse_day_range(
    start: Option<&str>,
    end: Option<&str>,
) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
    let start = start.ok_or_else(|| {
        AppError::InvalidDateRange("startDate and endDate are required".into())
    })?;
    let end = end.ok_or_else(|| {
        AppError::InvalidDateRange("startDate and endDate are required".into())
    })?;

    let parse = |s: &str| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
            AppError::InvalidDateRange(format!("invalid date '{s}', expected YYYY-MM-DD"))
        })
    };
    let start = parse(start)?;
    let end = parse(end)?;

    let from = Utc.from_utc_datetime(&start.and_hms_opt(0, 0, 0).unwrap());
    let to = Utc.from_utc_datetime(&end.and_hms_micro_opt(23, 59, 59, 999_999).unwrap());
    Ok((from, to))
}

#[derive(Debug, Deserialize)]
pub struct MemberInput {
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    #[serde(rename = "middleName")]
    pub middle_name: Option<String>,
    #[serde(rename = "birthDate")]
    pub birth_date: NaiveDate,
    #[serde(rename = "idNumber")]
    pub id_number: Option<String>,
    #[serde(rename = "idNumberExpiryDate")]
    pub id_number_expiry_date: NaiveDate,
    #[serde(default)]
    pub phones: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddressInput {
    pub region: Option<String>,
    pub district: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    #[serde(rename = "packageId")]
    pub package_id: Option<Uuid>,
    #[serde(rename = "groupName")]
    pub group_name: Option<String>,
    pub members: Vec<MemberInput>,
    #[serde(rename = "pricePerOne")]
    pub price_per_one: i64,
    #[serde(rename = "totalPrice")]
    pub total_price: i64,
    pub address: Option<AddressInput>,
    pub target: String,
    #[serde(rename = "agentId")]
    pub agent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookingRequest {
    #[serde(rename = "groupName")]
    pub group_name: Option<String>,
    #[serde(rename = "pricePerOne")]
    pub price_per_one: Option<i64>,
    #[serde(rename = "totalPrice")]
    pub total_price: Option<i64>,
    pub address: Option<AddressInput>,
    pub target: Option<String>,
    #[serde(rename = "agentId")]
    pub agent_id: Option<Uuid>,
    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    pub amount: i64,
    #[serde(rename = "paymentType")]
    pub payment_type: Option<PaymentType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_payment_leaves_debt() {
        let s = PaymentSummary::compute(1_000_000, 500_000);
        assert_eq!(s.remaining_debt, 500_000);
        assert!(!s.is_paid);
    }

    #[test]
    fn overpayment_floors_debt_at_zero() {
        // 500k then 600k against a 1M booking
        let s = PaymentSummary::compute(1_000_000, 1_100_000);
        assert_eq!(s.total_paid, 1_100_000);
        assert_eq!(s.remaining_debt, 0);
        assert!(s.is_paid);
    }

    #[test]
    fn is_paid_flips_exactly_at_total_price() {
        assert!(!PaymentSummary::compute(100, 99).is_paid);
        assert!(PaymentSummary::compute(100, 100).is_paid);
        assert!(PaymentSummary::compute(100, 101).is_paid);
    }

    #[test]
    fn day_range_is_inclusive_of_both_days() {
        let (from, to) = parse_day_range(Some("2025-10-01"), Some("2025-10-03")).unwrap();
        assert_eq!(from.to_rfc3339(), "2025-10-01T00:00:00+00:00");
        assert!(to > Utc.with_ymd_and_hms(2025, 10, 3, 23, 59, 58).unwrap());
        assert!(to < Utc.with_ymd_and_hms(2025, 10, 4, 0, 0, 0).unwrap());
    }

    #[test]
    fn day_range_rejects_missing_or_garbage_bounds() {
        assert!(matches!(
            parse_day_range(None, Some("2025-10-03")),
            Err(AppError::InvalidDateRange(_))
        ));
        assert!(matches!(
            parse_day_range(Some("2025-10-01"), None),
            Err(AppError::InvalidDateRange(_))
        ));
        assert!(matches!(
            parse_day_range(Some("10/01/2025"), Some("2025-10-03")),
            Err(AppError::InvalidDateRange(_))
        ));
    }
}
