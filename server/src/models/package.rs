use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: Uuid,
    pub title: String,
    pub capacity: i32,
    pub min_price: i64,
    pub description: Option<String>,
    pub is_active: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A soft hold of capacity by an agent, taken before a booking is finalized.
/// Distinct from booking members, which are hard consumption.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,
    pub package_id: Uuid,
    pub agent_id: Uuid,
    pub reserved_count: i32,
    pub created_at: DateTime<Utc>,
}

/// Derived capacity totals for one package, all taken from a single snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Occupancy {
    pub taken: i64,
    pub reserved: i64,
    pub available: i64,
}

impl Occupancy {
    pub fn compute(capacity: i32, taken: i64, reserved: i64) -> Self {
        Self {
            taken,
            reserved,
            available: i64::from(capacity) - taken - reserved,
        }
    }

    pub fn is_full(&self) -> bool {
        self.available <= 0
    }

    /// Whether `count` more units fit without oversubscribing.
    pub fn admits(&self, count: i64) -> bool {
        count <= self.available
    }
}

pub fn capacity_percentage(capacity: i32, taken: i64, reserved: i64) -> f64 {
    if capacity <= 0 {
        return 0.0;
    }
    (taken + reserved) as f64 / f64::from(capacity) * 100.0
}

#[derive(Debug, Deserialize)]
pub struct CreatePackageRequest {
    pub title: String,
    pub capacity: i32,
    #[serde(rename = "minPrice")]
    pub min_price: i64,
    pub description: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(rename = "endDate")]
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePackageRequest {
    pub title: Option<String>,
    pub capacity: Option<i32>,
    #[serde(rename = "minPrice")]
    pub min_price: Option<i64>,
    pub description: Option<String>,
    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
    #[serde(rename = "startDate")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(rename = "endDate")]
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ReserveRequest {
    #[serde(rename = "agentId")]
    pub agent_id: Uuid,
    pub count: i32,
}

#[derive(Debug, Deserialize)]
pub struct UnreserveRequest {
    #[serde(rename = "reservationId")]
    pub reservation_id: Uuid,
    #[serde(rename = "decCount")]
    pub dec_count: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupancy_sums_both_sources() {
        let occ = Occupancy::compute(10, 3, 2);
        assert_eq!(occ.taken, 3);
        assert_eq!(occ.reserved, 2);
        assert_eq!(occ.available, 5);
        assert!(!occ.is_full());
    }

    #[test]
    fn reservation_sequence_from_empty_package() {
        // capacity=10, no bookings: reserve 6 succeeds, available drops to 4
        let occ = Occupancy::compute(10, 0, 0);
        assert!(occ.admits(6));
        let occ = Occupancy::compute(10, 0, 6);
        assert_eq!(occ.available, 4);
        // a second reserve of 5 must be refused
        assert!(!occ.admits(5));
        // releasing 3 units opens the package back up to 7
        let occ = Occupancy::compute(10, 0, 3);
        assert_eq!(occ.available, 7);
        assert!(occ.admits(5));
    }

    #[test]
    fn exact_fit_is_admitted_and_marks_full() {
        let occ = Occupancy::compute(8, 5, 0);
        assert!(occ.admits(3));
        let after = Occupancy::compute(8, 5, 3);
        assert!(after.is_full());
        assert!(!after.admits(1));
        assert!(after.admits(0));
    }

    #[test]
    fn full_package_admits_nothing() {
        let occ = Occupancy::compute(4, 4, 0);
        assert!(occ.is_full());
        assert_eq!(occ.available, 0);
        assert!(!occ.admits(1));
    }

    #[test]
    fn percentage_counts_reservations_and_members() {
        assert_eq!(capacity_percentage(10, 3, 2), 50.0);
        assert_eq!(capacity_percentage(10, 0, 0), 0.0);
        assert_eq!(capacity_percentage(10, 10, 0), 100.0);
        assert_eq!(capacity_percentage(0, 0, 0), 0.0);
    }
}
