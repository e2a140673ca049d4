//! Capacity accounting for packages.
//!
//! A package's capacity is consumed from two sources: members of bookings that
//! reference it (hard consumption) and agent reservations (soft holds). Every
//! capacity-affecting mutation locks the package row first and recomputes the
//! occupancy snapshot inside that lock, so concurrent requests for the same
//! package serialize while different packages proceed independently.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::package::{capacity_percentage, Occupancy, Package, Reservation};

/// One statement, one snapshot: both sums and the capacity come from the same
/// read, never from separately-read stale totals.
const OCCUPANCY_SQL: &str = r#"
SELECT p.capacity,
    (SELECT COUNT(*) FROM booking_members m
        JOIN bookings b ON b.id = m.booking_id
        WHERE b.package_id = p.id)::bigint AS taken,
    COALESCE((SELECT SUM(r.reserved_count) FROM package_reservations r
        WHERE r.package_id = p.id), 0)::bigint AS reserved
FROM packages p WHERE p.id = $1
"#;

async fn snapshot<'a, E>(exec: E, package_id: Uuid) -> AppResult<Option<Occupancy>>
where
    E: PgExecutor<'a>,
{
    let row: Option<(i32, i64, i64)> = sqlx::query_as(OCCUPANCY_SQL)
        .bind(package_id)
        .fetch_optional(exec)
        .await?;
    Ok(row.map(|(capacity, taken, reserved)| Occupancy::compute(capacity, taken, reserved)))
}

pub async fn occupancy(db: &PgPool, package_id: Uuid) -> AppResult<Occupancy> {
    snapshot(db, package_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Package not found".into()))
}

/// Appends a soft hold for `count` units. The package row is locked for the
/// duration of the check-and-append, so a racing reservation or booking sees
/// the committed total.
pub async fn reserve(
    db: &PgPool,
    package_id: Uuid,
    agent_id: Uuid,
    count: i32,
) -> AppResult<Reservation> {
    if count <= 0 {
        return Err(AppError::Validation(
            "reservation count must be positive".into(),
        ));
    }

    let mut tx = db.begin().await?;

    let locked: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM packages WHERE id = $1 AND is_active = true FOR UPDATE",
    )
    .bind(package_id)
    .fetch_optional(&mut *tx)
    .await?;
    if locked.is_none() {
        return Err(AppError::NotFound("Active package not found".into()));
    }

    let occ = snapshot(&mut *tx, package_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Active package not found".into()))?;
    if !occ.admits(i64::from(count)) {
        return Err(AppError::CapacityExceeded(format!(
            "requested {count}, available {}",
            occ.available
        )));
    }

    let reservation: Reservation = sqlx::query_as(
        r#"INSERT INTO package_reservations (package_id, agent_id, reserved_count)
        VALUES ($1, $2, $3)
        RETURNING id, package_id, agent_id, reserved_count, created_at"#,
    )
    .bind(package_id)
    .bind(agent_id)
    .bind(count)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(reservation)
}

/// Releases `dec_count` units of a hold by decrementing in place. The row is
/// kept even when it reaches zero; emptied reservations stay as history.
pub async fn unreserve(
    db: &PgPool,
    package_id: Uuid,
    reservation_id: Uuid,
    dec_count: i32,
) -> AppResult<Reservation> {
    if dec_count <= 0 {
        return Err(AppError::Validation(
            "release count must be positive".into(),
        ));
    }

    let mut tx = db.begin().await?;

    let locked: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM packages WHERE id = $1 FOR UPDATE")
            .bind(package_id)
            .fetch_optional(&mut *tx)
            .await?;
    if locked.is_none() {
        return Err(AppError::NotFound("Package not found".into()));
    }

    let held: Option<(i32,)> = sqlx::query_as(
        "SELECT reserved_count FROM package_reservations WHERE id = $1 AND package_id = $2",
    )
    .bind(reservation_id)
    .bind(package_id)
    .fetch_optional(&mut *tx)
    .await?;
    let (held,) = held.ok_or_else(|| AppError::NotFound("Reservation not found".into()))?;

    if dec_count > held {
        return Err(AppError::InsufficientReservation(format!(
            "requested {dec_count}, held {held}"
        )));
    }

    let reservation: Reservation = sqlx::query_as(
        r#"UPDATE package_reservations SET reserved_count = reserved_count - $1
        WHERE id = $2
        RETURNING id, package_id, agent_id, reserved_count, created_at"#,
    )
    .bind(dec_count)
    .bind(reservation_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(reservation)
}

/// Gate for hard consumption: called inside the booking-creation transaction
/// after the caller has started it. Locks the package row, then checks that
/// `member_count` more units fit.
pub async fn admit_members(
    tx: &mut sqlx::PgConnection,
    package_id: Uuid,
    member_count: i64,
) -> AppResult<()> {
    let locked: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM packages WHERE id = $1 AND is_active = true FOR UPDATE",
    )
    .bind(package_id)
    .fetch_optional(&mut *tx)
    .await?;
    if locked.is_none() {
        return Err(AppError::NotFound("Active package not found".into()));
    }

    let occ = snapshot(&mut *tx, package_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Active package not found".into()))?;
    if !occ.admits(member_count) {
        return Err(AppError::CapacityExceeded(format!(
            "requested {member_count}, available {}",
            occ.available
        )));
    }
    Ok(())
}

/// Locks the package row referenced by a booking, if any. Used by mutations
/// that release capacity (member removal) so they serialize with admissions.
pub async fn lock_booking_package(
    tx: &mut sqlx::PgConnection,
    package_id: Option<Uuid>,
) -> AppResult<()> {
    if let Some(pid) = package_id {
        sqlx::query("SELECT id FROM packages WHERE id = $1 FOR UPDATE")
            .bind(pid)
            .execute(&mut *tx)
            .await?;
    }
    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
pub struct PackageOccupancyRow {
    #[sqlx(flatten)]
    pub package: Package,
    pub taken: i64,
    pub reserved: i64,
}

/// Packages annotated with their occupancy, newest first. Read-only; tolerates
/// running concurrently with writes.
pub async fn list_with_occupancy(
    db: &PgPool,
    is_active: Option<bool>,
    created_from: Option<DateTime<Utc>>,
    created_to: Option<DateTime<Utc>>,
) -> AppResult<Vec<(Package, Occupancy)>> {
    let rows: Vec<PackageOccupancyRow> = sqlx::query_as(
        r#"SELECT p.id, p.title, p.capacity, p.min_price, p.description, p.is_active,
            p.start_date, p.end_date, p.created_at, p.updated_at,
            (SELECT COUNT(*) FROM booking_members m
                JOIN bookings b ON b.id = m.booking_id
                WHERE b.package_id = p.id)::bigint AS taken,
            COALESCE((SELECT SUM(r.reserved_count) FROM package_reservations r
                WHERE r.package_id = p.id), 0)::bigint AS reserved
        FROM packages p
        WHERE ($1::boolean IS NULL OR p.is_active = $1)
          AND ($2::timestamptz IS NULL OR p.created_at >= $2)
          AND ($3::timestamptz IS NULL OR p.created_at <= $3)
        ORDER BY p.created_at DESC"#,
    )
    .bind(is_active)
    .bind(created_from)
    .bind(created_to)
    .fetch_all(db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| {
            let occ = Occupancy::compute(r.package.capacity, r.taken, r.reserved);
            (r.package, occ)
        })
        .collect())
}

/// A reservation joined with the holding agent's display info.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EnrichedReservation {
    pub id: Uuid,
    #[serde(rename = "packageId")]
    pub package_id: Uuid,
    #[serde(rename = "agentId")]
    pub agent_id: Uuid,
    #[serde(rename = "reservedCount")]
    pub reserved_count: i32,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "agentName")]
    pub agent_name: String,
    #[serde(rename = "agentPhone")]
    pub agent_phone: String,
}

pub async fn load_reservations(
    db: &PgPool,
    package_ids: &[Uuid],
) -> AppResult<Vec<EnrichedReservation>> {
    let rows: Vec<EnrichedReservation> = sqlx::query_as(
        r#"SELECT r.id, r.package_id, r.agent_id, r.reserved_count, r.created_at,
            COALESCE(s.first_name || ' ' || s.last_name, '') AS agent_name,
            COALESCE(s.phone, '') AS agent_phone
        FROM package_reservations r
        LEFT JOIN staff s ON s.id = r.agent_id
        WHERE r.package_id = ANY($1)
        ORDER BY r.created_at"#,
    )
    .bind(package_ids)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

#[derive(Debug, Serialize)]
pub struct PackageAvailability {
    #[serde(flatten)]
    pub package: Package,
    pub taken: i64,
    pub reserved: i64,
    pub available: i64,
    #[serde(rename = "isFull")]
    pub is_full: bool,
    #[serde(rename = "capacityPercentage")]
    pub capacity_percentage: f64,
    pub reservations: Vec<EnrichedReservation>,
}

/// Active packages that still have room, annotated for the sales screens.
pub async fn list_active_with_availability(
    db: &PgPool,
    created_from: Option<DateTime<Utc>>,
    created_to: Option<DateTime<Utc>>,
) -> AppResult<Vec<PackageAvailability>> {
    let annotated = list_with_occupancy(db, Some(true), created_from, created_to).await?;

    let open: Vec<(Package, Occupancy)> = annotated
        .into_iter()
        .filter(|(_, occ)| occ.available > 0)
        .collect();

    let ids: Vec<Uuid> = open.iter().map(|(p, _)| p.id).collect();
    let mut by_package: std::collections::HashMap<Uuid, Vec<EnrichedReservation>> =
        std::collections::HashMap::new();
    for r in load_reservations(db, &ids).await? {
        by_package.entry(r.package_id).or_default().push(r);
    }

    Ok(open
        .into_iter()
        .map(|(package, occ)| {
            let own = by_package.remove(&package.id).unwrap_or_default();
            PackageAvailability {
                capacity_percentage: capacity_percentage(
                    package.capacity,
                    occ.taken,
                    occ.reserved,
                ),
                is_full: occ.is_full(),
                taken: occ.taken,
                reserved: occ.reserved,
                available: occ.available,
                package,
                reservations: own,
            }
        })
        .collect())
}

/// Flips packages whose start date has passed to inactive. Idempotent; running
/// it twice is the same as running it once.
pub async fn deactivate_expired(db: &PgPool, now: DateTime<Utc>) -> AppResult<u64> {
    let result = sqlx::query(
        "UPDATE packages SET is_active = false, updated_at = NOW()
        WHERE start_date <= $1 AND is_active = true",
    )
    .bind(now)
    .execute(db)
    .await?;
    Ok(result.rows_affected())
}
