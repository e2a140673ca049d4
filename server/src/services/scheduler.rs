use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::time::Duration;

use crate::services::capacity;
use crate::AppState;

/// Spawns the daily package sweep: once per day, at the configured UTC time,
/// packages whose start date has passed are deactivated.
pub fn spawn_daily_sweep(state: AppState) {
    tokio::spawn(async move {
        loop {
            let wait = until_next_run(
                Utc::now(),
                state.config.sweep.hour,
                state.config.sweep.minute,
            );
            tracing::debug!(secs = wait.as_secs(), "package sweep scheduled");
            tokio::time::sleep(wait).await;

            match capacity::deactivate_expired(&state.db, Utc::now()).await {
                Ok(count) => tracing::info!(count, "expired package sweep finished"),
                Err(e) => tracing::error!("expired package sweep failed: {e}"),
            }
        }
    });
}

fn until_next_run(now: DateTime<Utc>, hour: u32, minute: u32) -> Duration {
    let at = now
        .date_naive()
        .and_hms_opt(hour, minute, 0)
        .unwrap_or_else(|| now.date_naive().and_hms_opt(0, 0, 0).unwrap());
    let mut next = Utc.from_utc_datetime(&at);
    if next <= now {
        next += ChronoDuration::days(1);
    }
    (next - now).to_std().unwrap_or(Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_later_today_when_time_has_not_passed() {
        let now = Utc.with_ymd_and_hms(2025, 10, 5, 10, 0, 0).unwrap();
        let wait = until_next_run(now, 23, 30);
        assert_eq!(wait.as_secs(), 13 * 3600 + 30 * 60);
    }

    #[test]
    fn rolls_to_tomorrow_when_time_has_passed() {
        let now = Utc.with_ymd_and_hms(2025, 10, 5, 10, 0, 0).unwrap();
        let wait = until_next_run(now, 0, 5);
        assert_eq!(wait.as_secs(), 14 * 3600 + 5 * 60);
    }

    #[test]
    fn exact_boundary_waits_a_full_day() {
        let now = Utc.with_ymd_and_hms(2025, 10, 5, 0, 5, 0).unwrap();
        let wait = until_next_run(now, 0, 5);
        assert_eq!(wait.as_secs(), 24 * 3600);
    }

    #[test]
    fn out_of_range_config_falls_back_to_midnight() {
        let now = Utc.with_ymd_and_hms(2025, 10, 5, 10, 0, 0).unwrap();
        let wait = until_next_run(now, 99, 99);
        assert_eq!(wait.as_secs(), 14 * 3600);
    }
}
