//! Per-exchange trading-session predicate, DST-aware via `chrono-tz`.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;

use crate::calendar::holidays;
use crate::error::CalendarError;
use crate::registry::ExchangeConfig;

/// Lunch break as (start_hour, start_minute, end_hour, end_minute) in the
/// exchange's own local time. Only the Asian exchanges close over lunch.
fn lunch_break(key: &str) -> Option<(u32, u32, u32, u32)> {
    match key {
        "xtks" => Some((11, 30, 12, 30)), // Tokyo
        "xhkg" => Some((12, 0, 13, 0)),   // Hong Kong
        "xses" => Some((12, 0, 13, 0)),   // Singapore
        _ => None,
    }
}

/// Whether `key`'s exchange is closed for a holiday on `local_date`. NYSE
/// and LSE use their own published holiday tables; the other 8 registry
/// exchanges have no such table grounded in this crate (see DESIGN.md), so
/// they fall back to the fixed-date closures (New Year's Day, Christmas
/// Day) common to all ten.
fn observes_known_holiday(key: &str, local_date: chrono::NaiveDate) -> bool {
    match key {
        "nyse" => holidays::is_nyse_holiday(local_date),
        "lse" => holidays::is_lse_holiday(local_date),
        _ => holidays::is_fixed_date_holiday(local_date),
    }
}

/// Returns whether `exchange_key`'s market is in a regular trading session
/// at the given UTC instant (weekends, known holidays, and lunch breaks all
/// count as closed).
pub fn is_session_open(
    exchange_key: &str,
    cfg: &ExchangeConfig,
    ts_utc: DateTime<Utc>,
) -> Result<bool, CalendarError> {
    let tz: Tz = cfg.timezone.parse().map_err(|_| CalendarError::InitFailed(
        exchange_key.to_string(),
        format!("invalid IANA timezone '{}'", cfg.timezone),
    ))?;
    let local = tz.from_utc_datetime(&ts_utc.naive_utc());

    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return Ok(false);
    }
    if observes_known_holiday(exchange_key, local.date_naive()) {
        return Ok(false);
    }

    let minutes_since_midnight = local.hour() * 60 + local.minute();
    let open = cfg.open_hour * 60 + cfg.open_minute;
    let close = cfg.close_hour * 60 + cfg.close_minute;
    if minutes_since_midnight < open || minutes_since_midnight >= close {
        return Ok(false);
    }

    if let Some((lh, lm, eh, em)) = lunch_break(exchange_key) {
        let lunch_start = lh * 60 + lm;
        let lunch_end = eh * 60 + em;
        if minutes_since_midnight >= lunch_start && minutes_since_midnight < lunch_end {
            return Ok(false);
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;
    use chrono::NaiveDate;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(h, min, 0)
                .unwrap(),
        )
    }

    #[test]
    fn nyse_open_mid_session() {
        let cfg = registry::get("nyse").unwrap();
        // 2024-03-13 15:00 UTC = 11:00 EDT, well within 9:30-16:00.
        assert!(is_session_open("nyse", &cfg, utc(2024, 3, 13, 15, 0)).unwrap());
    }

    #[test]
    fn nyse_closed_on_weekend() {
        let cfg = registry::get("nyse").unwrap();
        assert!(!is_session_open("nyse", &cfg, utc(2024, 3, 16, 15, 0)).unwrap());
    }

    #[test]
    fn nyse_closed_on_holiday() {
        let cfg = registry::get("nyse").unwrap();
        assert!(!is_session_open("nyse", &cfg, utc(2024, 1, 1, 15, 0)).unwrap());
    }

    #[test]
    fn tokyo_closed_on_new_years_day() {
        let cfg = registry::get("xtks").unwrap();
        // 10:00 JST = 01:00 UTC, otherwise a normal trading hour.
        assert!(!is_session_open("xtks", &cfg, utc(2024, 1, 1, 1, 0)).unwrap());
    }

    #[test]
    fn tokyo_closed_during_lunch_break() {
        let cfg = registry::get("xtks").unwrap();
        // 12:00 JST = 03:00 UTC, inside the 11:30-12:30 lunch break.
        assert!(!is_session_open("xtks", &cfg, utc(2024, 3, 13, 3, 0)).unwrap());
    }

    #[test]
    fn tokyo_open_before_lunch_break() {
        let cfg = registry::get("xtks").unwrap();
        // 10:00 JST = 01:00 UTC.
        assert!(is_session_open("xtks", &cfg, utc(2024, 3, 13, 1, 0)).unwrap());
    }
}
