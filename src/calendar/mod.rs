//! Session Detector (C2): holiday and trading-session flags derived purely
//! from the registry and fixed holiday rule tables — no external calendar
//! service is consulted.

mod holidays;
mod sessions;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::CalendarError;
use crate::registry;

/// Holiday and per-exchange session flags for a single UTC instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionFlags {
    pub is_us_holiday: bool,
    pub is_uk_holiday: bool,
    pub is_major_holiday: bool,
    /// One entry per registry exchange key, in `registry::keys()` order.
    pub exchange_sessions: [(&'static str, bool); 10],
}

/// Computes holiday and session flags for `ts_utc` across every registered
/// exchange. Fails loudly (no silent defaulting) if any exchange's
/// timezone cannot be resolved.
pub fn flags_for(ts_utc: DateTime<Utc>) -> Result<SessionFlags, CalendarError> {
    let local_date_nyse = {
        let cfg = registry::get("nyse").expect("nyse is always registered");
        let tz: chrono_tz::Tz = cfg.timezone.parse().expect("nyse timezone is valid");
        tz.from_utc_datetime(&ts_utc.naive_utc()).date_naive()
    };
    let local_date_lse = {
        let cfg = registry::get("lse").expect("lse is always registered");
        let tz: chrono_tz::Tz = cfg.timezone.parse().expect("lse timezone is valid");
        tz.from_utc_datetime(&ts_utc.naive_utc()).date_naive()
    };

    let is_us_holiday = holidays::is_nyse_holiday(local_date_nyse);
    let is_uk_holiday = holidays::is_lse_holiday(local_date_lse);
    let is_major_holiday = is_us_holiday && is_uk_holiday;

    let mut exchange_sessions = [("", false); 10];
    for (i, key) in registry::keys().enumerate() {
        let cfg = registry::get(key).expect("key came from the registry itself");
        let open = sessions::is_session_open(key, &cfg, ts_utc)?;
        exchange_sessions[i] = (key, open);
    }

    Ok(SessionFlags {
        is_us_holiday,
        is_uk_holiday,
        is_major_holiday,
        exchange_sessions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn flags_for_new_years_day_marks_major_holiday() {
        let ts = Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        );
        let flags = flags_for(ts).unwrap();
        assert!(flags.is_us_holiday);
        assert!(flags.is_uk_holiday);
        assert!(flags.is_major_holiday);
    }

    #[test]
    fn flags_for_ordinary_weekday_has_ten_exchange_entries() {
        let ts = Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(2024, 3, 13)
                .unwrap()
                .and_hms_opt(15, 0, 0)
                .unwrap(),
        );
        let flags = flags_for(ts).unwrap();
        assert_eq!(flags.exchange_sessions.len(), 10);
        assert!(!flags.is_major_holiday);
    }
}
