//! Official holiday rule tables for NYSE and LSE.
//!
//! Weekends are never in these sets by construction — `is_nyse_holiday` and
//! `is_lse_holiday` are the exchange's own published closures, which already
//! fall on weekdays (observed-day substitution applies when the underlying
//! holiday lands on a weekend).

use chrono::{Datelike, NaiveDate, Weekday};

/// Nth weekday of a month, e.g. "3rd Monday of January" (`n` is 1-based).
fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> NaiveDate {
    let first = NaiveDate::from_ymd_opt(year, month, 1).expect("valid first-of-month");
    let offset = (7 + weekday.num_days_from_monday() as i64 - first.weekday().num_days_from_monday() as i64) % 7;
    first + chrono::Duration::days(offset + 7 * (n as i64 - 1))
}

/// Last occurrence of `weekday` in a month.
fn last_weekday(year: i32, month: u32, weekday: Weekday) -> NaiveDate {
    let next_month_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("valid next-month-first");
    let last_day = next_month_first - chrono::Duration::days(1);
    let back = (7 + last_day.weekday().num_days_from_monday() as i64
        - weekday.num_days_from_monday() as i64)
        % 7;
    last_day - chrono::Duration::days(back)
}

/// Anonymous Gregorian (Meeus/Jones/Butcher) Easter algorithm.
fn easter_sunday(year: i32) -> NaiveDate {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32).expect("valid easter date")
}

/// Shifts a holiday that falls on a weekend to the nearest business day:
/// Saturday -> preceding Friday, Sunday -> following Monday.
fn observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - chrono::Duration::days(1),
        Weekday::Sun => date + chrono::Duration::days(1),
        _ => date,
    }
}

fn nyse_holidays_for_year(year: i32) -> Vec<NaiveDate> {
    let easter = easter_sunday(year);
    let good_friday = easter - chrono::Duration::days(2);
    vec![
        observed(NaiveDate::from_ymd_opt(year, 1, 1).unwrap()),
        nth_weekday(year, 1, Weekday::Mon, 3),  // MLK Day
        nth_weekday(year, 2, Weekday::Mon, 3),  // Washington's Birthday
        good_friday,
        last_weekday(year, 5, Weekday::Mon), // Memorial Day
        observed(NaiveDate::from_ymd_opt(year, 6, 19).unwrap()), // Juneteenth
        observed(NaiveDate::from_ymd_opt(year, 7, 4).unwrap()),
        nth_weekday(year, 9, Weekday::Mon, 1), // Labor Day
        nth_weekday(year, 11, Weekday::Thu, 4), // Thanksgiving
        observed(NaiveDate::from_ymd_opt(year, 12, 25).unwrap()),
    ]
}

fn lse_holidays_for_year(year: i32) -> Vec<NaiveDate> {
    let easter = easter_sunday(year);
    let good_friday = easter - chrono::Duration::days(2);
    let easter_monday = easter + chrono::Duration::days(1);
    vec![
        observed(NaiveDate::from_ymd_opt(year, 1, 1).unwrap()),
        good_friday,
        easter_monday,
        nth_weekday(year, 5, Weekday::Mon, 1), // Early May bank holiday
        last_weekday(year, 5, Weekday::Mon),   // Spring bank holiday
        last_weekday(year, 8, Weekday::Mon),   // Summer bank holiday
        observed(NaiveDate::from_ymd_opt(year, 12, 25).unwrap()),
        boxing_day_observed(year),
    ]
}

/// Boxing Day's weekend substitution runs after Christmas Day's, so a
/// Sat/Sun Dec 25 pushes Boxing Day's own observed date one day further.
fn boxing_day_observed(year: i32) -> NaiveDate {
    let boxing_day = NaiveDate::from_ymd_opt(year, 12, 26).unwrap();
    match boxing_day.weekday() {
        Weekday::Sat | Weekday::Sun => NaiveDate::from_ymd_opt(year, 12, 28).unwrap(),
        Weekday::Mon if NaiveDate::from_ymd_opt(year, 12, 25).unwrap().weekday() == Weekday::Sun => {
            NaiveDate::from_ymd_opt(year, 12, 27).unwrap()
        }
        _ => boxing_day,
    }
}

pub fn is_nyse_holiday(date: NaiveDate) -> bool {
    nyse_holidays_for_year(date.year()).contains(&date)
}

pub fn is_lse_holiday(date: NaiveDate) -> bool {
    lse_holidays_for_year(date.year()).contains(&date)
}

/// New Year's Day and Christmas Day, weekend-observed, common to all ten
/// registered exchanges. Exchanges without their own published holiday
/// table (every registry entry but NYSE/LSE) still close for these two.
fn fixed_date_holidays_for_year(year: i32) -> [NaiveDate; 2] {
    [
        observed(NaiveDate::from_ymd_opt(year, 1, 1).unwrap()),
        observed(NaiveDate::from_ymd_opt(year, 12, 25).unwrap()),
    ]
}

pub fn is_fixed_date_holiday(date: NaiveDate) -> bool {
    fixed_date_holidays_for_year(date.year()).contains(&date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_years_day_2024_is_nyse_holiday() {
        assert!(is_nyse_holiday(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
    }

    #[test]
    fn good_friday_2024_is_both_nyse_and_lse_holiday() {
        let good_friday = NaiveDate::from_ymd_opt(2024, 3, 29).unwrap();
        assert!(is_nyse_holiday(good_friday));
        assert!(is_lse_holiday(good_friday));
    }

    #[test]
    fn juneteenth_2022_first_observance_is_nyse_holiday() {
        assert!(is_nyse_holiday(NaiveDate::from_ymd_opt(2022, 6, 20).unwrap()));
    }

    #[test]
    fn ordinary_trading_day_is_not_a_holiday() {
        let wed = NaiveDate::from_ymd_opt(2024, 3, 13).unwrap();
        assert!(!is_nyse_holiday(wed));
        assert!(!is_lse_holiday(wed));
    }

    #[test]
    fn christmas_2021_saturday_observed_on_preceding_friday_for_lse() {
        // Dec 25 2021 was a Saturday; Boxing Day (Dec 26) a Sunday.
        let observed_christmas = NaiveDate::from_ymd_opt(2021, 12, 24).unwrap();
        assert!(is_lse_holiday(observed_christmas));
    }

    #[test]
    fn new_years_day_2024_is_a_fixed_date_holiday() {
        assert!(is_fixed_date_holiday(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
    }

    #[test]
    fn christmas_2024_is_a_fixed_date_holiday() {
        assert!(is_fixed_date_holiday(NaiveDate::from_ymd_opt(2024, 12, 25).unwrap()));
    }

    #[test]
    fn ordinary_trading_day_is_not_a_fixed_date_holiday() {
        assert!(!is_fixed_date_holiday(NaiveDate::from_ymd_opt(2024, 3, 13).unwrap()));
    }
}
