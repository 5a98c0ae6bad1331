//! Gap Detector (C6): computes `expected − present` over calendar months,
//! the hardest correctness requirement in the system. Interior gaps (a
//! hole neither at the start nor the end of covered history) must survive
//! the diff — a naive "fill from max(timestamp)+1 to now" is wrong and is
//! not what this does.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Utc};

use crate::error::StoreError;

/// Every calendar month from `earliest_date` (truncated to month start)
/// through `through` inclusive, ascending.
fn expected_months(earliest_date: NaiveDate, through: NaiveDate) -> Vec<(i32, u32)> {
    let mut months = Vec::new();
    let mut year = earliest_date.year();
    let mut month = earliest_date.month();
    loop {
        months.push((year, month));
        if year == through.year() && month == through.month() {
            break;
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    months
}

/// `missing_months(instrument, earliest_date) -> ordered List<(year, month)>`.
///
/// `present` is `distinct_months(instrument, raw_spread)`; `through`
/// defaults to the current UTC month but is parameterized here so callers
/// (and tests) can pin "now".
pub fn missing_months(
    earliest_date: NaiveDate,
    present: &[(i32, u32)],
    through: NaiveDate,
) -> Result<Vec<(i32, u32)>, StoreError> {
    if earliest_date > through {
        return Err(StoreError::Invariant(format!(
            "earliest_date {earliest_date} is after the through-month {through}"
        )));
    }

    let present: BTreeSet<(i32, u32)> = present.iter().copied().collect();
    let expected = expected_months(earliest_date, through);

    Ok(expected
        .into_iter()
        .filter(|month| !present.contains(month))
        .collect())
}

/// Convenience wrapper pinning `through` to the current UTC month.
pub fn missing_months_through_now(
    earliest_date: NaiveDate,
    present: &[(i32, u32)],
) -> Result<Vec<(i32, u32)>, StoreError> {
    let now = Utc::now().date_naive();
    let through = NaiveDate::from_ymd_opt(now.year(), now.month(), 1).expect("valid month start");
    missing_months(earliest_date, present, through)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn empty_store_returns_expected_set_unchanged() {
        let missing = missing_months(date(2024, 8), &[], date(2024, 10)).unwrap();
        assert_eq!(missing, vec![(2024, 8), (2024, 9), (2024, 10)]);
    }

    #[test]
    fn interior_gap_is_detected_even_with_later_coverage() {
        // S2: present 2024-08 and 2024-10, missing 2024-09.
        let present = [(2024, 8), (2024, 10)];
        let missing = missing_months(date(2024, 8), &present, date(2024, 10)).unwrap();
        assert_eq!(missing, vec![(2024, 9)]);
    }

    #[test]
    fn fully_covered_range_returns_empty() {
        let present = [(2024, 8), (2024, 9), (2024, 10)];
        let missing = missing_months(date(2024, 8), &present, date(2024, 10)).unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn expected_and_present_partition_the_full_range() {
        let present = [(2024, 8), (2024, 10)];
        let missing = missing_months(date(2024, 8), &present, date(2024, 10)).unwrap();
        let mut union: Vec<(i32, u32)> = missing.iter().copied().chain(present).collect();
        union.sort_unstable();
        assert_eq!(union, vec![(2024, 8), (2024, 9), (2024, 10)]);

        let missing_set: BTreeSet<_> = missing.into_iter().collect();
        let present_set: BTreeSet<_> = present.into_iter().collect();
        assert!(missing_set.is_disjoint(&present_set));
    }

    #[test]
    fn year_boundary_is_handled() {
        let missing = missing_months(date(2023, 12), &[], date(2024, 2)).unwrap();
        assert_eq!(missing, vec![(2023, 12), (2024, 1), (2024, 2)]);
    }
}
