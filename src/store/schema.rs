//! Single source of truth for the tick and OHLC table shapes (§4.4, §6).
//! Every column carries a human description; schema comments travel with
//! the backend's own catalogue support (Parquet metadata, ClickHouse
//! `COMMENT COLUMN`) so an analyst inspecting either backend finds the
//! semantics in place.

/// A single column's name, type description, nullability, and
/// human-readable purpose.
#[derive(Debug, Clone, Copy)]
pub struct ColumnDefinition {
    pub name: &'static str,
    pub dtype: &'static str,
    pub nullable: bool,
    pub comment: &'static str,
}

macro_rules! column {
    ($name:expr, $dtype:expr, $nullable:expr, $comment:expr) => {
        ColumnDefinition {
            name: $name,
            dtype: $dtype,
            nullable: $nullable,
            comment: $comment,
        }
    };
}

/// Columns shared by both `raw_spread_ticks` and `standard_ticks`.
pub const TICK_COLUMNS: &[ColumnDefinition] = &[
    column!("instrument", "VARCHAR", false, "Closed-catalogue instrument symbol"),
    column!(
        "timestamp",
        "TIMESTAMP(us) WITH TIME ZONE",
        false,
        "Tick timestamp, UTC, microsecond precision; part of the dedup key"
    ),
    column!("bid", "DOUBLE", false, "Bid price, non-negative"),
    column!(
        "ask",
        "DOUBLE",
        false,
        "Ask price; >= bid for raw_spread, > bid for standard"
    ),
];

/// Current OHLC schema version. Bumping this is required whenever a
/// column is added, removed, or redefined (§9 "schema version bump").
pub const OHLC_SCHEMA_VERSION: u32 = 1;

/// The 30 OHLC columns (§3): price(4) + spreads(2) + counts(2) +
/// normalized(4) + session labels(4) + holiday flags(3) + 10 exchange-open
/// flags, plus the `(instrument, minute_start_utc)` key.
pub const OHLC_FIXED_COLUMNS: &[ColumnDefinition] = &[
    column!("instrument", "VARCHAR", false, "Closed-catalogue instrument symbol"),
    column!(
        "minute_start_utc",
        "TIMESTAMP(us) WITH TIME ZONE",
        false,
        "Minute-aligned bar start, UTC"
    ),
    column!("open", "DOUBLE", false, "Opening price (first raw_spread bid)"),
    column!("high", "DOUBLE", false, "High price (max raw_spread bid)"),
    column!("low", "DOUBLE", false, "Low price (min raw_spread bid)"),
    column!("close", "DOUBLE", false, "Closing price (last raw_spread bid)"),
    column!(
        "raw_spread_avg",
        "DOUBLE",
        true,
        "Average ask-bid spread from raw_spread ticks in the minute"
    ),
    column!(
        "standard_spread_avg",
        "DOUBLE",
        true,
        "Average ask-bid spread from standard ticks matched by asof-to-preceding join; NULL if none matched"
    ),
    column!(
        "tick_count_raw_spread",
        "INTEGER",
        false,
        "Count of raw_spread ticks in the minute"
    ),
    column!(
        "tick_count_standard",
        "INTEGER",
        true,
        "Count of matched standard ticks; NULL if none matched"
    ),
    column!(
        "range_per_spread",
        "DOUBLE",
        true,
        "(high-low)/standard_spread_avg; NULL when the denominator is zero, NULL, or undefined"
    ),
    column!(
        "range_per_tick",
        "DOUBLE",
        true,
        "(high-low)/tick_count_standard; NULL when the denominator is zero, NULL, or undefined"
    ),
    column!(
        "body_per_spread",
        "DOUBLE",
        true,
        "abs(close-open)/standard_spread_avg; NULL when the denominator is zero, NULL, or undefined"
    ),
    column!(
        "body_per_tick",
        "DOUBLE",
        true,
        "abs(close-open)/tick_count_standard; NULL when the denominator is zero, NULL, or undefined"
    ),
    column!(
        "ny_hour",
        "INTEGER",
        false,
        "New York local hour (0-23), DST-aware"
    ),
    column!(
        "london_hour",
        "INTEGER",
        false,
        "London local hour (0-23), DST-aware"
    ),
    column!(
        "ny_session",
        "VARCHAR",
        false,
        "One of NY_Session, NY_After_Hours, NY_Closed, derived from ny_hour"
    ),
    column!(
        "london_session",
        "VARCHAR",
        false,
        "One of London_Session, London_Closed, derived from london_hour"
    ),
    column!(
        "is_us_holiday",
        "BOOLEAN",
        false,
        "1 iff the UTC date is an official NYSE holiday (weekends excluded by construction)"
    ),
    column!(
        "is_uk_holiday",
        "BOOLEAN",
        false,
        "1 iff the UTC date is an official LSE holiday"
    ),
    column!(
        "is_major_holiday",
        "BOOLEAN",
        false,
        "is_us_holiday AND is_uk_holiday"
    ),
];

/// Names of the 10 dynamically generated `is_<key>_session` columns, in
/// registry order — driven entirely by `crate::registry::keys()` so that
/// adding an exchange is a one-line registry change plus a schema bump.
pub fn exchange_session_column_names() -> Vec<String> {
    crate::registry::keys()
        .map(|key| format!("is_{key}_session"))
        .collect()
}

/// `(name, dtype, nullable, comment)` for the 10 exchange-open flags, in
/// registry order. Plain tuples rather than `ColumnDefinition` because the
/// names are generated from `crate::registry::keys()`, not `'static`.
pub fn exchange_session_column_definitions() -> Vec<(String, &'static str, bool, &'static str)> {
    crate::registry::keys()
        .map(|key| {
            (
                format!("is_{key}_session"),
                "BOOLEAN",
                false,
                "1 iff the exchange was in its regular trading session at minute_start_utc",
            )
        })
        .collect()
}

/// Full OHLC column list: the 20 fixed columns plus the 10 generated
/// exchange-open flags.
pub fn ohlc_all_column_names() -> Vec<String> {
    let mut names: Vec<String> = OHLC_FIXED_COLUMNS.iter().map(|c| c.name.to_string()).collect();
    names.extend(exchange_session_column_names());
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ohlc_column_count_matches_spec_thirty_columns() {
        // 20 fixed (including the 2-column key) + 10 exchange-open flags.
        assert_eq!(OHLC_FIXED_COLUMNS.len(), 20);
        assert_eq!(ohlc_all_column_names().len(), 30);
    }

    #[test]
    fn exchange_session_columns_follow_registry_order() {
        let names = exchange_session_column_names();
        assert_eq!(names[0], "is_nyse_session");
        assert_eq!(names[1], "is_lse_session");
        assert_eq!(names.len(), 10);
    }
}
