//! Core domain types shared across every component: the closed instrument
//! catalogue, tick variants, OHLC timeframes, and the `Tick`/`OhlcBar`
//! record shapes (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::{InstrumentError, TimeframeError};

/// The closed, enumerated set of accepted symbols (§3 "Instrument
/// catalogue"). Every write and query is rejected with `InvalidInstrument`
/// if the symbol is not a variant here.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    IntoStaticStr,
)]
pub enum Instrument {
    EURUSD,
    GBPUSD,
    XAUUSD,
    USDJPY,
    AUDUSD,
    USDCAD,
    NZDUSD,
    EURGBP,
    EURJPY,
    GBPJPY,
}

impl Instrument {
    pub const ALL: [Instrument; 10] = [
        Instrument::EURUSD,
        Instrument::GBPUSD,
        Instrument::XAUUSD,
        Instrument::USDJPY,
        Instrument::AUDUSD,
        Instrument::USDCAD,
        Instrument::NZDUSD,
        Instrument::EURGBP,
        Instrument::EURJPY,
        Instrument::GBPJPY,
    ];

    /// Parses a symbol, rejecting anything outside the closed catalogue.
    pub fn parse(symbol: &str) -> Result<Self, InstrumentError> {
        symbol
            .parse()
            .map_err(|_| InstrumentError::InvalidInstrument(symbol.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }
}

/// Which of the two parallel tick feeds a row belongs to.
///
/// For `Standard`, `ask > bid` holds for every row. For `RawSpread`,
/// `ask >= bid`, and `ask == bid` (zero-spread execution ticks) is common.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum Variant {
    RawSpread,
    Standard,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::RawSpread, Variant::Standard];

    /// The upstream archive's symbol suffix for this variant (§6).
    pub fn archive_symbol_suffix(&self) -> &'static str {
        match self {
            Variant::RawSpread => "_Raw_Spread",
            Variant::Standard => "",
        }
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            Variant::RawSpread => "raw_spread_ticks",
            Variant::Standard => "standard_ticks",
        }
    }
}

/// Supported OHLC query resolutions (§4.7). `OneMinute` is the natively
/// stored grain; the rest are derived on the fly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
pub enum Timeframe {
    #[strum(serialize = "1m")]
    OneMinute,
    #[strum(serialize = "5m")]
    FiveMinutes,
    #[strum(serialize = "15m")]
    FifteenMinutes,
    #[strum(serialize = "30m")]
    ThirtyMinutes,
    #[strum(serialize = "1h")]
    OneHour,
    #[strum(serialize = "4h")]
    FourHours,
    #[strum(serialize = "1d")]
    OneDay,
}

impl Timeframe {
    pub fn parse(s: &str) -> Result<Self, TimeframeError> {
        s.parse()
            .map_err(|_| TimeframeError::InvalidTimeframe(s.to_string()))
    }

    /// Bucket width, used to floor a timestamp to its containing bucket.
    pub fn duration(&self) -> chrono::Duration {
        match self {
            Timeframe::OneMinute => chrono::Duration::minutes(1),
            Timeframe::FiveMinutes => chrono::Duration::minutes(5),
            Timeframe::FifteenMinutes => chrono::Duration::minutes(15),
            Timeframe::ThirtyMinutes => chrono::Duration::minutes(30),
            Timeframe::OneHour => chrono::Duration::hours(1),
            Timeframe::FourHours => chrono::Duration::hours(4),
            Timeframe::OneDay => chrono::Duration::days(1),
        }
    }
}

/// One quote observation (§3 "Tick"). Identity is `(instrument, timestamp)`;
/// the store collapses duplicate keys, last write wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub instrument: Instrument,
    /// UTC, microsecond precision.
    pub timestamp: DateTime<Utc>,
    pub bid: f64,
    pub ask: f64,
}

/// NY trading-session band, derived from `ny_hour` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum NySession {
    #[strum(serialize = "NY_Session")]
    Session,
    #[strum(serialize = "NY_After_Hours")]
    AfterHours,
    #[strum(serialize = "NY_Closed")]
    Closed,
}

impl NySession {
    pub fn from_hour(ny_hour: u32) -> Self {
        match ny_hour {
            9..=16 => NySession::Session,
            17..=20 => NySession::AfterHours,
            _ => NySession::Closed,
        }
    }
}

/// London trading-session band, derived from `london_hour` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum LondonSession {
    #[strum(serialize = "London_Session")]
    Session,
    #[strum(serialize = "London_Closed")]
    Closed,
}

impl LondonSession {
    pub fn from_hour(london_hour: u32) -> Self {
        match london_hour {
            8..=16 => LondonSession::Session,
            _ => LondonSession::Closed,
        }
    }
}

/// One minute-aligned OHLC aggregate (§3 "OHLC bar"), keyed by
/// `(instrument, minute_start_utc)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    pub instrument: Instrument,
    pub minute_start_utc: DateTime<Utc>,

    // Price (4), derived from the raw_spread bid column.
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,

    // Dual spreads (2, nullable).
    pub raw_spread_avg: Option<f64>,
    pub standard_spread_avg: Option<f64>,

    // Dual counts (2, nullable for standard).
    pub tick_count_raw_spread: u32,
    pub tick_count_standard: Option<u32>,

    // Normalized (4, nullable).
    pub range_per_spread: Option<f64>,
    pub range_per_tick: Option<f64>,
    pub body_per_spread: Option<f64>,
    pub body_per_tick: Option<f64>,

    // Session labels (4).
    pub ny_hour: u32,
    pub london_hour: u32,
    pub ny_session: NySession,
    pub london_session: LondonSession,

    // Holiday flags (3).
    pub is_us_holiday: bool,
    pub is_uk_holiday: bool,
    pub is_major_holiday: bool,

    // Exchange-open flags (10), keyed by registry key.
    pub exchange_sessions: [(&'static str, bool); 10],
}

/// Per-instrument coverage summary (§3), computed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    pub instrument: Instrument,
    pub earliest_raw_spread: Option<DateTime<Utc>>,
    pub latest_raw_spread: Option<DateTime<Utc>>,
    pub earliest_standard: Option<DateTime<Utc>>,
    pub latest_standard: Option<DateTime<Utc>>,
    pub raw_spread_tick_count: u64,
    pub standard_tick_count: u64,
    pub ohlc_bar_count: u64,
    pub storage_size_bytes: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instrument_parse_accepts_catalogue_members() {
        assert_eq!(Instrument::parse("EURUSD").unwrap(), Instrument::EURUSD);
        assert_eq!(Instrument::parse("GBPJPY").unwrap(), Instrument::GBPJPY);
    }

    #[test]
    fn instrument_parse_rejects_unknown_symbol() {
        assert!(Instrument::parse("BTCUSD").is_err());
    }

    #[test]
    fn variant_archive_suffix_matches_external_url_template() {
        assert_eq!(Variant::RawSpread.archive_symbol_suffix(), "_Raw_Spread");
        assert_eq!(Variant::Standard.archive_symbol_suffix(), "");
    }

    #[test]
    fn timeframe_parse_round_trips_through_display() {
        for tf in [
            Timeframe::OneMinute,
            Timeframe::FiveMinutes,
            Timeframe::FifteenMinutes,
            Timeframe::ThirtyMinutes,
            Timeframe::OneHour,
            Timeframe::FourHours,
            Timeframe::OneDay,
        ] {
            let s = tf.to_string();
            assert_eq!(Timeframe::parse(&s).unwrap(), tf);
        }
    }

    #[test]
    fn timeframe_parse_rejects_unsupported_frame() {
        assert!(Timeframe::parse("2m").is_err());
    }

    #[test]
    fn ny_session_bands_match_spec_ranges() {
        assert_eq!(NySession::from_hour(9), NySession::Session);
        assert_eq!(NySession::from_hour(16), NySession::Session);
        assert_eq!(NySession::from_hour(17), NySession::AfterHours);
        assert_eq!(NySession::from_hour(20), NySession::AfterHours);
        assert_eq!(NySession::from_hour(21), NySession::Closed);
        assert_eq!(NySession::from_hour(3), NySession::Closed);
    }

    #[test]
    fn london_session_bands_match_spec_ranges() {
        assert_eq!(LondonSession::from_hour(8), LondonSession::Session);
        assert_eq!(LondonSession::from_hour(16), LondonSession::Session);
        assert_eq!(LondonSession::from_hour(17), LondonSession::Closed);
    }
}
