//! Exchange Registry (C1): a fixed, immutable table of the exchanges used to
//! derive session/holiday columns on OHLC bars. There is no runtime
//! registration; adding an exchange means adding an entry here.

use crate::error::InstrumentError;

/// Immutable metadata for a single exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeConfig {
    /// ISO 10383 MIC code, e.g. `"XNYS"`.
    pub mic: &'static str,
    pub name: &'static str,
    pub currency: &'static str,
    /// IANA timezone name, resolved against `chrono-tz`.
    pub timezone: &'static str,
    pub country: &'static str,
    pub open_hour: u32,
    pub open_minute: u32,
    pub close_hour: u32,
    pub close_minute: u32,
}

/// Registry key paired with its configuration, in fixed iteration order.
pub const EXCHANGES: &[(&str, ExchangeConfig)] = &[
    (
        "nyse",
        ExchangeConfig {
            mic: "XNYS",
            name: "New York Stock Exchange",
            currency: "USD",
            timezone: "America/New_York",
            country: "United States",
            open_hour: 9,
            open_minute: 30,
            close_hour: 16,
            close_minute: 0,
        },
    ),
    (
        "lse",
        ExchangeConfig {
            mic: "XLON",
            name: "London Stock Exchange",
            currency: "GBP",
            timezone: "Europe/London",
            country: "United Kingdom",
            open_hour: 8,
            open_minute: 0,
            close_hour: 16,
            close_minute: 30,
        },
    ),
    (
        "xswx",
        ExchangeConfig {
            mic: "XSWX",
            name: "SIX Swiss Exchange",
            currency: "CHF",
            timezone: "Europe/Zurich",
            country: "Switzerland",
            open_hour: 9,
            open_minute: 0,
            close_hour: 17,
            close_minute: 30,
        },
    ),
    (
        "xfra",
        ExchangeConfig {
            mic: "XFRA",
            name: "Frankfurt Stock Exchange",
            currency: "EUR",
            timezone: "Europe/Berlin",
            country: "Germany",
            open_hour: 9,
            open_minute: 0,
            close_hour: 17,
            close_minute: 30,
        },
    ),
    (
        "xtse",
        ExchangeConfig {
            mic: "XTSE",
            name: "Toronto Stock Exchange",
            currency: "CAD",
            timezone: "America/Toronto",
            country: "Canada",
            open_hour: 9,
            open_minute: 30,
            close_hour: 16,
            close_minute: 0,
        },
    ),
    (
        "xnze",
        ExchangeConfig {
            mic: "XNZE",
            name: "New Zealand Exchange",
            currency: "NZD",
            timezone: "Pacific/Auckland",
            country: "New Zealand",
            open_hour: 10,
            open_minute: 0,
            close_hour: 16,
            close_minute: 45,
        },
    ),
    (
        "xtks",
        ExchangeConfig {
            mic: "XTKS",
            name: "Tokyo Stock Exchange",
            currency: "JPY",
            timezone: "Asia/Tokyo",
            country: "Japan",
            open_hour: 9,
            open_minute: 0,
            close_hour: 15,
            close_minute: 0,
        },
    ),
    (
        "xasx",
        ExchangeConfig {
            mic: "XASX",
            name: "Australian Securities Exchange",
            currency: "AUD",
            timezone: "Australia/Sydney",
            country: "Australia",
            open_hour: 10,
            open_minute: 0,
            close_hour: 16,
            close_minute: 0,
        },
    ),
    (
        "xhkg",
        ExchangeConfig {
            mic: "XHKG",
            name: "Hong Kong Stock Exchange",
            currency: "HKD",
            timezone: "Asia/Hong_Kong",
            country: "Hong Kong",
            open_hour: 9,
            open_minute: 30,
            close_hour: 16,
            close_minute: 0,
        },
    ),
    (
        "xses",
        ExchangeConfig {
            mic: "XSES",
            name: "Singapore Exchange",
            currency: "SGD",
            timezone: "Asia/Singapore",
            country: "Singapore",
            open_hour: 9,
            open_minute: 0,
            close_hour: 17,
            close_minute: 0,
        },
    ),
];

/// Looks up an exchange by its registry key (e.g. `"nyse"`). Fails loudly
/// on an unknown key rather than silently skipping the session column.
pub fn get(key: &str) -> Result<ExchangeConfig, InstrumentError> {
    EXCHANGES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, cfg)| *cfg)
        .ok_or_else(|| {
            InstrumentError::UnknownExchange(
                key.to_string(),
                EXCHANGES.iter().map(|(k, _)| k.to_string()).collect(),
            )
        })
}

/// All registry keys, in fixed order. Used to derive the 10
/// `is_<key>_session` OHLC columns.
pub fn keys() -> impl Iterator<Item = &'static str> {
    EXCHANGES.iter().map(|(k, _)| *k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_exactly_ten_exchanges() {
        assert_eq!(EXCHANGES.len(), 10);
    }

    #[test]
    fn lookup_succeeds_for_known_key() {
        let cfg = get("nyse").unwrap();
        assert_eq!(cfg.mic, "XNYS");
        assert_eq!(cfg.timezone, "America/New_York");
    }

    #[test]
    fn lookup_fails_loudly_for_unknown_key() {
        let err = get("nasdaq").unwrap_err();
        match err {
            InstrumentError::UnknownExchange(key, available) => {
                assert_eq!(key, "nasdaq");
                assert_eq!(available.len(), 10);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn keys_are_stable_and_match_registry_order() {
        let ks: Vec<_> = keys().collect();
        assert_eq!(
            ks,
            vec![
                "nyse", "lse", "xswx", "xfra", "xtse", "xnze", "xtks", "xasx", "xhkg", "xses"
            ]
        );
    }
}
