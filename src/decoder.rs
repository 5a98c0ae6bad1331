//! Tick Decoder (C4): extracts the single CSV member from a monthly
//! archive and parses it into typed ticks.
//!
//! Required columns are read by name — `Timestamp`, `Bid`, `Ask` — never by
//! position, tolerating the header variations real archives ship with
//! (extra `Exness`/`Symbol` preamble columns, reordering).

use std::io::Read as _;

use chrono::{DateTime, Utc};

use crate::domain::{Instrument, Tick};
use crate::error::DecodeError;

const REQUIRED_COLUMNS: [&str; 3] = ["Timestamp", "Bid", "Ask"];

/// Bytes of a downloaded (and not yet extracted) archive, tagged with the
/// instrument/variant/month it belongs to for error context.
pub struct ArchiveHandle {
    pub instrument: Instrument,
    pub archive_stem: String,
    pub bytes: Vec<u8>,
}

/// Extracts the archive's one CSV member and parses it into ticks.
///
/// The CSV member name mirrors the archive stem (`<symbol>_<YYYY>_<MM>.csv`);
/// any single CSV member present is accepted rather than hard-failing on an
/// exact name mismatch, since archives are internally self-consistent (one
/// CSV per ZIP) and the exact stem is cosmetic.
pub fn decode(handle: ArchiveHandle) -> Result<Vec<Tick>, DecodeError> {
    let cursor = std::io::Cursor::new(handle.bytes);
    let mut zip = zip::ZipArchive::new(cursor)?;

    let csv_index = (0..zip.len())
        .find(|&i| {
            zip.by_index(i)
                .map(|f| f.name().to_lowercase().ends_with(".csv"))
                .unwrap_or(false)
        })
        .ok_or_else(|| {
            DecodeError::MissingCsvMember(
                handle.instrument.to_string(),
                format!("{}.csv", handle.archive_stem),
            )
        })?;

    let mut csv_file = zip.by_index(csv_index)?;
    let mut contents = String::new();
    csv_file.read_to_string(&mut contents)?;
    drop(csv_file);

    parse_csv(handle.instrument, &contents)
}

fn parse_csv(instrument: Instrument, contents: &str) -> Result<Vec<Tick>, DecodeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(contents.as_bytes());

    let headers = reader.headers()?.clone();
    let mut column_index = std::collections::HashMap::new();
    for required in REQUIRED_COLUMNS {
        let idx = headers
            .iter()
            .position(|h| h == required)
            .ok_or_else(|| DecodeError::MissingColumn(required.to_string()))?;
        column_index.insert(required, idx);
    }

    let ts_idx = column_index["Timestamp"];
    let bid_idx = column_index["Bid"];
    let ask_idx = column_index["Ask"];

    let mut ticks = Vec::new();
    for record in reader.records() {
        let record = record?;

        let ts_raw = record
            .get(ts_idx)
            .ok_or_else(|| DecodeError::MissingColumn("Timestamp".to_string()))?;
        let timestamp = parse_timestamp(ts_raw)?;

        let bid_raw = record
            .get(bid_idx)
            .ok_or_else(|| DecodeError::MissingColumn("Bid".to_string()))?;
        let bid = parse_price(bid_raw, "Bid")?;

        let ask_raw = record
            .get(ask_idx)
            .ok_or_else(|| DecodeError::MissingColumn("Ask".to_string()))?;
        let ask = parse_price(ask_raw, "Ask")?;

        ticks.push(Tick {
            instrument,
            timestamp,
            bid,
            ask,
        });
    }

    Ok(ticks)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DecodeError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    // Exness archives commonly ship `YYYYMMDD HHMMSSfff` without separators.
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%Y%m%d %H%M%S%3f") {
        return Ok(DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    Err(DecodeError::InvalidTimestamp(raw.to_string()))
}

fn parse_price(raw: &str, column: &str) -> Result<f64, DecodeError> {
    let value: f64 = raw
        .parse()
        .map_err(|_| DecodeError::InvalidPrice(raw.to_string(), column.to_string()))?;
    if value.is_nan() {
        return Err(DecodeError::NaNPrice(column.to_string()));
    }
    if value < 0.0 {
        return Err(DecodeError::NegativePrice(value, column.to_string()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_csv_with_required_columns_only() {
        let csv = "Timestamp,Bid,Ask\n2024-08-01T00:00:00.123Z,1.1000,1.1002\n";
        let ticks = parse_csv(Instrument::EURUSD, csv).unwrap();
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].bid, 1.1000);
        assert_eq!(ticks[0].ask, 1.1002);
    }

    #[test]
    fn tolerates_extra_preamble_columns_and_reordering() {
        let csv = "Exness,Symbol,Ask,Timestamp,Bid\nExness,EURUSD,1.1002,2024-08-01T00:00:00Z,1.1000\n";
        let ticks = parse_csv(Instrument::EURUSD, csv).unwrap();
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].bid, 1.1000);
        assert_eq!(ticks[0].ask, 1.1002);
    }

    #[test]
    fn missing_required_column_is_malformed_archive() {
        let csv = "Timestamp,Bid\n2024-08-01T00:00:00Z,1.1000\n";
        let err = parse_csv(Instrument::EURUSD, csv).unwrap_err();
        assert!(matches!(err, DecodeError::MissingColumn(col) if col == "Ask"));
    }

    #[test]
    fn non_numeric_price_is_malformed_archive() {
        let csv = "Timestamp,Bid,Ask\n2024-08-01T00:00:00Z,abc,1.1002\n";
        let err = parse_csv(Instrument::EURUSD, csv).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidPrice(_, col) if col == "Bid"));
    }

    #[test]
    fn negative_price_is_rejected() {
        let csv = "Timestamp,Bid,Ask\n2024-08-01T00:00:00Z,-1.0,1.1002\n";
        let err = parse_csv(Instrument::EURUSD, csv).unwrap_err();
        assert!(matches!(err, DecodeError::NegativePrice(v, col) if v == -1.0 && col == "Bid"));
    }

    #[test]
    fn unparseable_timestamp_is_rejected() {
        let csv = "Timestamp,Bid,Ask\nnot-a-date,1.1000,1.1002\n";
        let err = parse_csv(Instrument::EURUSD, csv).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidTimestamp(_)));
    }

    #[test]
    fn preserves_arrival_order() {
        let csv = "Timestamp,Bid,Ask\n\
            2024-08-01T00:00:02Z,1.1005,1.1007\n\
            2024-08-01T00:00:01Z,1.1000,1.1002\n";
        let ticks = parse_csv(Instrument::EURUSD, csv).unwrap();
        assert_eq!(ticks[0].bid, 1.1005);
        assert_eq!(ticks[1].bid, 1.1000);
    }
}
