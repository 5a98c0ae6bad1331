mod common;

use chrono::{TimeZone, Utc};
use exness_tickstore::ohlc::OhlcEngine;
use exness_tickstore::store::{ParquetStore, TickStore};
use exness_tickstore::{Instrument, QueryFacade, Timeframe, Variant};
use polars::prelude::*;

fn tick(instrument: Instrument, ts: chrono::DateTime<Utc>, bid: f64, ask: f64) -> exness_tickstore::Tick {
    exness_tickstore::Tick {
        instrument,
        timestamp: ts,
        bid,
        ask,
    }
}

/// S5: resampling two synthetic 1-minute bars to 5m reproduces a simple
/// hand-computed OHLC roll-up (open of the first child, close of the
/// last, high/low across both) rather than averaging derived ratios.
#[tokio::test]
async fn five_minute_resample_matches_hand_computed_rollup() {
    let dir = tempfile::tempdir().unwrap();
    let store = TickStore::Embedded(ParquetStore::local(dir.path()));

    let base = Utc.with_ymd_and_hms(2024, 8, 1, 14, 30, 0).unwrap();
    let mut raw_ticks = Vec::new();
    for minute_offset in 0..2 {
        let minute_start = base + chrono::Duration::minutes(minute_offset);
        raw_ticks.push(tick(Instrument::EURUSD, minute_start, 1.1000 + minute_offset as f64 * 0.0010, 1.1002 + minute_offset as f64 * 0.0010));
        raw_ticks.push(tick(
            Instrument::EURUSD,
            minute_start + chrono::Duration::seconds(30),
            1.1000 + minute_offset as f64 * 0.0010 + 0.0005,
            1.1003 + minute_offset as f64 * 0.0010,
        ));
    }
    store
        .append(Instrument::EURUSD, Variant::RawSpread, raw_ticks)
        .await
        .unwrap();

    let engine = OhlcEngine::new(&store);
    let inserted = engine.full_rebuild(Instrument::EURUSD).await.unwrap();
    assert_eq!(inserted, 2);

    let query = QueryFacade::new(&store);
    let native = query
        .query_ohlc(Instrument::EURUSD, Timeframe::OneMinute, None, None)
        .await
        .unwrap();
    assert_eq!(native.height(), 2);

    let resampled = query
        .query_ohlc(Instrument::EURUSD, Timeframe::FiveMinutes, None, None)
        .await
        .unwrap();
    assert_eq!(resampled.height(), 1);

    let open = resampled.column("open").unwrap().f64().unwrap().get(0).unwrap();
    let close = resampled.column("close").unwrap().f64().unwrap().get(0).unwrap();
    let high = resampled.column("high").unwrap().f64().unwrap().get(0).unwrap();
    let low = resampled.column("low").unwrap().f64().unwrap().get(0).unwrap();

    let native_open = native.column("open").unwrap().f64().unwrap();
    let native_close = native.column("close").unwrap().f64().unwrap();
    let native_high = native.column("high").unwrap().f64().unwrap();
    let native_low = native.column("low").unwrap().f64().unwrap();

    assert_eq!(open, native_open.get(0).unwrap());
    assert_eq!(close, native_close.get(1).unwrap());
    assert_eq!(high, native_high.get(0).unwrap().max(native_high.get(1).unwrap()));
    assert_eq!(low, native_low.get(0).unwrap().min(native_low.get(1).unwrap()));
}

/// S6: a bar derived for a known NYSE/LSE holiday carries the holiday
/// flags, distinguishing it from an ordinary trading day.
#[tokio::test]
async fn bar_on_new_years_day_carries_major_holiday_flag() {
    let dir = tempfile::tempdir().unwrap();
    let store = TickStore::Embedded(ParquetStore::local(dir.path()));

    let holiday_minute = Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap();
    let ordinary_minute = Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap();
    store
        .append(
            Instrument::EURUSD,
            Variant::RawSpread,
            vec![
                tick(Instrument::EURUSD, holiday_minute, 1.1000, 1.1002),
                tick(Instrument::EURUSD, ordinary_minute, 1.1010, 1.1012),
            ],
        )
        .await
        .unwrap();

    let engine = OhlcEngine::new(&store);
    engine.full_rebuild(Instrument::EURUSD).await.unwrap();

    let query = QueryFacade::new(&store);
    let bars = query
        .query_ohlc(Instrument::EURUSD, Timeframe::OneMinute, None, None)
        .await
        .unwrap();
    assert_eq!(bars.height(), 2);

    let is_major_holiday = bars.column("is_major_holiday").unwrap().bool().unwrap();
    assert!(is_major_holiday.get(0).unwrap());
    assert!(!is_major_holiday.get(1).unwrap());
}
