//! OHLC Derivation Engine (C7): turns stored ticks into minute-aligned
//! bars (§4.6). Three entry points cover the three derivation modes the
//! Update Orchestrator drives: a fresh instrument's full history, an
//! incremental append of newly-landed months, and a range repair after a
//! backfill lands ticks earlier than what was already derived.
//!
//! `standard_spread_avg` / `tick_count_standard` are assigned to a minute
//! via an asof-to-preceding join against the raw_spread series — the
//! redesigned join (native, ordered) that replaces the minute-bucket
//! equi-join the system previously used, which silently dropped standard
//! ticks that fell in a minute with no raw_spread tick of its own.

use chrono::{DateTime, TimeZone, Timelike, Utc};
use polars::prelude::*;
use tracing::instrument;

use crate::calendar;
use crate::domain::{Instrument, LondonSession, NySession, OhlcBar, Variant};
use crate::error::{PipelineResult, StoreError};
use crate::store::TickStore;

const MICROS_PER_MINUTE: i64 = 60_000_000;

pub struct OhlcEngine<'a> {
    store: &'a TickStore,
}

impl<'a> OhlcEngine<'a> {
    pub fn new(store: &'a TickStore) -> Self {
        Self { store }
    }

    /// Deletes every existing bar for `instrument` and rederives its full
    /// history from the raw tick series.
    #[instrument(skip(self), fields(%instrument))]
    pub async fn full_rebuild(&self, instrument: Instrument) -> PipelineResult<u64> {
        self.store.delete_all_ohlc(instrument).await?;
        self.derive_range(instrument, None, None).await
    }

    /// Derives bars for the months just appended to the store, without
    /// touching bars outside that range.
    #[instrument(skip(self, months), fields(%instrument, n_months = months.len()))]
    pub async fn incremental_append(
        &self,
        instrument: Instrument,
        months: &[(i32, u32)],
    ) -> PipelineResult<u64> {
        let Some(&(first_year, first_month)) = months.iter().min() else {
            return Ok(0);
        };
        let Some(&(last_year, last_month)) = months.iter().max() else {
            return Ok(0);
        };
        let start = month_start(first_year, first_month);
        let end = month_start(last_year, last_month) + chrono::Months::new(1);
        self.derive_range(instrument, Some(start), Some(end)).await
    }

    /// Re-derives bars in `[start, end)` only — used when a backfill lands
    /// ticks earlier than the instrument's previously-derived range.
    #[instrument(skip(self), fields(%instrument))]
    pub async fn range_repair(
        &self,
        instrument: Instrument,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PipelineResult<u64> {
        self.store.delete_ohlc_range(instrument, start, end).await?;
        self.derive_range(instrument, Some(start), Some(end)).await
    }

    async fn derive_range(
        &self,
        instrument: Instrument,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> PipelineResult<u64> {
        if !self.store.requires_local_derivation() {
            // The remote backend derives bars with a native ASOF JOIN
            // directly in ClickHouse; nothing to fetch into this process.
            return Err(StoreError::Invariant(
                "remote-backend OHLC derivation is not implemented in this build".into(),
            )
            .into());
        }

        let raw = self
            .store
            .scan(instrument, Variant::RawSpread, start, end)
            .await?;
        if raw.height() == 0 {
            return Ok(0);
        }
        let standard = self
            .store
            .scan(instrument, Variant::Standard, start, end)
            .await?;

        let aggregated = aggregate(raw, standard)?;
        let bars = dataframe_to_bars(instrument, aggregated)?;
        self.store.upsert_ohlc(instrument, bars).await
    }
}

fn month_start(year: i32, month: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .expect("valid calendar month")
}

fn floor_to_minute(column: &str) -> Expr {
    ((col(column).cast(DataType::Int64) / lit(MICROS_PER_MINUTE)).floor().cast(DataType::Int64)
        * lit(MICROS_PER_MINUTE))
    .cast(DataType::Datetime(TimeUnit::Microseconds, Some(TimeZone::UTC)))
}

/// Builds the joined per-minute aggregate frame: OHLC + raw spread/count
/// from `raw_spread_ticks`, and standard spread/count matched in via an
/// asof-to-preceding join against the same raw series.
fn aggregate(raw: DataFrame, standard: DataFrame) -> PipelineResult<DataFrame> {
    let raw_sorted = raw
        .lazy()
        .with_row_index("arrival_idx", None)
        .sort(["timestamp"], SortMultipleOptions::default().with_maintain_order(true))
        .with_column(floor_to_minute("timestamp").alias("minute_start_utc"));

    // open/close tie-break (§4.6): when two ticks share the bucket's
    // minimum (open) or maximum (close) timestamp, the one that arrived
    // later in the source archive wins. `arrival_idx` records that
    // arrival order so the tie-break doesn't depend on the incidental
    // stability of the outer `sort` above.
    let open_tiebreak = SortMultipleOptions::default().with_order_descending_multi([false, true]);
    let close_tiebreak = SortMultipleOptions::default().with_order_descending_multi([false, false]);

    let raw_grouped = raw_sorted
        .clone()
        .group_by([col("minute_start_utc")])
        .agg([
            col("bid")
                .sort_by([col("timestamp"), col("arrival_idx")], open_tiebreak)
                .first()
                .alias("open"),
            col("bid").max().alias("high"),
            col("bid").min().alias("low"),
            col("bid")
                .sort_by([col("timestamp"), col("arrival_idx")], close_tiebreak)
                .last()
                .alias("close"),
            (col("ask") - col("bid")).mean().alias("raw_spread_avg"),
            col("bid").count().cast(DataType::UInt32).alias("tick_count_raw_spread"),
        ]);

    let standard_with_bucket = if standard.height() == 0 {
        empty_bucket_frame()?
    } else {
        let standard_sorted = standard
            .lazy()
            .sort(["timestamp"], SortMultipleOptions::default().with_maintain_order(true));
        let raw_minutes = raw_sorted
            .clone()
            .select([col("timestamp"), col("minute_start_utc")]);

        standard_sorted
            .join_asof(
                raw_minutes,
                col("timestamp"),
                col("timestamp"),
                AsofStrategy::Backward,
                None,
                None,
                None,
            )
            .map_err(StoreError::Polars)?
            .filter(col("minute_start_utc").is_not_null())
            .group_by([col("minute_start_utc")])
            .agg([
                (col("ask") - col("bid")).mean().alias("standard_spread_avg"),
                col("bid").count().cast(DataType::UInt32).alias("tick_count_standard"),
            ])
    };

    let joined = raw_grouped
        .join(
            standard_with_bucket,
            [col("minute_start_utc")],
            [col("minute_start_utc")],
            JoinArgs::new(JoinType::Left),
        )
        .with_columns([
            null_safe_ratio(col("high") - col("low"), col("standard_spread_avg")).alias("range_per_spread"),
            null_safe_ratio(
                col("high") - col("low"),
                col("tick_count_standard").cast(DataType::Float64),
            )
            .alias("range_per_tick"),
            null_safe_ratio((col("close") - col("open")).abs(), col("standard_spread_avg"))
                .alias("body_per_spread"),
            null_safe_ratio(
                (col("close") - col("open")).abs(),
                col("tick_count_standard").cast(DataType::Float64),
            )
            .alias("body_per_tick"),
        ])
        .sort(
            ["minute_start_utc"],
            SortMultipleOptions::default().with_maintain_order(true),
        );

    joined.collect().map_err(|e| StoreError::Polars(e).into())
}

/// `numerator / denominator`, or NULL when the denominator is NULL, zero,
/// or otherwise non-finite (§3 "normalized metrics").
fn null_safe_ratio(numerator: Expr, denominator: Expr) -> Expr {
    when(denominator.clone().neq(lit(0.0)).and(denominator.clone().is_not_null()))
        .then(numerator / denominator)
        .otherwise(lit(NULL))
}

fn empty_bucket_frame() -> PipelineResult<LazyFrame> {
    let df = df![
        "minute_start_utc" => Vec::<i64>::new(),
        "standard_spread_avg" => Vec::<f64>::new(),
        "tick_count_standard" => Vec::<u32>::new(),
    ]
    .map_err(StoreError::Polars)?;
    Ok(df
        .lazy()
        .with_column(col("minute_start_utc").cast(DataType::Datetime(TimeUnit::Microseconds, Some(TimeZone::UTC)))))
}

fn dataframe_to_bars(instrument: Instrument, df: DataFrame) -> PipelineResult<Vec<OhlcBar>> {
    let n = df.height();
    let minute_start_utc = df.column("minute_start_utc").map_err(StoreError::Polars)?.datetime().map_err(StoreError::Polars)?;
    let open = df.column("open").map_err(StoreError::Polars)?.f64().map_err(StoreError::Polars)?;
    let high = df.column("high").map_err(StoreError::Polars)?.f64().map_err(StoreError::Polars)?;
    let low = df.column("low").map_err(StoreError::Polars)?.f64().map_err(StoreError::Polars)?;
    let close = df.column("close").map_err(StoreError::Polars)?.f64().map_err(StoreError::Polars)?;
    let raw_spread_avg = df.column("raw_spread_avg").map_err(StoreError::Polars)?.f64().map_err(StoreError::Polars)?;
    let standard_spread_avg = df.column("standard_spread_avg").map_err(StoreError::Polars)?.f64().map_err(StoreError::Polars)?;
    let tick_count_raw_spread = df.column("tick_count_raw_spread").map_err(StoreError::Polars)?.u32().map_err(StoreError::Polars)?;
    let tick_count_standard = df.column("tick_count_standard").map_err(StoreError::Polars)?.u32().map_err(StoreError::Polars)?;
    let range_per_spread = df.column("range_per_spread").map_err(StoreError::Polars)?.f64().map_err(StoreError::Polars)?;
    let range_per_tick = df.column("range_per_tick").map_err(StoreError::Polars)?.f64().map_err(StoreError::Polars)?;
    let body_per_spread = df.column("body_per_spread").map_err(StoreError::Polars)?.f64().map_err(StoreError::Polars)?;
    let body_per_tick = df.column("body_per_tick").map_err(StoreError::Polars)?.f64().map_err(StoreError::Polars)?;

    let mut bars = Vec::with_capacity(n);
    for i in 0..n {
        let ts_micros = minute_start_utc.get(i).ok_or_else(|| {
            StoreError::Invariant("minute_start_utc must not be NULL in a derived bar".to_string())
        })?;
        let ts = DateTime::from_timestamp_micros(ts_micros).ok_or_else(|| {
            StoreError::Invariant(format!("timestamp {ts_micros} out of range"))
        })?;

        let ny_cfg = crate::registry::get("nyse").expect("nyse is always registered");
        let london_cfg = crate::registry::get("lse").expect("lse is always registered");
        let ny_tz: chrono_tz::Tz = ny_cfg.timezone.parse().expect("nyse timezone is valid");
        let london_tz: chrono_tz::Tz = london_cfg.timezone.parse().expect("lse timezone is valid");
        let ny_hour = ny_tz.from_utc_datetime(&ts.naive_utc()).hour();
        let london_hour = london_tz.from_utc_datetime(&ts.naive_utc()).hour();

        let flags = calendar::flags_for(ts)?;

        bars.push(OhlcBar {
            instrument,
            minute_start_utc: ts,
            open: open.get(i).ok_or_else(|| StoreError::Invariant("open must not be NULL".into()))?,
            high: high.get(i).ok_or_else(|| StoreError::Invariant("high must not be NULL".into()))?,
            low: low.get(i).ok_or_else(|| StoreError::Invariant("low must not be NULL".into()))?,
            close: close.get(i).ok_or_else(|| StoreError::Invariant("close must not be NULL".into()))?,
            raw_spread_avg: raw_spread_avg.get(i),
            standard_spread_avg: standard_spread_avg.get(i),
            tick_count_raw_spread: tick_count_raw_spread
                .get(i)
                .ok_or_else(|| StoreError::Invariant("tick_count_raw_spread must not be NULL".into()))?,
            tick_count_standard: tick_count_standard.get(i),
            range_per_spread: range_per_spread.get(i),
            range_per_tick: range_per_tick.get(i),
            body_per_spread: body_per_spread.get(i),
            body_per_tick: body_per_tick.get(i),
            ny_hour,
            london_hour,
            ny_session: NySession::from_hour(ny_hour),
            london_session: LondonSession::from_hour(london_hour),
            is_us_holiday: flags.is_us_holiday,
            is_uk_holiday: flags.is_uk_holiday,
            is_major_holiday: flags.is_major_holiday,
            exchange_sessions: flags.exchange_sessions,
        });
    }
    Ok(bars)
}

/// Flattened row shape for the ClickHouse `ohlc_1m` table. The 10
/// exchange-open flags are named fields rather than a dynamic map because
/// `clickhouse::Row` derives its wire schema at compile time; the field
/// order here must track `registry::EXCHANGES`.
#[derive(clickhouse::Row, serde::Serialize)]
pub struct ClickHouseOhlcRow {
    pub instrument: String,
    #[serde(with = "clickhouse::serde::time::datetime64::micros")]
    pub minute_start_utc: time::OffsetDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub raw_spread_avg: Option<f64>,
    pub standard_spread_avg: Option<f64>,
    pub tick_count_raw_spread: u32,
    pub tick_count_standard: Option<u32>,
    pub range_per_spread: Option<f64>,
    pub range_per_tick: Option<f64>,
    pub body_per_spread: Option<f64>,
    pub body_per_tick: Option<f64>,
    pub ny_hour: u32,
    pub london_hour: u32,
    pub ny_session: String,
    pub london_session: String,
    pub is_us_holiday: bool,
    pub is_uk_holiday: bool,
    pub is_major_holiday: bool,
    pub is_nyse_session: bool,
    pub is_lse_session: bool,
    pub is_xswx_session: bool,
    pub is_xfra_session: bool,
    pub is_xtse_session: bool,
    pub is_xnze_session: bool,
    pub is_xtks_session: bool,
    pub is_xasx_session: bool,
    pub is_xhkg_session: bool,
    pub is_xses_session: bool,
}

pub(crate) fn bar_to_clickhouse_row(bar: &OhlcBar) -> ClickHouseOhlcRow {
    let s = &bar.exchange_sessions;
    ClickHouseOhlcRow {
        instrument: bar.instrument.as_str().to_string(),
        minute_start_utc: time::OffsetDateTime::from_unix_timestamp(bar.minute_start_utc.timestamp())
            .unwrap_or(time::OffsetDateTime::UNIX_EPOCH),
        open: bar.open,
        high: bar.high,
        low: bar.low,
        close: bar.close,
        raw_spread_avg: bar.raw_spread_avg,
        standard_spread_avg: bar.standard_spread_avg,
        tick_count_raw_spread: bar.tick_count_raw_spread,
        tick_count_standard: bar.tick_count_standard,
        range_per_spread: bar.range_per_spread,
        range_per_tick: bar.range_per_tick,
        body_per_spread: bar.body_per_spread,
        body_per_tick: bar.body_per_tick,
        ny_hour: bar.ny_hour,
        london_hour: bar.london_hour,
        ny_session: bar.ny_session.to_string(),
        london_session: bar.london_session.to_string(),
        is_us_holiday: bar.is_us_holiday,
        is_uk_holiday: bar.is_uk_holiday,
        is_major_holiday: bar.is_major_holiday,
        is_nyse_session: s[0].1,
        is_lse_session: s[1].1,
        is_xswx_session: s[2].1,
        is_xfra_session: s[3].1,
        is_xtse_session: s[4].1,
        is_xnze_session: s[5].1,
        is_xtks_session: s[6].1,
        is_xasx_session: s[7].1,
        is_xhkg_session: s[8].1,
        is_xses_session: s[9].1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Tick, Variant};
    use crate::store::TickStore;

    fn tick(ts: DateTime<Utc>, bid: f64, ask: f64) -> Tick {
        Tick {
            instrument: Instrument::EURUSD,
            timestamp: ts,
            bid,
            ask,
        }
    }

    #[tokio::test]
    async fn full_rebuild_derives_a_single_minute_bar() {
        let dir = tempfile::tempdir().unwrap();
        let store = TickStore::Embedded(crate::store::ParquetStore::local(dir.path()));

        let base = Utc.with_ymd_and_hms(2024, 8, 1, 10, 30, 0).unwrap();
        let raw_ticks = vec![
            tick(base, 1.1000, 1.1001),
            tick(base + chrono::Duration::seconds(10), 1.1005, 1.1007),
            tick(base + chrono::Duration::seconds(20), 1.0998, 1.1000),
            tick(base + chrono::Duration::seconds(40), 1.1003, 1.1006),
        ];
        store
            .append(Instrument::EURUSD, Variant::RawSpread, raw_ticks)
            .await
            .unwrap();

        let standard_ticks = vec![tick(base + chrono::Duration::seconds(15), 1.1004, 1.1009)];
        store
            .append(Instrument::EURUSD, Variant::Standard, standard_ticks)
            .await
            .unwrap();

        let engine = OhlcEngine::new(&store);
        let inserted = engine.full_rebuild(Instrument::EURUSD).await.unwrap();
        assert_eq!(inserted, 1);
    }

    #[tokio::test]
    async fn open_tiebreak_prefers_the_later_arriving_tick_at_the_shared_minimum_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let store = TickStore::Embedded(crate::store::ParquetStore::local(dir.path()));

        let minute_open = Utc.with_ymd_and_hms(2024, 8, 1, 10, 30, 0).unwrap();
        // Both ticks share minute_open as their timestamp; the second one
        // (1.2000) arrives later in the archive and must win "open".
        let raw_ticks = vec![
            tick(minute_open, 1.1000, 1.1001),
            tick(minute_open, 1.2000, 1.2001),
            tick(minute_open + chrono::Duration::seconds(30), 1.1500, 1.1502),
        ];
        store
            .append(Instrument::EURUSD, Variant::RawSpread, raw_ticks)
            .await
            .unwrap();

        let engine = OhlcEngine::new(&store);
        engine.full_rebuild(Instrument::EURUSD).await.unwrap();

        let facade = crate::query::QueryFacade::new(&store);
        let bars = facade
            .query_ohlc(Instrument::EURUSD, crate::domain::Timeframe::OneMinute, None, None)
            .await
            .unwrap();
        assert_eq!(bars.height(), 1);
        let open = bars.column("open").unwrap().f64().unwrap().get(0).unwrap();
        assert_eq!(open, 1.2000);
    }

    #[tokio::test]
    async fn rebuild_with_no_raw_spread_ticks_derives_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = TickStore::Embedded(crate::store::ParquetStore::local(dir.path()));
        let engine = OhlcEngine::new(&store);
        let inserted = engine.full_rebuild(Instrument::EURUSD).await.unwrap();
        assert_eq!(inserted, 0);
    }
}
