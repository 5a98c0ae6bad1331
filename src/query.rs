//! Query Facade (C8): the single read surface the rest of the system (and
//! downstream consumers) is expected to use instead of reaching into a
//! `TickStore` directly. On-the-fly resampling (§4.7) recomputes every
//! normalized/session column from the bucket's own aggregates rather than
//! averaging the 1-minute children's precomputed values, since an average
//! of ratios is not the ratio of the total.

use chrono::{DateTime, Utc};
use polars::prelude::*;
use tracing::instrument;

use crate::domain::{Coverage, Instrument, Timeframe, Variant};
use crate::error::{PipelineResult, StoreError};
use crate::store::TickStore;

pub struct QueryFacade<'a> {
    store: &'a TickStore,
}

impl<'a> QueryFacade<'a> {
    pub fn new(store: &'a TickStore) -> Self {
        Self { store }
    }

    pub fn list_instruments(&self) -> Vec<Instrument> {
        Instrument::ALL.to_vec()
    }

    #[instrument(skip(self), fields(%instrument, ?variant))]
    pub async fn query_ticks(
        &self,
        instrument: Instrument,
        variant: Variant,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> PipelineResult<DataFrame> {
        self.store.scan(instrument, variant, start, end).await
    }

    /// `1m` is a direct passthrough of the natively stored bars; every
    /// other timeframe is derived on the fly by the resampling rules in
    /// §4.7.
    #[instrument(skip(self), fields(%instrument, ?timeframe))]
    pub async fn query_ohlc(
        &self,
        instrument: Instrument,
        timeframe: Timeframe,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> PipelineResult<DataFrame> {
        let native = self.native_ohlc(instrument, start, end).await?;
        if matches!(timeframe, Timeframe::OneMinute) {
            return Ok(native);
        }
        resample(native, timeframe)
    }

    async fn native_ohlc(
        &self,
        instrument: Instrument,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> PipelineResult<DataFrame> {
        match self.store {
            TickStore::Embedded(store) => {
                store.read_ohlc_range(instrument, start, end).await
            }
            TickStore::Remote(_) => Err(StoreError::Invariant(
                "OHLC query over the remote backend is not implemented in this build".into(),
            )
            .into()),
        }
    }

    #[instrument(skip(self), fields(%instrument))]
    pub async fn get_coverage(&self, instrument: Instrument) -> PipelineResult<Coverage> {
        let raw_range = self.store.range(instrument, Variant::RawSpread).await?;
        let standard_range = self.store.range(instrument, Variant::Standard).await?;
        let raw_count = self.store.count(instrument, Variant::RawSpread).await?;
        let standard_count = self.store.count(instrument, Variant::Standard).await?;

        let native = self.native_ohlc(instrument, None, None).await.unwrap_or_else(|_| {
            DataFrame::empty()
        });

        Ok(Coverage {
            instrument,
            earliest_raw_spread: raw_range.map(|(lo, _)| lo),
            latest_raw_spread: raw_range.map(|(_, hi)| hi),
            earliest_standard: standard_range.map(|(lo, _)| lo),
            latest_standard: standard_range.map(|(_, hi)| hi),
            raw_spread_tick_count: raw_count,
            standard_tick_count: standard_count,
            ohlc_bar_count: native.height() as u64,
            storage_size_bytes: self.store.storage_size_bytes(instrument).await?,
        })
    }
}

/// Floors `minute_start_utc` to the containing `timeframe` bucket and
/// recomputes every derived column from scratch, rather than rolling up
/// the 1-minute rows' own derived values.
fn resample(native: DataFrame, timeframe: Timeframe) -> PipelineResult<DataFrame> {
    if native.height() == 0 {
        return Ok(native);
    }

    let bucket_micros = timeframe.duration().num_microseconds().ok_or_else(|| {
        StoreError::Invariant(format!("timeframe {timeframe} has no microsecond width"))
    })?;

    let lf = native
        .lazy()
        .with_column(
            ((col("minute_start_utc").cast(DataType::Int64) / lit(bucket_micros))
                .floor()
                .cast(DataType::Int64)
                * lit(bucket_micros))
            .cast(DataType::Datetime(TimeUnit::Microseconds, Some(TimeZone::UTC)))
            .alias("bucket_start_utc"),
        )
        .sort(
            ["minute_start_utc"],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .group_by([col("instrument"), col("bucket_start_utc")])
        .agg([
            col("open").first().alias("open"),
            col("high").max().alias("high"),
            col("low").min().alias("low"),
            col("close").last().alias("close"),
            col("raw_spread_avg").mean().alias("raw_spread_avg"),
            col("standard_spread_avg").mean().alias("standard_spread_avg"),
            col("tick_count_raw_spread").sum().alias("tick_count_raw_spread"),
            col("tick_count_standard").sum().alias("tick_count_standard"),
            col("is_us_holiday").any(false).alias("is_us_holiday"),
            col("is_uk_holiday").any(false).alias("is_uk_holiday"),
            col("is_major_holiday").any(false).alias("is_major_holiday"),
        ])
        .rename(["bucket_start_utc"], ["minute_start_utc"], true)
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

    lf.collect().map_err(|e| StoreError::Polars(e).into())
}

fn null_safe_ratio(numerator: Expr, denominator: Expr) -> Expr {
    when(denominator.clone().neq(lit(0.0)).and(denominator.clone().is_not_null()))
        .then(numerator / denominator)
        .otherwise(lit(NULL))
}
