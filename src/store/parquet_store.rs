//! Embedded/cloud Tick Store backend: Parquet partitions addressed through
//! `StorageLocation` (teacher's `io.rs` abstraction). One partition file per
//! `(instrument, variant, year, month)` for ticks, and per `(instrument,
//! year)` for OHLC bars, keeping scans over multi-year histories bounded.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Datelike, Utc};
use polars::io::cloud::CloudOptions;
use polars::prelude::*;
use tracing::instrument;

use crate::domain::{Instrument, OhlcBar, Tick, Variant};
use crate::error::{PipelineError, PipelineResult, StoreError};
use crate::io::StorageLocation;
use crate::store::schema;

#[derive(Debug, Clone)]
enum Backend {
    Local(PathBuf),
    Cloud { path: String, options: CloudOptions },
}

pub struct ParquetStore {
    backend: Backend,
}

impl ParquetStore {
    pub fn local(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: Backend::Local(base_dir.into()),
        }
    }

    pub fn cloud(path: impl Into<String>, options: CloudOptions) -> Self {
        Self {
            backend: Backend::Cloud {
                path: path.into(),
                options,
            },
        }
    }

    fn location(&self) -> StorageLocation<'_> {
        match &self.backend {
            Backend::Local(p) => StorageLocation::Local(p),
            Backend::Cloud { path, options } => StorageLocation::Cloud {
                path,
                options: options.clone(),
            },
        }
    }

    fn tick_partition_file(instrument: Instrument, variant: Variant, year: i32, month: u32) -> String {
        format!(
            "{}/{}/{year}/{month:02}.parquet",
            instrument.as_str().to_lowercase(),
            variant.table_name()
        )
    }

    fn ohlc_partition_file(instrument: Instrument, year: i32) -> String {
        format!("{}/ohlc_1m/{year}.parquet", instrument.as_str().to_lowercase())
    }

    fn partition_dir_candidates(&self, instrument: Instrument, variant: Variant) -> Option<PathBuf> {
        match &self.backend {
            Backend::Local(base) => Some(
                base.join(instrument.as_str().to_lowercase())
                    .join(variant.table_name()),
            ),
            Backend::Cloud { .. } => None,
        }
    }

    async fn read_partition(&self, file_name: &str) -> PipelineResult<Option<DataFrame>> {
        if let Backend::Local(base) = &self.backend {
            if !base.join(file_name).exists() {
                return Ok(None);
            }
        }
        match self.location().reader_with_size(file_name, 1 << 20).await {
            Ok((reader, _)) => {
                let df = ParquetReader::new(reader)
                    .finish()
                    .map_err(StoreError::Polars)?;
                Ok(Some(df))
            }
            Err(PipelineError::Store(StoreError::Io(e)))
                if e.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn write_partition(&self, file_name: &str, df: &mut DataFrame) -> PipelineResult<()> {
        let mut writer = self.location().writer(file_name, 1 << 20).await?;
        ParquetWriter::new(&mut writer)
            .finish(df)
            .map_err(StoreError::Polars)?;
        Ok(())
    }

    /// Merges `new_rows` into whatever is already on disk for this
    /// partition, deduplicating on `key_col` with last-write-wins, and
    /// persists the result. Returns the number of newly-present keys.
    async fn merge_partition(
        &self,
        file_name: &str,
        new_rows: DataFrame,
        key_col: &str,
    ) -> PipelineResult<u64> {
        let existing = self.read_partition(file_name).await?;
        let existing_count = existing.as_ref().map(|df| df.height() as u64).unwrap_or(0);

        let combined = match existing {
            Some(existing_df) => concat(
                [existing_df.lazy(), new_rows.lazy()],
                UnionArgs {
                    parallel: true,
                    rechunk: true,
                    ..Default::default()
                },
            )
            .map_err(StoreError::Polars)?,
            None => new_rows.lazy(),
        };

        let mut deduped = combined
            .sort(
                [key_col],
                SortMultipleOptions::default().with_maintain_order(true),
            )
            .unique(Some(vec![key_col.to_string()]), UniqueKeepStrategy::Last)
            .collect()
            .map_err(StoreError::Polars)?;

        let final_count = deduped.height() as u64;
        self.write_partition(file_name, &mut deduped).await?;
        Ok(final_count.saturating_sub(existing_count))
    }

    /// Creates the instrument's partition directories up front so the
    /// first `write_partition` call for a deep path (e.g.
    /// `eurusd/raw_spread_ticks/2024/08.parquet`) never hits a missing
    /// intermediate directory. A no-op for the cloud backend, which keys
    /// objects directly and has no directories to pre-create.
    pub async fn ensure_schema(&self, instrument: Instrument) -> PipelineResult<()> {
        if let Backend::Local(base) = &self.backend {
            let root = base.join(instrument.as_str().to_lowercase());
            for variant in Variant::ALL {
                std::fs::create_dir_all(root.join(variant.table_name())).map_err(StoreError::Io)?;
            }
            std::fs::create_dir_all(root.join("ohlc_1m")).map_err(StoreError::Io)?;
        }
        Ok(())
    }

    /// Appends a tick batch, partitioned by month. Idempotent on
    /// `(instrument, timestamp)`: re-appending the same batch returns 0.
    #[instrument(skip(self, batch), fields(%instrument, ?variant, n = batch.len()))]
    pub async fn append(
        &self,
        instrument: Instrument,
        variant: Variant,
        batch: Vec<Tick>,
    ) -> PipelineResult<u64> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut by_month: BTreeMap<(i32, u32), Vec<&Tick>> = BTreeMap::new();
        for tick in &batch {
            by_month
                .entry((tick.timestamp.year(), tick.timestamp.month()))
                .or_default()
                .push(tick);
        }

        let mut total_inserted = 0u64;
        for ((year, month), ticks) in by_month {
            let file_name = Self::tick_partition_file(instrument, variant, year, month);
            let new_df = ticks_to_dataframe(&ticks)?;
            total_inserted += self.merge_partition(&file_name, new_df, "timestamp").await?;
        }
        Ok(total_inserted)
    }

    pub async fn count(&self, instrument: Instrument, variant: Variant) -> PipelineResult<u64> {
        let mut total = 0u64;
        for (year, month) in self.distinct_months(instrument, variant).await? {
            let file_name = Self::tick_partition_file(instrument, variant, year, month);
            if let Some(df) = self.read_partition(&file_name).await? {
                total += df.height() as u64;
            }
        }
        Ok(total)
    }

    pub async fn range(
        &self,
        instrument: Instrument,
        variant: Variant,
    ) -> PipelineResult<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        let months = self.distinct_months(instrument, variant).await?;
        let mut min_ts: Option<DateTime<Utc>> = None;
        let mut max_ts: Option<DateTime<Utc>> = None;

        for (year, month) in months {
            let file_name = Self::tick_partition_file(instrument, variant, year, month);
            let Some(df) = self.read_partition(&file_name).await? else {
                continue;
            };
            let ts_col = df.column("timestamp").map_err(StoreError::Polars)?;
            let ts = ts_col.datetime().map_err(StoreError::Polars)?;
            if let Some(lo) = ts.min() {
                let lo = micros_to_utc(lo);
                min_ts = Some(min_ts.map_or(lo, |cur| cur.min(lo)));
            }
            if let Some(hi) = ts.max() {
                let hi = micros_to_utc(hi);
                max_ts = Some(max_ts.map_or(hi, |cur| cur.max(hi)));
            }
        }

        Ok(min_ts.zip(max_ts))
    }

    /// Returns every `(instrument, variant)` partition with data present on
    /// disk. For the cloud backend, this is a best-effort listing and may
    /// require the caller to already know the month range (e.g. the Gap
    /// Detector always supplies a bounded candidate set).
    pub async fn distinct_months(
        &self,
        instrument: Instrument,
        variant: Variant,
    ) -> PipelineResult<Vec<(i32, u32)>> {
        let Some(dir) = self.partition_dir_candidates(instrument, variant) else {
            return Ok(Vec::new());
        };
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut months = Vec::new();
        for year_entry in std::fs::read_dir(&dir).map_err(StoreError::Io)? {
            let year_entry = year_entry.map_err(StoreError::Io)?;
            let Ok(year) = year_entry.file_name().to_string_lossy().parse::<i32>() else {
                continue;
            };
            for month_entry in std::fs::read_dir(year_entry.path()).map_err(StoreError::Io)? {
                let month_entry = month_entry.map_err(StoreError::Io)?;
                let name = month_entry.file_name().to_string_lossy().to_string();
                let Some(stem) = name.strip_suffix(".parquet") else {
                    continue;
                };
                if let Ok(month) = stem.parse::<u32>() {
                    months.push((year, month));
                }
            }
        }
        months.sort_unstable();
        Ok(months)
    }

    pub async fn scan(
        &self,
        instrument: Instrument,
        variant: Variant,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> PipelineResult<DataFrame> {
        let months = self.distinct_months(instrument, variant).await?;
        let mut frames = Vec::new();
        for (year, month) in months {
            if let Some(start) = start {
                if year < start.year() || (year == start.year() && month < start.month()) {
                    continue;
                }
            }
            if let Some(end) = end {
                if year > end.year() || (year == end.year() && month > end.month()) {
                    continue;
                }
            }
            let file_name = Self::tick_partition_file(instrument, variant, year, month);
            if let Some(df) = self.read_partition(&file_name).await? {
                frames.push(df.lazy());
            }
        }

        if frames.is_empty() {
            return empty_tick_frame();
        }

        let mut lf = concat(
            &frames,
            UnionArgs {
                parallel: true,
                rechunk: true,
                ..Default::default()
            },
        )
        .map_err(StoreError::Polars)?;

        if let Some(start) = start {
            lf = lf.filter(col("timestamp").gt_eq(lit(start.timestamp_micros())));
        }
        if let Some(end) = end {
            lf = lf.filter(col("timestamp").lt(lit(end.timestamp_micros())));
        }

        lf.sort(
            ["timestamp"],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()
        .map_err(|e| StoreError::Polars(e).into())
    }

    /// Deletes OHLC rows in `[start, end)`, one partition file per year.
    pub async fn delete_ohlc_range(
        &self,
        instrument: Instrument,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PipelineResult<()> {
        for year in start.year()..=end.year() {
            let file_name = Self::ohlc_partition_file(instrument, year);
            let Some(df) = self.read_partition(&file_name).await? else {
                continue;
            };
            let mut kept = df
                .lazy()
                .filter(
                    col("minute_start_utc")
                        .lt(lit(start.timestamp_micros()))
                        .or(col("minute_start_utc").gt_eq(lit(end.timestamp_micros()))),
                )
                .collect()
                .map_err(StoreError::Polars)?;
            self.write_partition(&file_name, &mut kept).await?;
        }
        Ok(())
    }

    /// Deletes every OHLC partition for `instrument` (full-rebuild mode).
    pub async fn delete_all_ohlc(&self, instrument: Instrument) -> PipelineResult<()> {
        if let Backend::Local(base) = &self.backend {
            let dir = base.join(instrument.as_str().to_lowercase()).join("ohlc_1m");
            if dir.exists() {
                std::fs::remove_dir_all(&dir).map_err(StoreError::Io)?;
            }
        }
        Ok(())
    }

    /// Reads derived OHLC bars in `[start, end)`, one partition per year.
    pub async fn read_ohlc_range(
        &self,
        instrument: Instrument,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> PipelineResult<DataFrame> {
        let (from_year, to_year) = match (start, end) {
            (Some(s), Some(e)) => (s.year(), e.year()),
            _ => {
                let Some(dir) = self.ohlc_dir(instrument) else {
                    return empty_ohlc_frame();
                };
                if !dir.exists() {
                    return empty_ohlc_frame();
                }
                let mut years: Vec<i32> = std::fs::read_dir(&dir)
                    .map_err(StoreError::Io)?
                    .filter_map(|e| e.ok())
                    .filter_map(|e| e.file_name().to_string_lossy().strip_suffix(".parquet").and_then(|s| s.parse().ok()))
                    .collect();
                years.sort_unstable();
                match (years.first(), years.last()) {
                    (Some(&lo), Some(&hi)) => (lo, hi),
                    _ => return empty_ohlc_frame(),
                }
            }
        };

        let mut frames = Vec::new();
        for year in from_year..=to_year {
            let file_name = Self::ohlc_partition_file(instrument, year);
            if let Some(df) = self.read_partition(&file_name).await? {
                frames.push(df.lazy());
            }
        }
        if frames.is_empty() {
            return empty_ohlc_frame();
        }

        let mut lf = concat(
            &frames,
            UnionArgs {
                parallel: true,
                rechunk: true,
                ..Default::default()
            },
        )
        .map_err(StoreError::Polars)?;

        if let Some(start) = start {
            lf = lf.filter(col("minute_start_utc").gt_eq(lit(start.timestamp_micros())));
        }
        if let Some(end) = end {
            lf = lf.filter(col("minute_start_utc").lt(lit(end.timestamp_micros())));
        }

        lf.sort(
            ["minute_start_utc"],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()
        .map_err(|e| StoreError::Polars(e).into())
    }

    fn ohlc_dir(&self, instrument: Instrument) -> Option<PathBuf> {
        match &self.backend {
            Backend::Local(base) => Some(base.join(instrument.as_str().to_lowercase()).join("ohlc_1m")),
            Backend::Cloud { .. } => None,
        }
    }

    /// Best-effort on-disk footprint of an instrument's partitions; `None`
    /// for the cloud backend, which has no cheap local `statfs` to use.
    pub async fn storage_size_bytes(&self, instrument: Instrument) -> PipelineResult<Option<u64>> {
        let Backend::Local(base) = &self.backend else {
            return Ok(None);
        };
        let dir = base.join(instrument.as_str().to_lowercase());
        if !dir.exists() {
            return Ok(Some(0));
        }
        Ok(Some(directory_size(&dir).map_err(StoreError::Io)?))
    }

    pub async fn upsert_ohlc(&self, instrument: Instrument, bars: Vec<OhlcBar>) -> PipelineResult<u64> {
        if bars.is_empty() {
            return Ok(0);
        }
        let mut by_year: BTreeMap<i32, Vec<&OhlcBar>> = BTreeMap::new();
        for bar in &bars {
            by_year.entry(bar.minute_start_utc.year()).or_default().push(bar);
        }

        let mut total = 0u64;
        for (year, year_bars) in by_year {
            let file_name = Self::ohlc_partition_file(instrument, year);
            let df = bars_to_dataframe(&year_bars)?;
            total += self.merge_partition(&file_name, df, "minute_start_utc").await?;
        }
        Ok(total)
    }
}

fn micros_to_utc(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_default()
}

fn directory_size(dir: &std::path::Path) -> std::io::Result<u64> {
    let mut total = 0u64;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            total += directory_size(&entry.path())?;
        } else {
            total += metadata.len();
        }
    }
    Ok(total)
}

fn empty_ohlc_frame() -> PipelineResult<DataFrame> {
    let mut df = df![
        "instrument" => Vec::<&str>::new(),
        "minute_start_utc" => Vec::<i64>::new(),
        "open" => Vec::<f64>::new(),
        "high" => Vec::<f64>::new(),
        "low" => Vec::<f64>::new(),
        "close" => Vec::<f64>::new(),
        "raw_spread_avg" => Vec::<Option<f64>>::new(),
        "standard_spread_avg" => Vec::<Option<f64>>::new(),
        "tick_count_raw_spread" => Vec::<u32>::new(),
        "tick_count_standard" => Vec::<Option<u32>>::new(),
        "range_per_spread" => Vec::<Option<f64>>::new(),
        "range_per_tick" => Vec::<Option<f64>>::new(),
        "body_per_spread" => Vec::<Option<f64>>::new(),
        "body_per_tick" => Vec::<Option<f64>>::new(),
        "ny_hour" => Vec::<u32>::new(),
        "london_hour" => Vec::<u32>::new(),
        "ny_session" => Vec::<&str>::new(),
        "london_session" => Vec::<&str>::new(),
        "is_us_holiday" => Vec::<bool>::new(),
        "is_uk_holiday" => Vec::<bool>::new(),
        "is_major_holiday" => Vec::<bool>::new(),
    ]
    .map_err(StoreError::Polars)?;

    for key in crate::registry::keys() {
        df.with_column(Series::new(format!("is_{key}_session").into(), Vec::<bool>::new()))
            .map_err(StoreError::Polars)?;
    }

    debug_assert_eq!(df.width(), schema::ohlc_all_column_names().len());

    df.lazy()
        .with_column(col("minute_start_utc").cast(DataType::Datetime(
            TimeUnit::Microseconds,
            Some(TimeZone::UTC),
        )))
        .collect()
        .map_err(|e| StoreError::Polars(e).into())
}

fn ticks_to_dataframe(ticks: &[&Tick]) -> PipelineResult<DataFrame> {
    let instrument: Vec<&str> = ticks.iter().map(|t| t.instrument.as_str()).collect();
    let timestamp: Vec<i64> = ticks.iter().map(|t| t.timestamp.timestamp_micros()).collect();
    let bid: Vec<f64> = ticks.iter().map(|t| t.bid).collect();
    let ask: Vec<f64> = ticks.iter().map(|t| t.ask).collect();

    let df = df![
        "instrument" => instrument,
        "timestamp" => timestamp,
        "bid" => bid,
        "ask" => ask,
    ]
    .map_err(StoreError::Polars)?;
    debug_assert_eq!(df.width(), schema::TICK_COLUMNS.len());

    df.lazy()
        .with_column(
            col("timestamp")
                .cast(DataType::Datetime(TimeUnit::Microseconds, Some(TimeZone::UTC))),
        )
        .collect()
        .map_err(|e| StoreError::Polars(e).into())
}

fn empty_tick_frame() -> PipelineResult<DataFrame> {
    df![
        "instrument" => Vec::<&str>::new(),
        "timestamp" => Vec::<i64>::new(),
        "bid" => Vec::<f64>::new(),
        "ask" => Vec::<f64>::new(),
    ]
    .map_err(|e| StoreError::Polars(e).into())
}

fn bars_to_dataframe(bars: &[&OhlcBar]) -> PipelineResult<DataFrame> {
    let instrument: Vec<&str> = bars.iter().map(|b| b.instrument.as_str()).collect();
    let minute_start_utc: Vec<i64> = bars
        .iter()
        .map(|b| b.minute_start_utc.timestamp_micros())
        .collect();
    let open: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let high: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let low: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let close: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let raw_spread_avg: Vec<Option<f64>> = bars.iter().map(|b| b.raw_spread_avg).collect();
    let standard_spread_avg: Vec<Option<f64>> = bars.iter().map(|b| b.standard_spread_avg).collect();
    let tick_count_raw_spread: Vec<u32> = bars.iter().map(|b| b.tick_count_raw_spread).collect();
    let tick_count_standard: Vec<Option<u32>> = bars.iter().map(|b| b.tick_count_standard).collect();
    let range_per_spread: Vec<Option<f64>> = bars.iter().map(|b| b.range_per_spread).collect();
    let range_per_tick: Vec<Option<f64>> = bars.iter().map(|b| b.range_per_tick).collect();
    let body_per_spread: Vec<Option<f64>> = bars.iter().map(|b| b.body_per_spread).collect();
    let body_per_tick: Vec<Option<f64>> = bars.iter().map(|b| b.body_per_tick).collect();
    let ny_hour: Vec<u32> = bars.iter().map(|b| b.ny_hour).collect();
    let london_hour: Vec<u32> = bars.iter().map(|b| b.london_hour).collect();
    let ny_session: Vec<String> = bars.iter().map(|b| b.ny_session.to_string()).collect();
    let london_session: Vec<String> = bars.iter().map(|b| b.london_session.to_string()).collect();
    let is_us_holiday: Vec<bool> = bars.iter().map(|b| b.is_us_holiday).collect();
    let is_uk_holiday: Vec<bool> = bars.iter().map(|b| b.is_uk_holiday).collect();
    let is_major_holiday: Vec<bool> = bars.iter().map(|b| b.is_major_holiday).collect();

    let mut df = df![
        "instrument" => instrument,
        "minute_start_utc" => minute_start_utc,
        "open" => open,
        "high" => high,
        "low" => low,
        "close" => close,
        "raw_spread_avg" => raw_spread_avg,
        "standard_spread_avg" => standard_spread_avg,
        "tick_count_raw_spread" => tick_count_raw_spread,
        "tick_count_standard" => tick_count_standard,
        "range_per_spread" => range_per_spread,
        "range_per_tick" => range_per_tick,
        "body_per_spread" => body_per_spread,
        "body_per_tick" => body_per_tick,
        "ny_hour" => ny_hour,
        "london_hour" => london_hour,
        "ny_session" => ny_session,
        "london_session" => london_session,
        "is_us_holiday" => is_us_holiday,
        "is_uk_holiday" => is_uk_holiday,
        "is_major_holiday" => is_major_holiday,
    ]
    .map_err(StoreError::Polars)?;

    for (i, key) in crate::registry::keys().enumerate() {
        let col_name = format!("is_{key}_session");
        let values: Vec<bool> = bars
            .iter()
            .map(|b| b.exchange_sessions[i].1)
            .collect();
        df.with_column(Series::new(col_name.into(), values))
            .map_err(StoreError::Polars)?;
    }

    df.lazy()
        .with_column(col("minute_start_utc").cast(DataType::Datetime(
            TimeUnit::Microseconds,
            Some(TimeZone::UTC),
        )))
        .collect()
        .map_err(|e| StoreError::Polars(e).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tick(ts: DateTime<Utc>, bid: f64, ask: f64) -> Tick {
        Tick {
            instrument: Instrument::EURUSD,
            timestamp: ts,
            bid,
            ask,
        }
    }

    #[tokio::test]
    async fn append_then_count_reflects_rows_inserted() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::local(dir.path());

        let t0 = Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();
        let batch = vec![tick(t0, 1.1, 1.1002)];
        let inserted = store
            .append(Instrument::EURUSD, Variant::Standard, batch)
            .await
            .unwrap();
        assert_eq!(inserted, 1);

        let count = store.count(Instrument::EURUSD, Variant::Standard).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn duplicate_append_does_not_increase_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::local(dir.path());

        let t0 = Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();
        let batch = vec![tick(t0, 1.1, 1.1002)];
        store
            .append(Instrument::EURUSD, Variant::Standard, batch.clone())
            .await
            .unwrap();
        let second_inserted = store
            .append(Instrument::EURUSD, Variant::Standard, batch)
            .await
            .unwrap();
        assert_eq!(second_inserted, 0);

        let count = store.count(Instrument::EURUSD, Variant::Standard).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn distinct_months_reflects_partitions_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::local(dir.path());

        let aug = Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();
        let oct = Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap();
        store
            .append(
                Instrument::EURUSD,
                Variant::RawSpread,
                vec![tick(aug, 1.1, 1.1001), tick(oct, 1.2, 1.2001)],
            )
            .await
            .unwrap();

        let months = store
            .distinct_months(Instrument::EURUSD, Variant::RawSpread)
            .await
            .unwrap();
        assert_eq!(months, vec![(2024, 8), (2024, 10)]);
    }
}
