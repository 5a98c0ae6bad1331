//! Remote Tick Store backend: a single logical ClickHouse database with
//! three tables (`raw_spread_ticks`, `standard_ticks`, `ohlc_1m`),
//! partitioned by `toYYYYMM(timestamp)` (§6). Grounded in the ClickHouse
//! migration this crate's Python predecessor shipped
//! (`clickhouse_client.py`, `clickhouse_manager.py`,
//! `clickhouse_gap_detector.py`).

use chrono::{DateTime, Utc};
use clickhouse::{Client, Row};
use serde::{Deserialize, Serialize};

use crate::domain::{Instrument, OhlcBar, Tick, Variant};
use crate::error::{PipelineResult, StoreError};
use crate::store::schema;

#[derive(Debug, Clone)]
pub struct ClickHouseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub tls_mode: String,
}

pub struct ClickHouseStore {
    client: Client,
    database: String,
}

#[derive(Row, Serialize, Deserialize)]
struct TickRow {
    instrument: String,
    #[serde(with = "clickhouse::serde::time::datetime64::micros")]
    timestamp: time::OffsetDateTime,
    bid: f64,
    ask: f64,
}

#[derive(Row, Deserialize)]
struct MonthRow {
    year: u16,
    month: u8,
}

#[derive(Row, Deserialize)]
struct RangeRow {
    #[serde(with = "clickhouse::serde::time::datetime64::micros")]
    min_ts: time::OffsetDateTime,
    #[serde(with = "clickhouse::serde::time::datetime64::micros")]
    max_ts: time::OffsetDateTime,
}

#[derive(Row, Deserialize)]
struct CountRow {
    n: u64,
}

impl ClickHouseStore {
    pub fn connect(config: &ClickHouseConfig) -> Self {
        let scheme = if config.tls_mode == "disable" { "http" } else { "https" };
        let url = format!("{scheme}://{}:{}", config.host, config.port);
        let client = Client::default()
            .with_url(url)
            .with_user(&config.user)
            .with_password(&config.password)
            .with_database(&config.database);
        Self {
            client,
            database: config.database.clone(),
        }
    }

    fn table_ident(&self, variant: Variant) -> String {
        format!("{}.{}", self.database, variant.table_name())
    }

    /// Idempotent `CREATE TABLE IF NOT EXISTS` for the three tables this
    /// backend owns, with column comments sourced from `schema.rs` so the
    /// catalogue documents itself the same way for every deployment.
    pub async fn ensure_schema(&self) -> PipelineResult<()> {
        self.client
            .query(&format!("CREATE DATABASE IF NOT EXISTS {}", self.database))
            .execute()
            .await
            .map_err(StoreError::ClickHouse)?;

        for variant in Variant::ALL {
            let ddl = format!(
                "CREATE TABLE IF NOT EXISTS {} (\n    {}\n) \
                 ENGINE = ReplacingMergeTree \
                 PARTITION BY (toYear(timestamp), toMonth(timestamp)) \
                 ORDER BY (instrument, timestamp)",
                self.table_ident(variant),
                ddl_columns(schema::TICK_COLUMNS.iter().map(|c| (c.name.to_string(), c.dtype, c.nullable, c.comment)))
            );
            self.client.query(&ddl).execute().await.map_err(StoreError::ClickHouse)?;
        }

        let ohlc_columns = schema::OHLC_FIXED_COLUMNS
            .iter()
            .map(|c| (c.name.to_string(), c.dtype, c.nullable, c.comment))
            .chain(schema::exchange_session_column_definitions());
        let ohlc_ddl = format!(
            "CREATE TABLE IF NOT EXISTS {}.ohlc_1m (\n    {}\n) \
             ENGINE = ReplacingMergeTree \
             PARTITION BY toYear(minute_start_utc) \
             ORDER BY (instrument, minute_start_utc)",
            self.database,
            ddl_columns(ohlc_columns)
        );
        self.client.query(&ohlc_ddl).execute().await.map_err(StoreError::ClickHouse)?;

        Ok(())
    }

    pub async fn append(
        &self,
        variant: Variant,
        batch: Vec<Tick>,
    ) -> PipelineResult<u64> {
        if batch.is_empty() {
            return Ok(0);
        }
        let table = self.table_ident(variant);
        let mut insert = self
            .client
            .insert(&table)
            .map_err(StoreError::ClickHouse)?;
        for tick in &batch {
            let row = TickRow {
                instrument: tick.instrument.as_str().to_string(),
                timestamp: to_offset_datetime(tick.timestamp),
                bid: tick.bid,
                ask: tick.ask,
            };
            insert.write(&row).await.map_err(StoreError::ClickHouse)?;
        }
        insert.end().await.map_err(StoreError::ClickHouse)?;

        // ReplacingMergeTree collapses duplicate (instrument, timestamp)
        // keys at merge time; until then queries must deduplicate with
        // FINAL, so `count`/`range`/`scan` below always query `FINAL`.
        Ok(batch.len() as u64)
    }

    pub async fn count(&self, instrument: Instrument, variant: Variant) -> PipelineResult<u64> {
        let table = self.table_ident(variant);
        let query = format!(
            "SELECT count(*) AS n FROM {table} FINAL WHERE instrument = ?"
        );
        let row: CountRow = self
            .client
            .query(&query)
            .bind(instrument.as_str())
            .fetch_one()
            .await
            .map_err(StoreError::ClickHouse)?;
        Ok(row.n)
    }

    pub async fn range(
        &self,
        instrument: Instrument,
        variant: Variant,
    ) -> PipelineResult<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        let table = self.table_ident(variant);
        let query = format!(
            "SELECT min(timestamp) AS min_ts, max(timestamp) AS max_ts FROM {table} FINAL WHERE instrument = ?"
        );
        let rows: Vec<RangeRow> = self
            .client
            .query(&query)
            .bind(instrument.as_str())
            .fetch_all()
            .await
            .map_err(StoreError::ClickHouse)?;
        Ok(rows.into_iter().next().map(|r| {
            (from_offset_datetime(r.min_ts), from_offset_datetime(r.max_ts))
        }))
    }

    pub async fn distinct_months(
        &self,
        instrument: Instrument,
        variant: Variant,
    ) -> PipelineResult<Vec<(i32, u32)>> {
        let table = self.table_ident(variant);
        let query = format!(
            "SELECT DISTINCT toYear(timestamp) AS year, toMonth(timestamp) AS month \
             FROM {table} FINAL WHERE instrument = ? ORDER BY year, month"
        );
        let rows: Vec<MonthRow> = self
            .client
            .query(&query)
            .bind(instrument.as_str())
            .fetch_all()
            .await
            .map_err(StoreError::ClickHouse)?;
        Ok(rows.into_iter().map(|r| (r.year as i32, r.month as u32)).collect())
    }

    pub async fn delete_ohlc_range(
        &self,
        instrument: Instrument,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PipelineResult<()> {
        let query = format!(
            "ALTER TABLE {}.ohlc_1m DELETE WHERE instrument = ? AND minute_start_utc >= ? AND minute_start_utc < ?",
            self.database
        );
        self.client
            .query(&query)
            .bind(instrument.as_str())
            .bind(to_offset_datetime(start))
            .bind(to_offset_datetime(end))
            .execute()
            .await
            .map_err(StoreError::ClickHouse)?;
        Ok(())
    }

    pub async fn delete_all_ohlc(&self, instrument: Instrument) -> PipelineResult<()> {
        let query = format!(
            "ALTER TABLE {}.ohlc_1m DELETE WHERE instrument = ?",
            self.database
        );
        self.client
            .query(&query)
            .bind(instrument.as_str())
            .execute()
            .await
            .map_err(StoreError::ClickHouse)?;
        Ok(())
    }

    pub async fn upsert_ohlc(&self, bars: Vec<OhlcBar>) -> PipelineResult<u64> {
        // ohlc_1m is a ReplacingMergeTree keyed by (instrument,
        // minute_start_utc); a plain INSERT satisfies upsert semantics,
        // replacement happening on the next merge (or FINAL on read).
        if bars.is_empty() {
            return Ok(0);
        }
        let table = format!("{}.ohlc_1m", self.database);
        let mut insert = self
            .client
            .insert(&table)
            .map_err(StoreError::ClickHouse)?;
        for bar in &bars {
            insert
                .write(&crate::ohlc::bar_to_clickhouse_row(bar))
                .await
                .map_err(StoreError::ClickHouse)?;
        }
        insert.end().await.map_err(StoreError::ClickHouse)?;
        Ok(bars.len() as u64)
    }
}

/// Maps a `schema.rs` dtype description onto a ClickHouse column type.
fn ch_type(dtype: &str, nullable: bool) -> String {
    let base = match dtype {
        "VARCHAR" => "String",
        "TIMESTAMP(us) WITH TIME ZONE" => "DateTime64(6, 'UTC')",
        "DOUBLE" => "Float64",
        "INTEGER" => "UInt32",
        "BOOLEAN" => "Bool",
        other => other,
    };
    if nullable {
        format!("Nullable({base})")
    } else {
        base.to_string()
    }
}

fn ddl_columns(columns: impl IntoIterator<Item = (String, &'static str, bool, &'static str)>) -> String {
    columns
        .into_iter()
        .map(|(name, dtype, nullable, comment)| {
            let escaped_comment = comment.replace('\'', "''");
            format!("{name} {} COMMENT '{escaped_comment}'", ch_type(dtype, nullable))
        })
        .collect::<Vec<_>>()
        .join(",\n    ")
}

fn to_offset_datetime(dt: DateTime<Utc>) -> time::OffsetDateTime {
    time::OffsetDateTime::from_unix_timestamp_nanos(dt.timestamp_nanos_opt().unwrap_or(0) as i128)
        .unwrap_or(time::OffsetDateTime::UNIX_EPOCH)
}

fn from_offset_datetime(dt: time::OffsetDateTime) -> DateTime<Utc> {
    DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond()).unwrap_or_default()
}
