//! Update Orchestrator (C9): the six-step procedure that turns "bring this
//! instrument up to date" into gap detection, bounded concurrent
//! fetch+decode, serial order-preserving store writes, and incremental
//! OHLC derivation (§4.8).
//!
//! Fetch and decode for several months run concurrently (bounded by
//! `download_parallelism`), but the store append for month `M+1` never
//! starts before month `M`'s append has completed — an interior gap must
//! never appear in durable storage even transiently.

use chrono::NaiveDate;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::config::PipelineConfig;
use crate::decoder::{self, ArchiveHandle};
use crate::domain::{Instrument, Tick, Variant};
use crate::downloader::Downloader;
use crate::error::{PipelineResult, StoreError, TransportError};
use crate::gap_detector;
use crate::ohlc::OhlcEngine;
use crate::store::TickStore;

#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    pub instrument: Instrument,
    pub months_added: Vec<(i32, u32)>,
    pub raw_spread_ticks_added: u64,
    pub standard_ticks_added: u64,
    pub months_skipped_raw_spread: Vec<(i32, u32)>,
    pub months_skipped_standard: Vec<(i32, u32)>,
    pub ohlc_bars_upserted: u64,
}

struct MonthTicks {
    year: i32,
    month: u32,
    raw_spread: Option<Vec<Tick>>,
    standard: Option<Vec<Tick>>,
}

pub struct UpdateOrchestrator<'a> {
    store: &'a TickStore,
    downloader: Downloader,
    config: &'a PipelineConfig,
}

impl<'a> UpdateOrchestrator<'a> {
    pub fn new(store: &'a TickStore, config: &'a PipelineConfig) -> Self {
        let downloader = Downloader::new(config.archive_base_url.clone(), config.http_timeout_seconds);
        Self {
            store,
            downloader,
            config,
        }
    }

    #[instrument(skip(self), fields(%instrument))]
    pub async fn update_instrument(&self, instrument: Instrument) -> PipelineResult<UpdateReport> {
        self.store.ensure_schema(instrument).await?;

        let earliest_date = NaiveDate::parse_from_str(&self.config.default_start_date, "%Y-%m-%d")
            .map_err(|e| StoreError::Invariant(format!(
                "default_start_date {:?} is not YYYY-MM-DD: {e}",
                self.config.default_start_date
            )))?;

        let present = self.store.distinct_months(instrument, Variant::RawSpread).await?;
        let missing = gap_detector::missing_months_through_now(earliest_date, &present)?;

        if missing.is_empty() {
            return Ok(UpdateReport {
                instrument,
                months_added: Vec::new(),
                raw_spread_ticks_added: 0,
                standard_ticks_added: 0,
                months_skipped_raw_spread: Vec::new(),
                months_skipped_standard: Vec::new(),
                ohlc_bars_upserted: 0,
            });
        }

        let parallelism = self.config.download_parallelism.max(1);
        let fetched: Vec<MonthTicks> = stream::iter(missing.iter().copied())
            .map(|(year, month)| self.fetch_decode_month(instrument, year, month))
            .buffered(parallelism)
            .try_collect()
            .await?;

        let mut months_added = Vec::new();
        let mut raw_spread_ticks_added = 0u64;
        let mut standard_ticks_added = 0u64;
        let mut months_skipped_raw_spread = Vec::new();
        let mut months_skipped_standard = Vec::new();

        for month_ticks in fetched {
            let MonthTicks { year, month, raw_spread, standard } = month_ticks;

            // Both variants land together or not at all for a month: a
            // month whose standard archive 404s has its already-fetched
            // raw_spread archive released rather than persisted on its own,
            // and a month whose raw_spread archive 404s never reaches the
            // store regardless of what the standard archive held. This
            // keeps `months_added` (durable raw_spread presence) exactly in
            // step with what's actually on disk, the way the Gap Detector's
            // `present` criterion (§4.5) expects.
            match (raw_spread, standard) {
                (Some(raw_ticks), Some(standard_ticks)) => {
                    raw_spread_ticks_added += self.store.append(instrument, Variant::RawSpread, raw_ticks).await?;
                    standard_ticks_added += self.store.append(instrument, Variant::Standard, standard_ticks).await?;
                    months_added.push((year, month));
                }
                (Some(_), None) => months_skipped_standard.push((year, month)),
                (None, Some(_)) => months_skipped_raw_spread.push((year, month)),
                (None, None) => {
                    months_skipped_raw_spread.push((year, month));
                    months_skipped_standard.push((year, month));
                }
            }
        }

        let engine = OhlcEngine::new(self.store);
        let ohlc_bars_upserted = if months_added.is_empty() {
            0
        } else {
            engine.incremental_append(instrument, &months_added).await?
        };

        Ok(UpdateReport {
            instrument,
            months_added,
            raw_spread_ticks_added,
            standard_ticks_added,
            months_skipped_raw_spread,
            months_skipped_standard,
            ohlc_bars_upserted,
        })
    }

    async fn fetch_decode_month(
        &self,
        instrument: Instrument,
        year: i32,
        month: u32,
    ) -> PipelineResult<MonthTicks> {
        let raw_spread = self.fetch_decode_variant(instrument, Variant::RawSpread, year, month).await?;
        let standard = self.fetch_decode_variant(instrument, Variant::Standard, year, month).await?;
        Ok(MonthTicks { year, month, raw_spread, standard })
    }

    /// `Ok(None)` means the archive does not exist for this
    /// (instrument, variant, month) — non-fatal, logged, and skipped.
    /// Any other transport failure is fatal for the whole update.
    async fn fetch_decode_variant(
        &self,
        instrument: Instrument,
        variant: Variant,
        year: i32,
        month: u32,
    ) -> PipelineResult<Option<Vec<Tick>>> {
        let handle = match self.downloader.fetch(instrument, variant, year, month).await {
            Ok(handle) => handle,
            Err(TransportError::NotFound { .. }) => {
                warn!(%instrument, ?variant, year, month, "archive not found, skipping");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let ticks = decode_archive(handle)?;
        Ok(Some(ticks))
    }
}

fn decode_archive(handle: ArchiveHandle) -> PipelineResult<Vec<Tick>> {
    decoder::decode(handle).map_err(|e| e.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_config(base_url: String, base_dir: PathBuf) -> PipelineConfig {
        PipelineConfig {
            base_dir,
            archive_base_url: base_url,
            default_start_date: "2024-08-01".to_string(),
            http_timeout_seconds: 5,
            download_parallelism: 2,
            backend_mode: crate::config::BackendMode::Embedded,
            remote: crate::config::RemoteConfig::default(),
        }
    }

    fn zip_archive(csv: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let cursor = std::io::Cursor::new(&mut buf);
            let mut writer = zip::ZipWriter::new(cursor);
            writer
                .start_file("ticks.csv", zip::write::SimpleFileOptions::default())
                .unwrap();
            std::io::Write::write_all(&mut writer, csv.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buf
    }

    #[tokio::test]
    async fn update_instrument_reports_every_month_skipped_when_archive_is_absent() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = TickStore::Embedded(crate::store::ParquetStore::local(dir.path()));
        let config = test_config(server.uri(), dir.path().to_path_buf());
        let orchestrator = UpdateOrchestrator::new(&store, &config);

        let report = orchestrator.update_instrument(Instrument::EURUSD).await.unwrap();
        assert!(report.months_added.is_empty());
        assert!(!report.months_skipped_raw_spread.is_empty());
        assert_eq!(report.months_skipped_raw_spread.len(), report.months_skipped_standard.len());
        assert_eq!(report.raw_spread_ticks_added, 0);
        assert_eq!(report.ohlc_bars_upserted, 0);
    }

    #[tokio::test]
    async fn fetch_decode_variant_treats_404_as_skip_not_fatal() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = TickStore::Embedded(crate::store::ParquetStore::local(dir.path()));
        let config = test_config(server.uri(), dir.path().to_path_buf());
        let orchestrator = UpdateOrchestrator::new(&store, &config);

        let result = orchestrator
            .fetch_decode_variant(Instrument::EURUSD, Variant::RawSpread, 2024, 8)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn fetch_decode_variant_decodes_a_found_archive() {
        let server = wiremock::MockServer::start().await;
        let csv = "Timestamp,Bid,Ask\n20240801 000000000,1.1000,1.1002\n";
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(zip_archive(csv)))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = TickStore::Embedded(crate::store::ParquetStore::local(dir.path()));
        let config = test_config(server.uri(), dir.path().to_path_buf());
        let orchestrator = UpdateOrchestrator::new(&store, &config);

        let result = orchestrator
            .fetch_decode_variant(Instrument::EURUSD, Variant::RawSpread, 2024, 8)
            .await
            .unwrap();
        assert_eq!(result.unwrap().len(), 1);
    }
}
