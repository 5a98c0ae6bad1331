//! Downloader (C3): fetches monthly tick archives over HTTP.
//!
//! URL template (§6, authoritative): `<base>/ticks/<symbol>/<YYYY>/<MM>/
//! Exness_<symbol>_<YYYY>_<MM>.zip`, where `symbol` is `<instrument>` for
//! the `standard` variant and `<instrument>_Raw_Spread` for `raw_spread`.

use std::time::Duration;

use tracing::instrument;

use crate::decoder::ArchiveHandle;
use crate::domain::{Instrument, Variant};
use crate::error::TransportError;

pub struct Downloader {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl Downloader {
    pub fn new(base_url: impl Into<String>, timeout_seconds: u64) -> Self {
        static USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

        Self {
            http: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .expect("reqwest client builds with a static config"),
            base_url: base_url.into(),
            timeout: Duration::from_secs(timeout_seconds),
        }
    }

    fn archive_url(&self, instrument: Instrument, variant: Variant, year: i32, month: u32) -> (String, String) {
        let symbol = format!("{}{}", instrument.as_str(), variant.archive_symbol_suffix());
        let archive_stem = format!("Exness_{symbol}_{year}_{month:02}");
        let url = format!(
            "{base}/ticks/{symbol}/{year}/{month:02}/{archive_stem}.zip",
            base = self.base_url,
        );
        (url, archive_stem)
    }

    /// Fetches one monthly archive. A 404 is reported as
    /// `TransportError::NotFound` (non-fatal, month skipped); any other
    /// failure or a timeout is fatal for the whole update run.
    #[instrument(skip(self), fields(%instrument, ?variant, year, month))]
    pub async fn fetch(
        &self,
        instrument: Instrument,
        variant: Variant,
        year: i32,
        month: u32,
    ) -> Result<ArchiveHandle, TransportError> {
        let (url, archive_stem) = self.archive_url(instrument, variant, year, month);
        let variant_name = format!("{variant}");

        let response = tokio::time::timeout(self.timeout, self.http.get(&url).send())
            .await
            .map_err(|_| TransportError::Timeout {
                instrument: instrument.to_string(),
                variant: variant_name.clone(),
                year,
                month,
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|source| TransportError::Request {
                instrument: instrument.to_string(),
                variant: variant_name.clone(),
                year,
                month,
                source,
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(TransportError::NotFound {
                instrument: instrument.to_string(),
                variant: variant_name,
                year,
                month,
            });
        }

        let response = response
            .error_for_status()
            .map_err(|source| TransportError::Request {
                instrument: instrument.to_string(),
                variant: variant_name.clone(),
                year,
                month,
                source,
            })?;

        let bytes = response
            .bytes()
            .await
            .map_err(|source| TransportError::Request {
                instrument: instrument.to_string(),
                variant: variant_name,
                year,
                month,
                source,
            })?;

        Ok(ArchiveHandle {
            instrument,
            archive_stem,
            bytes: bytes.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_url_standard_variant_has_no_suffix() {
        let downloader = Downloader::new("https://mirror.example.com", 120);
        let (url, stem) =
            downloader.archive_url(Instrument::EURUSD, Variant::Standard, 2024, 8);
        assert_eq!(
            url,
            "https://mirror.example.com/ticks/EURUSD/2024/08/Exness_EURUSD_2024_08.zip"
        );
        assert_eq!(stem, "Exness_EURUSD_2024_08");
    }

    #[test]
    fn archive_url_raw_spread_variant_has_suffix() {
        let downloader = Downloader::new("https://mirror.example.com", 120);
        let (url, _) = downloader.archive_url(Instrument::EURUSD, Variant::RawSpread, 2024, 8);
        assert_eq!(
            url,
            "https://mirror.example.com/ticks/EURUSD_Raw_Spread/2024/08/Exness_EURUSD_Raw_Spread_2024_08.zip"
        );
    }

    #[tokio::test]
    async fn fetch_reports_not_found_on_404() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let downloader = Downloader::new(server.uri(), 5);
        let err = downloader
            .fetch(Instrument::EURUSD, Variant::Standard, 2024, 8)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NotFound { .. }));
    }

    #[tokio::test]
    async fn fetch_returns_archive_bytes_on_success() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(b"zip-bytes".to_vec()))
            .mount(&server)
            .await;

        let downloader = Downloader::new(server.uri(), 5);
        let handle = downloader
            .fetch(Instrument::EURUSD, Variant::Standard, 2024, 8)
            .await
            .unwrap();
        assert_eq!(handle.bytes, b"zip-bytes".to_vec());
    }

    #[tokio::test]
    async fn fetch_reports_fatal_transport_error_on_server_failure() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let downloader = Downloader::new(server.uri(), 5);
        let err = downloader
            .fetch(Instrument::EURUSD, Variant::Standard, 2024, 8)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Request { .. }));
    }
}
