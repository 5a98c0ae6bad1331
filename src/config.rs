//! Configuration (§6): a set of named options with no hidden defaults.
//! Resolution order is explicit struct construction, then environment
//! variables (`EXNESS_*`), then an optional TOML config file
//! (`~/.exness-pipeline.toml`), then the documented defaults below.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, StoreError};

pub const DEFAULT_ARCHIVE_BASE_URL: &str = "https://ticks.exness-mirror.example.com";
pub const DEFAULT_START_DATE: &str = "2014-01-01";
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 120;
pub const DEFAULT_DOWNLOAD_PARALLELISM: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    #[default]
    Embedded,
    Remote,
}

/// Remote backend connection options, only consulted when
/// `backend_mode = remote`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RemoteConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub tls_mode: Option<String>,
}

/// The fully-resolved configuration consumed by the rest of the crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Base directory for embedded-backend storage and download scratch.
    pub base_dir: PathBuf,
    pub archive_base_url: String,
    /// Earliest month fetched for a fresh instrument (`YYYY-MM-DD`).
    pub default_start_date: String,
    pub http_timeout_seconds: u64,
    pub download_parallelism: usize,
    pub backend_mode: BackendMode,
    pub remote: RemoteConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            archive_base_url: DEFAULT_ARCHIVE_BASE_URL.to_string(),
            default_start_date: DEFAULT_START_DATE.to_string(),
            http_timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECONDS,
            download_parallelism: DEFAULT_DOWNLOAD_PARALLELISM,
            backend_mode: BackendMode::default(),
            remote: RemoteConfig::default(),
        }
    }
}

fn default_base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("eon")
        .join("exness-data")
}

/// On-disk representation of `~/.exness-pipeline.toml`. Every field is
/// optional; absent fields fall through to the next resolution step.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    base_dir: Option<PathBuf>,
    archive_base_url: Option<String>,
    default_start_date: Option<String>,
    http_timeout_seconds: Option<u64>,
    download_parallelism: Option<usize>,
    backend_mode: Option<BackendMode>,
    host: Option<String>,
    port: Option<u16>,
    database: Option<String>,
    user: Option<String>,
    password: Option<String>,
    tls_mode: Option<String>,
}

fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".exness-pipeline.toml")
}

fn load_config_file(path: &std::path::Path) -> Result<Option<ConfigFile>, PipelineError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(StoreError::Io)?;
    let parsed: ConfigFile = toml::from_str(&contents)
        .map_err(|e| StoreError::Invariant(format!("invalid config file {path:?}: {e}")))?;
    Ok(Some(parsed))
}

impl PipelineConfig {
    /// Resolves configuration starting from `explicit` (already-set fields
    /// win outright), then environment variables, then the config file at
    /// `~/.exness-pipeline.toml`, then documented defaults.
    ///
    /// `explicit` is typically `PipelineConfig::default()` when the caller
    /// has no overrides of their own to seed.
    pub fn resolve(explicit: PipelineConfigOverrides) -> Result<Self, PipelineError> {
        Self::resolve_with_file(explicit, &default_config_path())
    }

    pub(crate) fn resolve_with_file(
        explicit: PipelineConfigOverrides,
        config_path: &std::path::Path,
    ) -> Result<Self, PipelineError> {
        let file = load_config_file(config_path)?.unwrap_or_default();
        let defaults = PipelineConfig::default();

        let base_dir = explicit
            .base_dir
            .or_else(|| env_path("EXNESS_BASE_DIR"))
            .or(file.base_dir)
            .unwrap_or(defaults.base_dir);

        let archive_base_url = explicit
            .archive_base_url
            .or_else(|| std::env::var("EXNESS_ARCHIVE_BASE_URL").ok())
            .or(file.archive_base_url)
            .unwrap_or(defaults.archive_base_url);

        let default_start_date = explicit
            .default_start_date
            .or_else(|| std::env::var("EXNESS_DEFAULT_START_DATE").ok())
            .or(file.default_start_date)
            .unwrap_or(defaults.default_start_date);

        let http_timeout_seconds = explicit
            .http_timeout_seconds
            .or_else(|| env_parsed("EXNESS_HTTP_TIMEOUT_SECONDS"))
            .or(file.http_timeout_seconds)
            .unwrap_or(defaults.http_timeout_seconds);

        let download_parallelism = explicit
            .download_parallelism
            .or_else(|| env_parsed("EXNESS_DOWNLOAD_PARALLELISM"))
            .or(file.download_parallelism)
            .unwrap_or(defaults.download_parallelism);

        let backend_mode = explicit
            .backend_mode
            .or_else(|| env_parsed_backend_mode("EXNESS_BACKEND_MODE"))
            .or(file.backend_mode)
            .unwrap_or(defaults.backend_mode);

        let remote = RemoteConfig {
            host: explicit
                .remote_host
                .or_else(|| std::env::var("EXNESS_HOST").ok())
                .or(file.host),
            port: explicit
                .remote_port
                .or_else(|| env_parsed("EXNESS_PORT"))
                .or(file.port),
            database: explicit
                .remote_database
                .or_else(|| std::env::var("EXNESS_DATABASE").ok())
                .or(file.database),
            user: explicit
                .remote_user
                .or_else(|| std::env::var("EXNESS_USER").ok())
                .or(file.user),
            password: explicit
                .remote_password
                .or_else(|| std::env::var("EXNESS_PASSWORD").ok())
                .or(file.password),
            tls_mode: explicit
                .remote_tls_mode
                .or_else(|| std::env::var("EXNESS_TLS_MODE").ok())
                .or(file.tls_mode),
        };

        Ok(PipelineConfig {
            base_dir,
            archive_base_url,
            default_start_date,
            http_timeout_seconds,
            download_parallelism,
            backend_mode,
            remote,
        })
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key).ok().map(PathBuf::from)
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_parsed_backend_mode(key: &str) -> Option<BackendMode> {
    std::env::var(key).ok().and_then(|v| match v.to_lowercase().as_str() {
        "embedded" => Some(BackendMode::Embedded),
        "remote" => Some(BackendMode::Remote),
        _ => None,
    })
}

/// Explicit, caller-supplied overrides — the first and highest-priority
/// resolution step. Every field is optional; `None` defers to the next step.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigOverrides {
    pub base_dir: Option<PathBuf>,
    pub archive_base_url: Option<String>,
    pub default_start_date: Option<String>,
    pub http_timeout_seconds: Option<u64>,
    pub download_parallelism: Option<usize>,
    pub backend_mode: Option<BackendMode>,
    pub remote_host: Option<String>,
    pub remote_port: Option<u16>,
    pub remote_database: Option<String>,
    pub remote_user: Option<String>,
    pub remote_password: Option<String>,
    pub remote_tls_mode: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_falls_back_to_documented_defaults() {
        let cfg = PipelineConfig::resolve_with_file(
            PipelineConfigOverrides::default(),
            std::path::Path::new("/nonexistent/path/.exness-pipeline.toml"),
        )
        .unwrap();
        assert_eq!(cfg.archive_base_url, DEFAULT_ARCHIVE_BASE_URL);
        assert_eq!(cfg.http_timeout_seconds, DEFAULT_HTTP_TIMEOUT_SECONDS);
        assert_eq!(cfg.backend_mode, BackendMode::Embedded);
    }

    #[test]
    fn explicit_overrides_win_over_everything() {
        let overrides = PipelineConfigOverrides {
            archive_base_url: Some("https://custom.example.com".to_string()),
            ..Default::default()
        };
        let cfg = PipelineConfig::resolve_with_file(
            overrides,
            std::path::Path::new("/nonexistent/path/.exness-pipeline.toml"),
        )
        .unwrap();
        assert_eq!(cfg.archive_base_url, "https://custom.example.com");
    }

    #[test]
    fn config_file_overrides_defaults_but_not_explicit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".exness-pipeline.toml");
        std::fs::write(
            &path,
            "archive_base_url = \"https://from-file.example.com\"\ndownload_parallelism = 2\n",
        )
        .unwrap();

        let cfg = PipelineConfig::resolve_with_file(PipelineConfigOverrides::default(), &path)
            .unwrap();
        assert_eq!(cfg.archive_base_url, "https://from-file.example.com");
        assert_eq!(cfg.download_parallelism, 2);

        let overrides = PipelineConfigOverrides {
            download_parallelism: Some(9),
            ..Default::default()
        };
        let cfg = PipelineConfig::resolve_with_file(overrides, &path).unwrap();
        assert_eq!(cfg.download_parallelism, 9);
    }
}
