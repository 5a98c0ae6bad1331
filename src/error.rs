use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Crate-wide error taxonomy (§7). Each component boundary returns one of
/// these; `NotFound` is the only variant an orchestrator is allowed to
/// swallow as a logged month skip. Everything else is fatal for the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Instrument(#[from] InstrumentError),

    #[error(transparent)]
    Timeframe(#[from] TimeframeError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Errors raised when a symbol is not in the closed instrument catalogue,
/// or an exchange key is not in the registry.
#[derive(Debug, Error)]
pub enum InstrumentError {
    #[error("'{0}' is not a recognized instrument")]
    InvalidInstrument(String),

    #[error("'{0}' is not a recognized exchange; available: {}", .1.join(", "))]
    UnknownExchange(String, Vec<String>),
}

#[derive(Debug, Error)]
pub enum TimeframeError {
    #[error("'{0}' is not a supported OHLC timeframe")]
    InvalidTimeframe(String),
}

/// Errors from fetching a monthly archive over HTTP.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Upstream archive absent for this (instrument, variant, month).
    /// Non-fatal: the orchestrator logs it at WARNING and skips the month.
    #[error("archive not found: {instrument} {variant} {year}-{month:02}")]
    NotFound {
        instrument: String,
        variant: String,
        year: i32,
        month: u32,
    },

    #[error("transport failure fetching {instrument} {variant} {year}-{month:02}: {source}")]
    Request {
        instrument: String,
        variant: String,
        year: i32,
        month: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error(
        "archive fetch for {instrument} {variant} {year}-{month:02} timed out after {timeout_secs}s"
    )]
    Timeout {
        instrument: String,
        variant: String,
        year: i32,
        month: u32,
        timeout_secs: u64,
    },
}

/// Errors from extracting and parsing a monthly tick archive.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("archive for {0} does not contain the expected CSV member '{1}'")]
    MissingCsvMember(String, String),

    #[error("archive is not a valid ZIP file: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("required column '{0}' is missing from the tick CSV")]
    MissingColumn(String),

    #[error("unparseable timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("non-numeric price '{0}' in column '{1}'")]
    InvalidPrice(String, String),

    #[error("price is NaN in column '{0}'")]
    NaNPrice(String),

    #[error("negative price {0} in column '{1}'")]
    NegativePrice(f64, String),

    #[error("I/O error reading archive: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the tick/OHLC store backends (embedded Parquet or remote ClickHouse).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("on-disk schema version {found} is older than the {expected} this build expects")]
    SchemaMismatch { expected: u32, found: u32 },

    #[error("object store operation failed: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("ClickHouse operation failed: {0}")]
    ClickHouse(#[from] clickhouse::error::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend invariant violated: {0}")]
    Invariant(String),
}

/// Errors from exchange-calendar initialization or per-minute queries.
/// Never defaulted: a calendar that can't answer a query is a fatal error.
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("failed to initialize calendar for exchange '{0}': {1}")]
    InitFailed(String, String),

    #[error(
        "calendar for exchange '{exchange}' could not evaluate timestamp {timestamp}: {reason}"
    )]
    QueryFailed {
        exchange: String,
        timestamp: String,
        reason: String,
    },
}

/// Errors surfaced when a computed result violates a documented invariant
/// (used by test tooling and defensive checks at component boundaries).
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}
