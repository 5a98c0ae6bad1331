// === Public Modules (The Canonical Paths) ===
pub mod calendar;
pub mod config;
pub mod domain;
pub mod error;
pub mod gap_detector;
pub mod ohlc;
pub mod orchestrator;
pub mod query;
pub mod registry;
pub mod store;

// === Private Implementation Details ===
mod decoder;
mod downloader;
mod io;

// === Facades (Re-exporting internals) ===
pub use crate::config::{PipelineConfig, PipelineConfigOverrides};
pub use crate::domain::{Coverage, Instrument, OhlcBar, Tick, Timeframe, Variant};
pub use crate::io::StorageLocation;
pub use crate::orchestrator::{UpdateOrchestrator, UpdateReport};
pub use crate::query::QueryFacade;
pub use crate::store::TickStore;
