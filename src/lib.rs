//! fminames - In-Process Geographical Name Service
//!
//! fminames answers four families of queries over a curated corpus of
//! populated places and named stations, entirely from memory once loaded:
//!
//! - **Suggest**: prefix autocomplete with accent- and case-insensitive
//!   matching, language-aware translations and population-based ranking
//! - **Name search**: full or partial location names, including the
//!   `name,area` form, against the relational source
//! - **Nearest-point search**: the closest member of a keyword group to a
//!   coordinate, by great-circle distance
//! - **Keyword search**: predefined sets of places grouped under a label
//!
//! The corpus is loaded from a PostgreSQL GeoNames-style schema into a
//! single immutable *dataset generation* (location store, translation
//! tables, keyword groups, per-keyword spatial trees and prefix tries).
//! Generations are swapped atomically, so the engine can reload its entire
//! dataset under live query load without disturbing queries in flight.
//!
//! # Quick start
//!
//! ```no_run
//! use fminames::{EngineConfig, GeonamesEngine};
//!
//! # async fn run() -> Result<(), fminames::GeonamesError> {
//! let config = EngineConfig::from_file("fminames.toml")?;
//! let engine = GeonamesEngine::new(config).await?;
//!
//! // Suggest needs the autocomplete indices; wait for the initial load.
//! engine.wait_until_ready().await;
//!
//! for hit in engine.suggest("Ääne", "fi", "all", 0, 15)? {
//!     println!("{}, {} ({})", hit.name, hit.area, hit.country);
//! }
//!
//! if let Some(nearest) = engine.nearest(28.76, 61.17, -1.0, "fi", "all").await {
//!     println!("nearest: {}", nearest.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Elevation, land-cover and timezone lookups are injected as
//! [`gis::PointServices`]; absent services degrade to sentinel values and
//! never fail a query.

use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

mod cache;
mod config;
mod core;
pub mod data;
pub mod error;
pub mod gis;
pub mod index;
mod location;
mod ranker;

pub use crate::core::{
    GeonamesEngine, StatusTable, DEFAULT_MAX_DISTANCE_KM, DEFAULT_SUGGEST_RESULTS,
};
pub use cache::SearchCache;
pub use config::{
    AutoreloadConfig, CacheConfig, DatabaseConfig, EngineConfig, HostOverride, PrioritiesConfig,
    SecurityConfig, WhereClauses, PRIORITY_SCALE,
};
pub use data::{DataSet, Generation, DEFAULT_KEYWORD};
pub use error::{GeonamesError, Result};
pub use gis::{Dem, LandCover, PointServices, TimezoneMap};
pub use location::{CoverType, GeoId, Location, LocationPtr, LocationType, QueryOptions};
pub use ranker::LocationPriorities;

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize structured logging for the library.
///
/// Call once at process start; repeated calls are no-ops. `RUST_LOG` takes
/// precedence over the given level.
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<()> {
    let level = level.into();
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.to_string()))
            .map_err(|e| GeonamesError::Config(format!("bad log filter: {e}")))?
            .add_directive("sqlx=warn".parse().expect("static directive"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .map_err(|e| GeonamesError::Config(format!("logger init failed: {e}")))?;
        Ok::<(), GeonamesError>(())
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_initializes_once() {
        assert!(init_logging(tracing::Level::WARN).is_ok());
        assert!(init_logging(tracing::Level::DEBUG).is_ok());
    }
}
