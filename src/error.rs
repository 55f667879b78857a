use thiserror::Error;

/// Errors produced by the geonames engine.
///
/// Only the query-input variants (`ForbiddenName`, `UnknownLocation`,
/// `UnknownGeoid`, `InvalidInput`) are expected to reach end users; the rest
/// either abort startup or mark a reload attempt as failed while the previous
/// dataset generation keeps serving.
#[derive(Error, Debug)]
pub enum GeonamesError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Strict mode upgrades an empty load phase from a warning to this error.
    #[error("Load phase '{0}' produced an empty result set")]
    EmptyPhase(&'static str),

    #[error("Forbidden name: {0}")]
    ForbiddenName(String),

    #[error("Unknown location: {0}")]
    UnknownLocation(String),

    #[error("Unknown location ID: {0}")]
    UnknownGeoid(i64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Autocomplete data has not been initialized yet")]
    SuggestNotReady,

    /// A load was interrupted by a shutdown request; the partial generation
    /// is discarded and no error is surfaced to callers.
    #[error("Load interrupted by shutdown request")]
    Interrupted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GeonamesError {
    /// True for errors caused by caller input rather than engine state.
    pub fn is_query_input(&self) -> bool {
        matches!(
            self,
            Self::ForbiddenName(_)
                | Self::UnknownLocation(_)
                | Self::UnknownGeoid(_)
                | Self::InvalidInput(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GeonamesError>;
