use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ReachError>;

/// Error type covering the different failure cases that can occur when the
/// tool ingests datasets, resolves locations, or emits the workbook.
#[derive(Debug, Error)]
pub enum ReachError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing of the run configuration fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Transport-level failure talking to the geocoding provider.
    #[error("geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The geocoding provider returned zero matches for a location string.
    /// Callers treat this as a per-item failure, not a run abort.
    #[error("no geocoding match for '{0}'")]
    LocationNotFound(String),

    /// A coordinate pair fell outside the valid latitude/longitude domain.
    #[error("invalid coordinates: latitude {lat}, longitude {lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    /// A formula or lookup referenced a column absent from the dataset.
    #[error("column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Raised when an input workbook does not follow the expected shape.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when the run configuration is internally inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when no geocoding credential could be resolved.
    #[error("missing geocoding credential: set {0} or pass --api-key")]
    MissingCredential(String),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
