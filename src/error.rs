use thiserror::Error;

/// Errors raised while preparing inputs or costing equipment.
///
/// Solver infeasibility is deliberately absent: a failed solve is reported as
/// `Ok(None)` by [`crate::optimizer::StorageOptimizer::optimize`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Missing required input column: {0}")]
    MissingColumn(String),

    #[error("Unsupported A2P technology: {0}")]
    UnsupportedTechnology(String),

    #[error("CEPCI data not available for year {0}")]
    UnsupportedCostYear(i32),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Input series is empty")]
    EmptySeries,

    #[error("Timestamps must be strictly increasing (row {row})")]
    NonMonotonicTimestamps { row: usize },

    #[error("Irregular sampling interval at row {row}: expected {expected_minutes} min, found {found_minutes} min")]
    IrregularInterval {
        row: usize,
        expected_minutes: i64,
        found_minutes: i64,
    },

    #[error("Cannot resample from {source_hours} h to a finer {target_hours} h interval")]
    Upsampling { source_hours: f64, target_hours: f64 },

    #[error("Invalid timestamp {value:?} at row {row}")]
    InvalidTimestamp { row: usize, value: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
