//! Unified error hierarchy for coachrs
//!
//! The insight and motivation engines themselves never fail: every missing
//! input has a documented default. Errors only arise at the boundary, when a
//! snapshot, ledger or configuration file is read and checked before it is
//! handed to the engines.

use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, warn};

use crate::models::{MetricKind, Trend};

/// Top-level error type for all coachrs operations
#[derive(Debug, Error)]
pub enum CoachError {
    /// Snapshot failed shape validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot or ledger file missing
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Shape problems found in a metric snapshot
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A series was present but carried no samples
    #[error("{metric} series has no daily samples")]
    EmptySeries { metric: MetricKind },

    /// A sample was NaN or infinite
    #[error("{metric} sample {index} is not a finite number")]
    NonFiniteSample { metric: MetricKind, index: usize },

    /// Reported current value does not match the latest sample
    #[error("{metric} current value {current} does not match latest sample {latest}")]
    CurrentMismatch {
        metric: MetricKind,
        current: f64,
        latest: f64,
    },

    /// Reported change disagrees with the first and latest samples
    #[error("{metric} change {change}% does not match samples ({derived:.2}%)")]
    ChangeMismatch {
        metric: MetricKind,
        change: f64,
        derived: f64,
    },

    /// Reported trend disagrees with the change
    #[error("{metric} trend {trend} does not match change (expected {derived})")]
    TrendMismatch {
        metric: MetricKind,
        trend: Trend,
        derived: Trend,
    },

    /// An activity log used for streaks is malformed
    #[error("Invalid activity log {field}: {reason}")]
    InvalidActivity { field: String, reason: String },
}

/// Result type alias for coachrs operations
pub type Result<T> = std::result::Result<T, CoachError>;

impl CoachError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoachError::Validation(_) => ErrorSeverity::Warning,
            CoachError::FileNotFound { .. } => ErrorSeverity::Warning,
            CoachError::Json(_) => ErrorSeverity::Error,
            CoachError::Io(_) => ErrorSeverity::Error,
            CoachError::Configuration(_) => ErrorSeverity::Critical,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            CoachError::FileNotFound { path } => {
                format!("Could not find input file: {}", path.display())
            }
            CoachError::Validation(ValidationError::EmptySeries { metric }) => {
                format!(
                    "The {} series is empty. Omit it entirely to use defaults.",
                    metric
                )
            }
            CoachError::Json(err) => {
                format!("Input is not a valid coaching snapshot: {}", err)
            }
            _ => self.to_string(),
        }
    }

    /// Log the error at its severity and return the message for the user
    pub fn report(&self) -> String {
        match self.severity() {
            ErrorSeverity::Critical | ErrorSeverity::Error => {
                error!(error = %self, "operation failed")
            }
            ErrorSeverity::Warning => warn!(error = %self, "input rejected"),
        }
        self.user_message()
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical error, nothing can be produced
    Critical,
    /// Error that prevents the operation
    Error,
    /// Warning, usually bad input the user can fix
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}
