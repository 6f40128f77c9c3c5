use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for BubbleKicker
#[derive(Error, Debug)]
pub enum BubbleKickerError {
    #[error("Not a valid channel for RGB color scheme: {0}")]
    InvalidChannel(String),

    #[error("Invalid parameter for {operation}: {reason}")]
    InvalidParameter {
        operation: String,
        reason: String,
    },

    #[error("Mask contains no foreground pixels")]
    EmptyMask,

    #[error("Unsupported bound '{bound}' for property '{property}' (expected 'min' or 'max')")]
    UnsupportedRule {
        property: String,
        bound: String,
    },

    #[error("Unknown region property: {0}")]
    UnknownProperty(String),

    #[error("No operations have been applied")]
    EmptyHistory,

    #[error("Regions were extracted at revision {extracted_at} but the pipeline is at revision {current}")]
    StaleRegions {
        extracted_at: u64,
        current: u64,
    },

    #[error("Label image and property table disagree: {0}")]
    InconsistentRegions(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("Ruleset parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),
}

impl BubbleKickerError {
    pub(crate) fn invalid_parameter(operation: &str, reason: impl Into<String>) -> Self {
        BubbleKickerError::InvalidParameter {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, BubbleKickerError>;
