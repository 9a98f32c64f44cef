//! # Error Module
//!
//! User-friendly error types for the photo triage engine.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - item ids, paths, what went wrong
//! - **Locally contained** - per-item and per-detector failures never
//!   abort a running scan; only the variants below escape to the caller

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Media store error: {0}")]
    Media(#[from] MediaError),

    #[error("Image analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors from the media store collaborator
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Media item not found: {id}")]
    ItemNotFound { id: String },

    #[error("Library access denied")]
    AccessDenied,

    #[error("Library access restricted by policy")]
    AccessRestricted,

    #[error("No decodable frame for {id}: {reason}")]
    FrameUnavailable { id: String, reason: String },

    #[error("Frame load for {id} timed out")]
    FrameTimeout { id: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Failed to delete {count} item(s): {reason}")]
    DeleteFailed { count: usize, reason: String },
}

/// Errors from image-analysis primitives.
///
/// `Unsupported` marks a capability missing on this hardware/runtime;
/// the pipeline treats it as absence of signal, never as a failure.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Capability not available: {capability}")]
    Unsupported { capability: &'static str },

    #[error("Invalid input for analysis: {0}")]
    InvalidInput(String),

    #[error("Analysis failed: {0}")]
    Failed(String),
}

/// Errors that abort or refuse a scan run
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("A scan is already running")]
    AlreadyRunning,

    #[error("Scan was cancelled")]
    Cancelled,
}

/// Errors from the scan history store
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Failed to open history database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Failed to serialize record: {0}")]
    SerializationFailed(String),
}

impl From<rusqlite::Error> for HistoryError {
    fn from(e: rusqlite::Error) -> Self {
        HistoryError::QueryFailed(e.to_string())
    }
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, TriageError>;
