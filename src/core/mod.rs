//! # Core Module
//!
//! The UI-agnostic triage engine.
//!
//! ## Modules
//! - `media` - the media-store seam and the filesystem-backed store
//! - `analysis` - image-analysis seam, sharpness scoring, best-effort detectors
//! - `clustering` - duplicate/similar grouping over content descriptors
//! - `pipeline` - orchestrates a full scan
//! - `review` - per-category decision state machine
//! - `history` - persisted scan summaries
//! - `issue` - the shared issue/settings/progress model

pub mod analysis;
pub mod clustering;
pub mod history;
pub mod issue;
pub mod media;
pub mod pipeline;
pub mod review;

// Re-export commonly used types
pub use issue::{Decision, Issue, IssueCategory, ScanProgress, ScanSettings};
pub use pipeline::{CancellationToken, ScanOutcome, ScanPipeline};
pub use review::{ReviewSession, ReviewState};
