//! # History Module
//!
//! Persists scan-result summaries (per-category counts, totals, reclaimable
//! bytes, timestamp) so the app can show past scans, most recent first.

mod repository;
mod types;

pub use repository::HistoryRepository;
pub use types::{ScanHistory, ScanRecord, ScanStatus};
