//! Types for scan history storage.

use crate::core::issue::IssueCategory;
use crate::events::ScanSummary;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Terminal status of a recorded scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Completed,
    Cancelled,
    Error(String),
}

impl ScanStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Error(_) => "error",
        }
    }

    pub fn from_str(s: &str, error_msg: Option<&str>) -> Self {
        match s {
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            "error" => Self::Error(error_msg.unwrap_or("Unknown error").to_string()),
            _ => Self::Error(format!("Unknown status: {}", s)),
        }
    }
}

/// One persisted scan summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: String,
    /// Unix timestamp in seconds
    pub scan_time: i64,
    pub total_items: usize,
    pub category_counts: HashMap<IssueCategory, usize>,
    pub reclaimable_bytes: u64,
    pub duration_ms: u64,
    pub status: ScanStatus,
}

impl ScanRecord {
    /// Build a record from a completed scan's summary
    pub fn from_summary(id: String, scan_time: i64, summary: &ScanSummary) -> Self {
        Self {
            id,
            scan_time,
            total_items: summary.total_items,
            category_counts: summary.category_counts.clone(),
            reclaimable_bytes: summary.reclaimable_bytes,
            duration_ms: summary.duration_ms,
            status: ScanStatus::Completed,
        }
    }

    /// Total issues across all categories
    pub fn total_issues(&self) -> usize {
        self.category_counts.values().sum()
    }

    pub fn count(&self, category: IssueCategory) -> usize {
        self.category_counts.get(&category).copied().unwrap_or(0)
    }
}

/// Result of listing scan history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanHistory {
    pub records: Vec<ScanRecord>,
    pub total_count: usize,
}
