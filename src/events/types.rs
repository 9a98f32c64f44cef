//! Event type definitions for progress reporting.

use crate::core::issue::{IssueCategory, ScanProgress};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// All events emitted by the triage engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Per-item scan phase events
    Scan(ScanEvent),
    /// Clustering pass events
    Cluster(ClusterEvent),
}

/// Events during the per-item scan phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { total_items: usize },
    /// Progress snapshot after an item was processed
    Progress(ScanProgress),
    /// An item was flagged
    IssueFound {
        item_id: String,
        category: IssueCategory,
    },
    /// No representative frame could be loaded; frame-dependent checks
    /// were skipped for this item
    FrameSkipped { item_id: String },
    /// Scan completed
    Completed { summary: ScanSummary },
    /// Scan was cancelled before completion
    Cancelled,
}

/// Events during the duplicate/similar clustering passes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClusterEvent {
    /// A clustering pass has started
    Started {
        pass: ClusterPass,
        descriptor_count: usize,
    },
    /// A clustering pass finished
    Completed {
        pass: ClusterPass,
        groups_found: usize,
        items_flagged: usize,
    },
}

/// Which clustering pass is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterPass {
    Duplicate,
    Similar,
}

impl std::fmt::Display for ClusterPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterPass::Duplicate => write!(f, "Duplicates"),
            ClusterPass::Similar => write!(f, "Similar"),
        }
    }
}

/// Summary of a completed scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Total media items processed
    pub total_items: usize,
    /// Total issues flagged across all categories
    pub issues_found: usize,
    /// Issues per category
    pub category_counts: HashMap<IssueCategory, usize>,
    /// Bytes reclaimable if every flagged item were deleted
    pub reclaimable_bytes: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
}
