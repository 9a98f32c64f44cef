//! Issue model: categories, decisions, scan settings and progress.
//!
//! An [`Issue`] is one flagged (item, category, confidence) tuple carrying a
//! user decision. Issues are created only by the scan pipeline; only a review
//! session mutates their decision afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Why an item was flagged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Duplicate,
    Similar,
    Blurry,
    Screenshot,
    ScreenRecording,
    LensSmudge,
    TextHeavy,
    LowQuality,
}

impl IssueCategory {
    /// All categories, in review-priority order
    pub const ALL: [IssueCategory; 8] = [
        IssueCategory::Duplicate,
        IssueCategory::Similar,
        IssueCategory::Blurry,
        IssueCategory::Screenshot,
        IssueCategory::ScreenRecording,
        IssueCategory::LensSmudge,
        IssueCategory::TextHeavy,
        IssueCategory::LowQuality,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Duplicate => "Duplicates",
            Self::Similar => "Similar",
            Self::Blurry => "Blurry",
            Self::Screenshot => "Screenshots",
            Self::ScreenRecording => "Screen Recordings",
            Self::LensSmudge => "Lens Smudges",
            Self::TextHeavy => "Text-Heavy",
            Self::LowQuality => "Low Quality",
        }
    }

    /// Stable icon key for presentation layers
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Duplicate => "doc.on.doc",
            Self::Similar => "square.on.square",
            Self::Blurry => "camera.metering.unknown",
            Self::Screenshot => "rectangle.on.rectangle",
            Self::ScreenRecording => "record.circle",
            Self::LensSmudge => "camera.filters",
            Self::TextHeavy => "doc.text",
            Self::LowQuality => "photo.badge.exclamationmark",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Duplicate => "duplicate",
            Self::Similar => "similar",
            Self::Blurry => "blurry",
            Self::Screenshot => "screenshot",
            Self::ScreenRecording => "screen_recording",
            Self::LensSmudge => "lens_smudge",
            Self::TextHeavy => "text_heavy",
            Self::LowQuality => "low_quality",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "duplicate" => Some(Self::Duplicate),
            "similar" => Some(Self::Similar),
            "blurry" => Some(Self::Blurry),
            "screenshot" => Some(Self::Screenshot),
            "screen_recording" => Some(Self::ScreenRecording),
            "lens_smudge" => Some(Self::LensSmudge),
            "text_heavy" => Some(Self::TextHeavy),
            "low_quality" => Some(Self::LowQuality),
            _ => None,
        }
    }
}

impl std::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// User decision on a flagged item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Pending,
    Keep,
    Delete,
}

/// A single flagged item awaiting review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Identifier of the flagged media item
    pub item_id: String,
    pub category: IssueCategory,
    /// Detector confidence in [0, 1]
    pub confidence: f64,
    /// On-disk size of the item in bytes
    pub file_size: u64,
    pub decision: Decision,
    /// Present iff category is Duplicate or Similar
    pub group_id: Option<String>,
    /// Scene labels attached by best-effort classification
    pub scene_tags: Vec<String>,
    /// Raw aesthetics score when one was computed
    pub aesthetics_score: Option<f32>,
    pub is_video: bool,
    pub created_at: DateTime<Utc>,
}

impl Issue {
    pub fn new(item_id: impl Into<String>, category: IssueCategory, confidence: f64) -> Self {
        Self {
            item_id: item_id.into(),
            category,
            confidence,
            file_size: 0,
            decision: Decision::Pending,
            group_id: None,
            scene_tags: Vec::new(),
            aesthetics_score: None,
            is_video: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_file_size(mut self, size: u64) -> Self {
        self.file_size = size;
        self
    }

    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn with_scene_tags(mut self, tags: Vec<String>) -> Self {
        self.scene_tags = tags;
        self
    }

    pub fn with_aesthetics_score(mut self, score: f32) -> Self {
        self.aesthetics_score = Some(score);
        self
    }

    pub fn with_is_video(mut self, is_video: bool) -> Self {
        self.is_video = is_video;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Tunable thresholds for a scan run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Sharpness below this flags an item blurry
    pub blur_threshold: f64,
    /// Cosine-style similarity at or above this makes a duplicate
    pub duplicate_threshold: f32,
    /// Similarity at or above this (but below duplicate) makes a similar pair
    pub similar_threshold: f32,
    pub batch_size: usize,
    /// Fraction of the frame covered by text regions to flag text-heavy
    pub text_coverage_threshold: f64,
    /// Aesthetics score below this flags low quality
    pub low_quality_threshold: f32,
    /// Smudge confidence at or above this flags a lens smudge
    pub lens_smudge_threshold: f32,
    /// Albums excluded from enumeration
    pub excluded_album_ids: HashSet<String>,
    /// Budget for loading one representative frame
    pub frame_timeout: Duration,
    /// Longest edge of loaded frames, in pixels
    pub frame_target_size: u32,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            blur_threshold: 0.3,
            duplicate_threshold: 0.95,
            similar_threshold: 0.80,
            batch_size: 30,
            text_coverage_threshold: 0.15,
            low_quality_threshold: -0.3,
            lens_smudge_threshold: 0.7,
            excluded_album_ids: HashSet::new(),
            frame_timeout: Duration::from_secs(5),
            frame_target_size: 512,
        }
    }
}

/// Running progress of a scan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanProgress {
    pub processed: usize,
    pub total: usize,
    pub category_counts: HashMap<IssueCategory, usize>,
}

impl ScanProgress {
    pub fn new(processed: usize, total: usize) -> Self {
        Self {
            processed,
            total,
            category_counts: HashMap::new(),
        }
    }

    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.processed as f64 / self.total as f64
    }

    pub fn percent_formatted(&self) -> String {
        format!("{}%", (self.fraction() * 100.0) as u32)
    }

    pub fn count(&self, category: IssueCategory) -> usize {
        self.category_counts.get(&category).copied().unwrap_or(0)
    }
}
