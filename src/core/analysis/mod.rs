//! # Analysis Module
//!
//! The image-analysis seam: descriptors for clustering plus the optional
//! model-backed detectors (text coverage, scene labels, aesthetics, lens
//! smudge, saliency).
//!
//! Every detector is best-effort. A capability can be missing on a given
//! runtime, and a missing capability is indistinguishable from "no signal":
//! route every call through [`best_effort`] and carry on.

pub mod sharpness;

pub use sharpness::SharpnessAnalyzer;

use crate::core::clustering::cosine_similarity;
use crate::error::AnalysisError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// A ranked scene label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneTag {
    pub label: String,
    pub confidence: f32,
}

/// An aesthetics judgement for a frame
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AestheticsScore {
    /// Overall score, roughly in [-1, 1]
    pub score: f32,
    /// The frame is a utility shot (document, receipt, whiteboard)
    pub is_utility: bool,
}

/// Normalized bounding box of the most salient region.
///
/// Origin is bottom-left, all fields in [0, 1] of the frame extent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SalientRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Opaque visual-content descriptor produced by an [`AnalysisProvider`].
///
/// Only the provider that produced a descriptor knows how to measure
/// distance between two of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureDescriptor(Vec<f32>);

impl FeatureDescriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Capability interface over on-device image-analysis primitives.
///
/// Any method may fail with [`AnalysisError::Unsupported`] on hardware or
/// runtimes that lack the capability; callers must treat that as absence of
/// signal, never as a reason to abort an item or a scan.
pub trait AnalysisProvider: Send + Sync {
    /// Produce a content descriptor for duplicate/similar clustering
    fn descriptor(&self, frame: &DynamicImage) -> Result<FeatureDescriptor, AnalysisError>;

    /// Pairwise dissimilarity between two descriptors; lower is more similar.
    /// Scaled so that `(1 - similarity_threshold) * 100` is a usable cutoff.
    fn descriptor_distance(
        &self,
        a: &FeatureDescriptor,
        b: &FeatureDescriptor,
    ) -> Result<f32, AnalysisError>;

    /// Fraction of the frame covered by text regions, in [0, 1]
    fn text_coverage(&self, frame: &DynamicImage) -> Result<f64, AnalysisError>;

    /// Up to `top_k` scene labels, most confident first
    fn classify_scene(
        &self,
        frame: &DynamicImage,
        top_k: usize,
    ) -> Result<Vec<SceneTag>, AnalysisError>;

    /// Aesthetic quality of the frame
    fn aesthetics_score(&self, frame: &DynamicImage) -> Result<AestheticsScore, AnalysisError>;

    /// Confidence in [0, 1] that the lens was smudged when capturing
    fn lens_smudge_confidence(&self, frame: &DynamicImage) -> Result<f32, AnalysisError>;

    /// Bounding box of the most salient region, if one stands out
    fn salient_region(
        &self,
        frame: &DynamicImage,
    ) -> Result<Option<SalientRegion>, AnalysisError>;
}

/// Convert any detector failure into an absent signal.
///
/// Unsupported capabilities are expected and stay quiet; other failures are
/// logged at debug level and likewise degrade to `None`.
pub fn best_effort<T>(
    capability: &'static str,
    result: Result<T, AnalysisError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(AnalysisError::Unsupported { .. }) => None,
        Err(e) => {
            tracing::debug!(capability, error = %e, "detector degraded to no signal");
            None
        }
    }
}

/// Default provider: luma-grid descriptors, no model-backed detectors.
///
/// Descriptors are L2-normalized 16x16 grayscale grids; distance is
/// `(1 - cosine) * 100`, matching the scale the pipeline's threshold
/// conversion expects. Everything model-backed reports Unsupported.
pub struct LumaGridProvider {
    grid_size: u32,
}

impl LumaGridProvider {
    pub fn new() -> Self {
        Self { grid_size: 16 }
    }

    pub fn with_grid_size(grid_size: u32) -> Self {
        Self {
            grid_size: grid_size.max(1),
        }
    }
}

impl Default for LumaGridProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisProvider for LumaGridProvider {
    fn descriptor(&self, frame: &DynamicImage) -> Result<FeatureDescriptor, AnalysisError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(AnalysisError::InvalidInput("empty frame".to_string()));
        }

        let gray = frame
            .resize_exact(
                self.grid_size,
                self.grid_size,
                image::imageops::FilterType::Triangle,
            )
            .to_luma8();

        let mut values: Vec<f32> = gray.pixels().map(|p| p[0] as f32 / 255.0).collect();

        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut values {
                *v /= norm;
            }
        }

        Ok(FeatureDescriptor::new(values))
    }

    fn descriptor_distance(
        &self,
        a: &FeatureDescriptor,
        b: &FeatureDescriptor,
    ) -> Result<f32, AnalysisError> {
        if a.len() != b.len() || a.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "descriptor length mismatch".to_string(),
            ));
        }
        let similarity = cosine_similarity(a.as_slice(), b.as_slice());
        Ok((1.0 - similarity).max(0.0) * 100.0)
    }

    fn text_coverage(&self, _frame: &DynamicImage) -> Result<f64, AnalysisError> {
        Err(AnalysisError::Unsupported {
            capability: "text coverage",
        })
    }

    fn classify_scene(
        &self,
        _frame: &DynamicImage,
        _top_k: usize,
    ) -> Result<Vec<SceneTag>, AnalysisError> {
        Err(AnalysisError::Unsupported {
            capability: "scene classification",
        })
    }

    fn aesthetics_score(&self, _frame: &DynamicImage) -> Result<AestheticsScore, AnalysisError> {
        Err(AnalysisError::Unsupported {
            capability: "aesthetics scoring",
        })
    }

    fn lens_smudge_confidence(&self, _frame: &DynamicImage) -> Result<f32, AnalysisError> {
        Err(AnalysisError::Unsupported {
            capability: "lens smudge detection",
        })
    }

    fn salient_region(
        &self,
        _frame: &DynamicImage,
    ) -> Result<Option<SalientRegion>, AnalysisError> {
        Err(AnalysisError::Unsupported {
            capability: "saliency",
        })
    }
}
