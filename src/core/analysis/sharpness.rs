//! Sharpness scoring via Laplacian response.
//!
//! Sharp images have strong local intensity changes; the mean squared
//! response of a 3x3 Laplacian over the interior of the frame measures that
//! directly. Scores are normalized to [0, 1], higher = sharper.

use super::SalientRegion;
use image::DynamicImage;

/// Mean squared Laplacian response that maps to a score of 1.0
const NORMALIZATION: f64 = 2000.0;

/// Scores how in-focus a frame is.
#[derive(Debug, Default)]
pub struct SharpnessAnalyzer;

impl SharpnessAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Sharpness in [0, 1]. Frames too small to hold an interior pixel
    /// (either dimension below 3) score 0.0 - missing data reads as
    /// maximally blurry, not as an error.
    pub fn score(&self, frame: &DynamicImage) -> f64 {
        let gray = frame.to_luma8();
        let (width, height) = gray.dimensions();

        if width < 3 || height < 3 {
            return 0.0;
        }

        // Laplacian kernel: [0, 1, 0; 1, -4, 1; 0, 1, 0]
        let mut sum_squared = 0.0f64;
        let mut count = 0usize;

        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let center = gray.get_pixel(x, y)[0] as f64;
                let top = gray.get_pixel(x, y - 1)[0] as f64;
                let bottom = gray.get_pixel(x, y + 1)[0] as f64;
                let left = gray.get_pixel(x - 1, y)[0] as f64;
                let right = gray.get_pixel(x + 1, y)[0] as f64;

                let response = top + bottom + left + right - 4.0 * center;
                sum_squared += response * response;
                count += 1;
            }
        }

        if count == 0 {
            return 0.0;
        }

        let mean_squared = sum_squared / count as f64;
        (mean_squared / NORMALIZATION).min(1.0)
    }

    /// Whether the frame scores below the blur threshold
    pub fn is_blurry(&self, frame: &DynamicImage, threshold: f64) -> bool {
        self.score(frame) < threshold
    }

    /// Score the most salient region of the frame when one is known,
    /// otherwise the whole frame. A degenerate crop falls back to
    /// whole-frame scoring.
    pub fn salient_score(&self, frame: &DynamicImage, region: Option<&SalientRegion>) -> f64 {
        let Some(region) = region else {
            return self.score(frame);
        };

        match crop_to_region(frame, region) {
            Some(cropped) => self.score(&cropped),
            None => self.score(frame),
        }
    }
}

/// Crop to a normalized bottom-left-origin bounding box.
///
/// Pixel space has a top-left origin, so the vertical axis flips:
/// `y_px = (1 - y - height) * frame_height`.
fn crop_to_region(frame: &DynamicImage, region: &SalientRegion) -> Option<DynamicImage> {
    let frame_width = frame.width() as f64;
    let frame_height = frame.height() as f64;

    let x = (region.x * frame_width).max(0.0) as u32;
    let y = ((1.0 - region.y - region.height) * frame_height).max(0.0) as u32;
    let width = (region.width * frame_width) as u32;
    let height = (region.height * frame_height) as u32;

    if width == 0 || height == 0 || x >= frame.width() || y >= frame.height() {
        return None;
    }

    let width = width.min(frame.width() - x);
    let height = height.min(frame.height() - y);

    Some(frame.crop_imm(x, y, width, height))
}
