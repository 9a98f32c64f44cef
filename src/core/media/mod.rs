//! # Media Module
//!
//! The media-store seam: what a library of photos and videos looks like to
//! the triage engine, and how frames are obtained from it.
//!
//! The engine never touches storage directly. It consumes a [`MediaStore`]
//! implementation; [`FsMediaStore`] backs one with a plain directory tree so
//! the crate is usable end-to-end without a platform photo library.

mod decode;
mod fs_store;

pub use decode::{downscale_to_fit, FrameDecoder};
pub use fs_store::FsMediaStore;

use crate::error::MediaError;
use chrono::{DateTime, Utc};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of requesting library access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authorization {
    Authorized,
    /// Read access to a subset of the library only
    Limited,
    Denied,
    Restricted,
}

/// One photo or video in the library, as enumerated by the store.
///
/// Read-only input to the engine; the engine never mutates items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    /// Store-scoped stable identifier
    pub id: String,
    pub is_video: bool,
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// On-disk size in bytes
    pub file_size: u64,
    /// The store says this item was captured as a screenshot
    pub is_screenshot: bool,
    /// Portrait / depth-effect capture; blur scoring is skipped for these
    pub is_depth_effect: bool,
    /// The store says this video is a screen recording
    pub is_screen_recording: bool,
    /// Camera make/model metadata is present
    pub has_camera_metadata: bool,
    pub created_at: DateTime<Utc>,
}

/// Capability interface over a library of media items.
///
/// Implementations are expected to be cheap to share (`Arc<dyn MediaStore>`)
/// and safe to call from a worker thread.
pub trait MediaStore: Send + Sync {
    /// Request read/write access to the library
    fn request_authorization(&self) -> Result<Authorization, MediaError>;

    /// Enumerate all items, creation date descending.
    ///
    /// Items belonging to any of the excluded albums are omitted.
    fn enumerate(&self, excluded_album_ids: &HashSet<String>) -> Result<Vec<MediaItem>, MediaError>;

    /// Load a representative pixel buffer for an item, downscaled so its
    /// longest edge is at most `target_size`.
    fn load_frame(&self, id: &str, target_size: u32) -> Result<DynamicImage, MediaError>;

    /// Extract up to `count` evenly spaced keyframes from a video.
    ///
    /// Stores without video decoding support return an empty vector, which
    /// the engine treats the same as "no decodable frame".
    fn extract_keyframes(&self, id: &str, count: usize) -> Result<Vec<DynamicImage>, MediaError>;

    /// Delete a batch of items. Expected to be recoverable (trash-like)
    /// where the underlying platform allows it.
    fn delete(&self, ids: &[String]) -> Result<(), MediaError>;
}

/// Load a frame, racing the store against a timeout.
///
/// The load runs on a worker thread and sends its result into a bounded
/// channel; whichever side finishes first wins. A load that loses the race
/// is abandoned: its send fails against the dropped receiver and the worker
/// exits without leaking pending work. A timed-out or failed load is `None`,
/// never an error - the caller records "no frame" and moves on.
pub fn load_frame_with_timeout(
    store: &Arc<dyn MediaStore>,
    id: &str,
    target_size: u32,
    timeout: Duration,
) -> Option<DynamicImage> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let store = Arc::clone(store);
    let id = id.to_string();

    std::thread::spawn(move || {
        let result = store.load_frame(&id, target_size);
        // Receiver may already be gone after a timeout; nothing to do then.
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(frame)) => Some(frame),
        Ok(Err(e)) => {
            tracing::debug!("frame load failed: {e}");
            None
        }
        Err(_) => {
            tracing::debug!("frame load timed out after {timeout:?}");
            None
        }
    }
}
