//! Filesystem-backed media store.
//!
//! Treats a directory tree as a media library: files are items, first-level
//! subdirectories are albums. Subtype flags the platform would provide are
//! inferred from filename conventions, camera metadata presence from EXIF.
//! Deletion is trash-like: files move into a `.photo-triage-trash/` directory
//! under the root and can be restored by hand.

use super::decode::{downscale_to_fit, FrameDecoder};
use super::{Authorization, MediaItem, MediaStore};
use crate::error::MediaError;
use chrono::{DateTime, NaiveDateTime, Utc};
use image::DynamicImage;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;

const TRASH_DIR: &str = ".photo-triage-trash";

const STILL_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff", "tif"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "avi"];

/// Filename fragments that mark an item as a screenshot
const SCREENSHOT_PATTERNS: &[&str] = &["screenshot", "screen shot", "capture", "cleanshot", "snip"];

/// Filename fragments that mark a video as a screen recording.
/// `rpreplay` covers iOS exports (RPReplay_Final*.mp4).
const SCREEN_RECORDING_PATTERNS: &[&str] =
    &["screen_recording", "screenrecording", "screen recording", "rpreplay"];

/// A media store over a plain directory tree
pub struct FsMediaStore {
    root: PathBuf,
}

impl FsMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, id: &str) -> Result<PathBuf, MediaError> {
        let path = self.root.join(id);
        if !path.is_file() {
            return Err(MediaError::ItemNotFound { id: id.to_string() });
        }
        Ok(path)
    }

    /// Album of an item is its first-level directory under the root
    fn album_of(relative: &Path) -> Option<String> {
        let mut components = relative.components();
        let first = components.next()?;
        // A bare filename has no album
        components.next()?;
        Some(first.as_os_str().to_string_lossy().to_string())
    }

    fn build_item(&self, path: &Path) -> Option<MediaItem> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let id = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())?;
        let is_video = VIDEO_EXTENSIONS.contains(&extension.as_str());
        if !is_video && !STILL_EXTENSIONS.contains(&extension.as_str()) {
            return None;
        }

        let metadata = fs::metadata(path).ok()?;
        let modified_at: DateTime<Utc> = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_lowercase())
            .unwrap_or_default();

        let (pixel_width, pixel_height) = if is_video {
            (0, 0)
        } else {
            image::image_dimensions(path).unwrap_or((0, 0))
        };

        let exif = if is_video { None } else { read_exif(path) };
        let has_camera_metadata = exif
            .as_ref()
            .map(|e| e.has_camera_metadata)
            .unwrap_or(false);
        let created_at = exif
            .as_ref()
            .and_then(|e| e.captured_at)
            .unwrap_or(modified_at);

        Some(MediaItem {
            id,
            is_video,
            pixel_width,
            pixel_height,
            file_size: metadata.len(),
            is_screenshot: !is_video && matches_any(&filename, SCREENSHOT_PATTERNS),
            is_depth_effect: false,
            is_screen_recording: is_video && matches_any(&filename, SCREEN_RECORDING_PATTERNS),
            has_camera_metadata,
            created_at,
        })
    }
}

fn matches_any(filename: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| filename.contains(p))
}

struct ExifSummary {
    has_camera_metadata: bool,
    captured_at: Option<DateTime<Utc>>,
}

fn read_exif(path: &Path) -> Option<ExifSummary> {
    let file = fs::File::open(path).ok()?;
    let mut reader = std::io::BufReader::new(&file);
    let exif = exif::Reader::new().read_from_container(&mut reader).ok()?;

    let has_camera_metadata = exif
        .get_field(exif::Tag::Make, exif::In::PRIMARY)
        .or_else(|| exif.get_field(exif::Tag::Model, exif::In::PRIMARY))
        .is_some();

    let captured_at = exif
        .get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)
        .map(|field| field.display_value().to_string())
        .and_then(|s| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").ok())
        .map(|naive| naive.and_utc());

    Some(ExifSummary {
        has_camera_metadata,
        captured_at,
    })
}

impl MediaStore for FsMediaStore {
    fn request_authorization(&self) -> Result<Authorization, MediaError> {
        let metadata = match fs::metadata(&self.root) {
            Ok(m) if m.is_dir() => m,
            _ => return Ok(Authorization::Denied),
        };
        if metadata.permissions().readonly() {
            return Ok(Authorization::Limited);
        }
        Ok(Authorization::Authorized)
    }

    fn enumerate(&self, excluded_album_ids: &HashSet<String>) -> Result<Vec<MediaItem>, MediaError> {
        if !self.root.is_dir() {
            return Err(MediaError::Io {
                path: self.root.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "root is not a directory"),
            });
        }

        let candidates: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                !(name.starts_with('.') && entry.path() != self.root)
            })
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.strip_prefix(&self.root)
                    .ok()
                    .and_then(Self::album_of)
                    .map(|album| !excluded_album_ids.contains(&album))
                    .unwrap_or(true)
            })
            .collect();

        // Metadata extraction (EXIF, dimensions) dominates enumeration time
        let mut items: Vec<MediaItem> = candidates
            .par_iter()
            .filter_map(|path| self.build_item(path))
            .collect();

        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        tracing::debug!(count = items.len(), "enumerated media items");
        Ok(items)
    }

    fn load_frame(&self, id: &str, target_size: u32) -> Result<DynamicImage, MediaError> {
        let path = self.resolve(id)?;
        let image = FrameDecoder::decode(&path)?;
        Ok(downscale_to_fit(&image, target_size))
    }

    fn extract_keyframes(&self, id: &str, _count: usize) -> Result<Vec<DynamicImage>, MediaError> {
        // No video decoding support; an empty vector reads as "no decodable
        // frame" to the pipeline and the item gets metadata-only checks.
        tracing::debug!(id, "keyframe extraction not supported by filesystem store");
        Ok(Vec::new())
    }

    fn delete(&self, ids: &[String]) -> Result<(), MediaError> {
        if ids.is_empty() {
            return Ok(());
        }

        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let trash_root = self.root.join(TRASH_DIR).join(stamp.to_string());

        let mut failures = Vec::new();
        for id in ids {
            let source = match self.resolve(id) {
                Ok(path) => path,
                Err(_) => {
                    failures.push(format!("{id}: not found"));
                    continue;
                }
            };

            let destination = trash_root.join(id);
            if let Some(parent) = destination.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    failures.push(format!("{id}: {e}"));
                    continue;
                }
            }

            // rename fails across filesystems; fall back to copy+remove
            let moved = fs::rename(&source, &destination).or_else(|_| {
                fs::copy(&source, &destination)?;
                fs::remove_file(&source)
            });
            if let Err(e) = moved {
                failures.push(format!("{id}: {e}"));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(MediaError::DeleteFailed {
                count: failures.len(),
                reason: failures.join("; "),
            })
        }
    }
}
