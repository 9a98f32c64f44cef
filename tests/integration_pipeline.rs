//! Integration tests for the full scan pipeline over a filesystem store.
//!
//! These exercise enumeration, frame loading, per-item detectors and both
//! clustering passes end-to-end with synthetic images on disk.

use photo_triage::core::analysis::LumaGridProvider;
use photo_triage::core::issue::{IssueCategory, ScanSettings};
use photo_triage::core::media::{FsMediaStore, MediaStore};
use photo_triage::core::pipeline::{CancellationToken, ScanPipeline};
use photo_triage::error::TriageError;
use photo_triage::events::null_sender;
use image::{GrayImage, Luma};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Smooth horizontal ramp: near-zero Laplacian, so it reads as blurry
fn save_gradient(dir: &Path, name: &str) {
    let img = GrayImage::from_fn(64, 64, |x, _| Luma([(x * 4) as u8]));
    img.save(dir.join(name)).unwrap();
}

/// Flat gray: maximally blurry
fn save_solid(dir: &Path, name: &str) {
    let img = GrayImage::from_pixel(64, 64, Luma([128]));
    img.save(dir.join(name)).unwrap();
}

/// Coarse block checkerboard: sharp edges at pixel level, and a descriptor
/// that stays far from both the flat and the ramp images
fn save_noise(dir: &Path, name: &str) {
    let img = GrayImage::from_fn(64, 64, |x, y| {
        if (x / 4 + y / 4) % 2 == 0 {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    img.save(dir.join(name)).unwrap();
}

fn pipeline_for(root: &Path, settings: ScanSettings) -> ScanPipeline {
    ScanPipeline::builder()
        .store(Arc::new(FsMediaStore::new(root)))
        .analysis(Arc::new(LumaGridProvider::new()))
        .settings(settings)
        .build()
        .unwrap()
}

#[test]
fn scan_flags_duplicates_blur_and_screenshots() {
    let temp_dir = TempDir::new().unwrap();
    save_gradient(temp_dir.path(), "a.png");
    save_gradient(temp_dir.path(), "b.png"); // byte-for-byte twin of a
    save_solid(temp_dir.path(), "flat.png");
    save_noise(temp_dir.path(), "Screenshot home.png");

    // Keep the similar pass out of the way; content overlap between the
    // synthetic patterns is irrelevant here.
    let settings = ScanSettings {
        similar_threshold: 0.9999,
        ..ScanSettings::default()
    };
    let outcome = pipeline_for(temp_dir.path(), settings).run().unwrap();

    assert_eq!(outcome.total_items, 4);
    assert_eq!(outcome.progress.fraction(), 1.0);

    let duplicates: Vec<_> = outcome
        .issues
        .iter()
        .filter(|i| i.category == IssueCategory::Duplicate)
        .collect();
    assert_eq!(duplicates.len(), 1);
    assert!(["a.png", "b.png"].contains(&duplicates[0].item_id.as_str()));
    assert!(duplicates[0].group_id.is_some());
    assert!(duplicates[0].file_size > 0);

    let screenshots: Vec<_> = outcome
        .issues
        .iter()
        .filter(|i| i.category == IssueCategory::Screenshot)
        .collect();
    assert_eq!(screenshots.len(), 1);
    assert_eq!(screenshots[0].item_id, "Screenshot home.png");
    assert_eq!(screenshots[0].confidence, 1.0);

    let blurry_ids: Vec<&str> = outcome
        .issues
        .iter()
        .filter(|i| i.category == IssueCategory::Blurry)
        .map(|i| i.item_id.as_str())
        .collect();
    assert!(blurry_ids.contains(&"flat.png"));
    assert!(!blurry_ids.contains(&"Screenshot home.png"));
}

#[test]
fn similar_pass_pairs_related_content() {
    let temp_dir = TempDir::new().unwrap();
    save_solid(temp_dir.path(), "flat.png");
    save_gradient(temp_dir.path(), "ramp.png");

    // A flat field and a smooth ramp land between the similar and duplicate
    // thresholds on luma-grid descriptors.
    let outcome = pipeline_for(temp_dir.path(), ScanSettings::default())
        .run()
        .unwrap();

    let duplicates = outcome
        .issues
        .iter()
        .filter(|i| i.category == IssueCategory::Duplicate)
        .count();
    let similar: Vec<_> = outcome
        .issues
        .iter()
        .filter(|i| i.category == IssueCategory::Similar)
        .collect();

    assert_eq!(duplicates, 0);
    assert_eq!(similar.len(), 1);
    assert!(similar[0].group_id.is_some());
}

#[test]
fn no_item_is_flagged_in_both_cluster_passes() {
    let temp_dir = TempDir::new().unwrap();
    save_gradient(temp_dir.path(), "a.png");
    save_gradient(temp_dir.path(), "b.png");
    save_solid(temp_dir.path(), "flat.png");

    let outcome = pipeline_for(temp_dir.path(), ScanSettings::default())
        .run()
        .unwrap();

    let duplicate_ids: HashSet<&str> = outcome
        .issues
        .iter()
        .filter(|i| i.category == IssueCategory::Duplicate)
        .map(|i| i.item_id.as_str())
        .collect();
    let similar_ids: HashSet<&str> = outcome
        .issues
        .iter()
        .filter(|i| i.category == IssueCategory::Similar)
        .map(|i| i.item_id.as_str())
        .collect();

    assert!(duplicate_ids.is_disjoint(&similar_ids));
}

#[test]
fn excluded_album_is_not_scanned() {
    let temp_dir = TempDir::new().unwrap();
    let album = temp_dir.path().join("junk");
    std::fs::create_dir(&album).unwrap();
    save_solid(&album, "hidden.png");
    save_noise(temp_dir.path(), "visible.png");

    let settings = ScanSettings {
        excluded_album_ids: ["junk".to_string()].into_iter().collect(),
        ..ScanSettings::default()
    };
    let outcome = pipeline_for(temp_dir.path(), settings).run().unwrap();

    assert_eq!(outcome.total_items, 1);
    assert!(outcome.issues.iter().all(|i| i.item_id == "visible.png"));
}

#[test]
fn empty_directory_scans_cleanly() {
    let temp_dir = TempDir::new().unwrap();
    let outcome = pipeline_for(temp_dir.path(), ScanSettings::default())
        .run()
        .unwrap();

    assert_eq!(outcome.total_items, 0);
    assert!(outcome.issues.is_empty());
}

#[test]
fn corrupt_file_degrades_to_metadata_only() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("broken.jpg"), b"not an image").unwrap();
    save_noise(temp_dir.path(), "fine.png");

    // No panic, no abort; the corrupt file simply contributes no
    // frame-dependent issues.
    let outcome = pipeline_for(temp_dir.path(), ScanSettings::default())
        .run()
        .unwrap();

    assert_eq!(outcome.total_items, 2);
    assert!(!outcome
        .issues
        .iter()
        .any(|i| i.item_id == "broken.jpg" && i.category == IssueCategory::Blurry));
}

#[test]
fn cancelled_scan_produces_no_outcome() {
    let temp_dir = TempDir::new().unwrap();
    save_solid(temp_dir.path(), "a.png");

    let pipeline = pipeline_for(temp_dir.path(), ScanSettings::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = pipeline.run_with_events(&null_sender(), &cancel);
    assert!(matches!(result, Err(TriageError::Scan(_))));
}

#[test]
fn store_enumerates_newest_first() {
    let temp_dir = TempDir::new().unwrap();
    save_solid(temp_dir.path(), "first.png");
    save_noise(temp_dir.path(), "second.png");

    let store = FsMediaStore::new(temp_dir.path());
    let items = store.enumerate(&HashSet::new()).unwrap();

    assert_eq!(items.len(), 2);
    assert!(items[0].created_at >= items[1].created_at);
}
