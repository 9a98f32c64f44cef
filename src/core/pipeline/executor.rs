//! Scan execution implementation.

use crate::core::analysis::{best_effort, AnalysisProvider, FeatureDescriptor, SharpnessAnalyzer};
use crate::core::clustering::group_by_distance;
use crate::core::issue::{Issue, IssueCategory, ScanProgress, ScanSettings};
use crate::core::media::{load_frame_with_timeout, MediaItem, MediaStore};
use crate::error::{ScanError, TriageError};
use crate::events::{
    null_sender, ClusterEvent, ClusterPass, Event, EventSender, ScanEvent, ScanSummary,
};
use image::DynamicImage;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Keyframes sampled per video when hunting for a representative frame
const KEYFRAME_COUNT: usize = 5;

/// Scene labels attached to quality issues
const SCENE_TAG_COUNT: usize = 3;

/// Known device screen resolutions as (shorter, longer) pixel pairs.
/// A still matching one of these without camera metadata is very likely
/// a screenshot.
const DEVICE_RESOLUTIONS: &[(u32, u32)] = &[
    (1170, 2532),
    (1179, 2556),
    (1290, 2796),
    (1125, 2436),
    (828, 1792),
    (1242, 2688),
    (750, 1334),
    (1080, 1920),
    (640, 1136),
    (1284, 2778),
];

/// Cooperative cancellation handle for a running scan.
///
/// Clone it, hand one side to the scan worker and keep the other; `cancel()`
/// stops the scan at the next item boundary.
#[derive(Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Result of a completed scan
#[derive(Debug)]
pub struct ScanOutcome {
    /// All issues found, per-item issues first, then duplicate and similar
    /// groups
    pub issues: Vec<Issue>,
    /// Final progress snapshot (processed == total)
    pub progress: ScanProgress,
    /// Total media items enumerated
    pub total_items: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Builder for the scan pipeline
pub struct ScanPipelineBuilder {
    store: Option<Arc<dyn MediaStore>>,
    analysis: Option<Arc<dyn AnalysisProvider>>,
    settings: ScanSettings,
}

impl ScanPipelineBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            analysis: None,
            settings: ScanSettings::default(),
        }
    }

    pub fn store(mut self, store: Arc<dyn MediaStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn analysis(mut self, analysis: Arc<dyn AnalysisProvider>) -> Self {
        self.analysis = Some(analysis);
        self
    }

    pub fn settings(mut self, settings: ScanSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Result<ScanPipeline, TriageError> {
        let store = self
            .store
            .ok_or_else(|| TriageError::Config("pipeline needs a media store".to_string()))?;
        let analysis = self
            .analysis
            .ok_or_else(|| TriageError::Config("pipeline needs an analysis provider".to_string()))?;

        Ok(ScanPipeline {
            store,
            analysis,
            settings: self.settings,
            sharpness: SharpnessAnalyzer::new(),
            scanning: AtomicBool::new(false),
        })
    }
}

impl Default for ScanPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The triage scan pipeline
pub struct ScanPipeline {
    store: Arc<dyn MediaStore>,
    analysis: Arc<dyn AnalysisProvider>,
    settings: ScanSettings,
    sharpness: SharpnessAnalyzer,
    scanning: AtomicBool,
}

/// Similarity threshold in [0, 1] to a maximum feature distance
fn max_distance_for(threshold: f32) -> f32 {
    (1.0 - threshold) * 100.0
}

fn matches_device_resolution(width: u32, height: u32) -> bool {
    let key = (width.min(height), width.max(height));
    DEVICE_RESOLUTIONS.contains(&key)
}

impl ScanPipeline {
    pub fn builder() -> ScanPipelineBuilder {
        ScanPipelineBuilder::new()
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Run the scan without events or cancellation
    pub fn run(&self) -> Result<ScanOutcome, TriageError> {
        self.run_with_events(&null_sender(), &CancellationToken::new())
    }

    /// Run the scan, emitting progress events and honoring cancellation.
    ///
    /// Only one scan may be active on a pipeline at a time.
    pub fn run_with_events(
        &self,
        events: &EventSender,
        cancel: &CancellationToken,
    ) -> Result<ScanOutcome, TriageError> {
        if self.scanning.swap(true, Ordering::SeqCst) {
            return Err(ScanError::AlreadyRunning.into());
        }
        let result = self.scan(events, cancel);
        self.scanning.store(false, Ordering::SeqCst);
        result
    }

    fn scan(
        &self,
        events: &EventSender,
        cancel: &CancellationToken,
    ) -> Result<ScanOutcome, TriageError> {
        let start_time = Instant::now();

        let items = self.store.enumerate(&self.settings.excluded_album_ids)?;
        let total_items = items.len();

        events.send(Event::Scan(ScanEvent::Started { total_items }));
        tracing::info!(total_items, "scan started");

        let mut issues: Vec<Issue> = Vec::new();
        let mut progress = ScanProgress::new(0, total_items);
        let mut descriptors: Vec<(String, FeatureDescriptor)> = Vec::new();

        let batch_size = self.settings.batch_size.max(1);
        for batch in items.chunks(batch_size) {
            for item in batch {
                if cancel.is_cancelled() {
                    events.send(Event::Scan(ScanEvent::Cancelled));
                    return Err(ScanError::Cancelled.into());
                }

                self.process_item(item, &mut issues, &mut progress, &mut descriptors, events);

                progress.processed += 1;
                events.send(Event::Scan(ScanEvent::Progress(progress.clone())));
            }
        }

        // Barrier: clustering only ever sees the complete descriptor set
        if cancel.is_cancelled() {
            events.send(Event::Scan(ScanEvent::Cancelled));
            return Err(ScanError::Cancelled.into());
        }

        let item_index: HashMap<&str, &MediaItem> =
            items.iter().map(|item| (item.id.as_str(), item)).collect();

        self.run_cluster_passes(&descriptors, &item_index, &mut issues, &mut progress, events);

        let summary = ScanSummary {
            total_items,
            issues_found: issues.len(),
            category_counts: progress.category_counts.clone(),
            reclaimable_bytes: reclaimable_bytes(&issues),
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        progress.processed = total_items;
        events.send(Event::Scan(ScanEvent::Progress(progress.clone())));
        events.send(Event::Scan(ScanEvent::Completed {
            summary: summary.clone(),
        }));
        tracing::info!(
            issues = summary.issues_found,
            duration_ms = summary.duration_ms,
            "scan completed"
        );

        Ok(ScanOutcome {
            issues,
            progress,
            total_items,
            duration_ms: summary.duration_ms,
        })
    }

    /// Run every detector over one item.
    ///
    /// Detector failures degrade to "no issue"; only the representative
    /// frame gates the frame-dependent checks.
    fn process_item(
        &self,
        item: &MediaItem,
        issues: &mut Vec<Issue>,
        progress: &mut ScanProgress,
        descriptors: &mut Vec<(String, FeatureDescriptor)>,
        events: &EventSender,
    ) {
        // Screen recordings are flagged up front; the video still goes
        // through the remaining checks.
        if item.is_video && item.is_screen_recording {
            self.record(
                self.issue_for(item, IssueCategory::ScreenRecording, 1.0),
                issues,
                progress,
                events,
            );
        }

        let frame = self.representative_frame(item, descriptors);

        // Screenshot detection needs only metadata, so it runs with or
        // without a frame.
        if !item.is_video {
            if item.is_screenshot {
                self.record(
                    self.issue_for(item, IssueCategory::Screenshot, 1.0),
                    issues,
                    progress,
                    events,
                );
            } else if !item.has_camera_metadata
                && matches_device_resolution(item.pixel_width, item.pixel_height)
            {
                self.record(
                    self.issue_for(item, IssueCategory::Screenshot, 0.9),
                    issues,
                    progress,
                    events,
                );
            }
        }

        let Some(frame) = frame else {
            events.send(Event::Scan(ScanEvent::FrameSkipped {
                item_id: item.id.clone(),
            }));
            return;
        };

        // Blur scoring, skipped for depth-effect captures
        if !item.is_depth_effect {
            let region = best_effort("saliency", self.analysis.salient_region(&frame)).flatten();
            let score = self.sharpness.salient_score(&frame, region.as_ref());
            if score < self.settings.blur_threshold {
                self.record(
                    self.issue_for(item, IssueCategory::Blurry, 1.0 - score),
                    issues,
                    progress,
                    events,
                );
            }
        }

        if let Some(coverage) = best_effort("text coverage", self.analysis.text_coverage(&frame)) {
            if coverage >= self.settings.text_coverage_threshold {
                self.record(
                    self.issue_for(item, IssueCategory::TextHeavy, (coverage * 2.0).min(1.0)),
                    issues,
                    progress,
                    events,
                );
            }
        }

        let scene_tags: Vec<String> = best_effort(
            "scene classification",
            self.analysis.classify_scene(&frame, SCENE_TAG_COUNT),
        )
        .unwrap_or_default()
        .into_iter()
        .map(|tag| tag.label)
        .collect();

        if let Some(aesthetics) =
            best_effort("aesthetics", self.analysis.aesthetics_score(&frame))
        {
            if aesthetics.score < self.settings.low_quality_threshold {
                let confidence = 1.0 - (aesthetics.score as f64 + 1.0) / 2.0;
                self.record(
                    self.issue_for(item, IssueCategory::LowQuality, confidence)
                        .with_scene_tags(scene_tags.clone())
                        .with_aesthetics_score(aesthetics.score),
                    issues,
                    progress,
                    events,
                );
            }
        }

        if let Some(smudge) = best_effort(
            "lens smudge",
            self.analysis.lens_smudge_confidence(&frame),
        ) {
            if smudge >= self.settings.lens_smudge_threshold {
                self.record(
                    self.issue_for(item, IssueCategory::LensSmudge, smudge as f64)
                        .with_scene_tags(scene_tags.clone()),
                    issues,
                    progress,
                    events,
                );
            }
        }

        // Still descriptors are generated here; video descriptors were
        // retained during keyframe extraction.
        if !item.is_video {
            if let Some(descriptor) =
                best_effort("descriptor", self.analysis.descriptor(&frame))
            {
                descriptors.push((item.id.clone(), descriptor));
            }
        }
    }

    /// Obtain the representative frame for an item.
    ///
    /// Videos: first decodable of up to [`KEYFRAME_COUNT`] evenly spaced
    /// keyframes, with a descriptor retained from the first keyframe that
    /// yields one. Stills: a timeout-raced frame load.
    fn representative_frame(
        &self,
        item: &MediaItem,
        descriptors: &mut Vec<(String, FeatureDescriptor)>,
    ) -> Option<DynamicImage> {
        if item.is_video {
            let keyframes = self
                .store
                .extract_keyframes(&item.id, KEYFRAME_COUNT)
                .unwrap_or_default();

            for keyframe in &keyframes {
                if let Some(descriptor) =
                    best_effort("descriptor", self.analysis.descriptor(keyframe))
                {
                    descriptors.push((item.id.clone(), descriptor));
                    break;
                }
            }

            keyframes.into_iter().next()
        } else {
            load_frame_with_timeout(
                &self.store,
                &item.id,
                self.settings.frame_target_size,
                self.settings.frame_timeout,
            )
        }
    }

    /// Run the duplicate pass, then the similar pass over the same
    /// descriptors with duplicate-claimed members excluded.
    fn run_cluster_passes(
        &self,
        descriptors: &[(String, FeatureDescriptor)],
        item_index: &HashMap<&str, &MediaItem>,
        issues: &mut Vec<Issue>,
        progress: &mut ScanProgress,
        events: &EventSender,
    ) {
        let provider = &self.analysis;
        let distance =
            |a: &FeatureDescriptor, b: &FeatureDescriptor| provider.descriptor_distance(a, b);

        // Duplicate pass
        events.send(Event::Cluster(ClusterEvent::Started {
            pass: ClusterPass::Duplicate,
            descriptor_count: descriptors.len(),
        }));

        let duplicate_max = max_distance_for(self.settings.duplicate_threshold);
        let duplicate_groups = group_by_distance(descriptors, duplicate_max, distance);

        let mut duplicate_ids: HashSet<String> = HashSet::new();
        let mut duplicates_flagged = 0usize;
        for group in &duplicate_groups {
            duplicate_ids.extend(group.iter().cloned());
            let group_id = Uuid::new_v4().to_string();
            // The first-seen member is canonical and stays unflagged
            for member in group.iter().skip(1) {
                let issue = self.clustered_issue(
                    member.as_str(),
                    IssueCategory::Duplicate,
                    0.95,
                    &group_id,
                    item_index,
                );
                self.record(issue, issues, progress, events);
                duplicates_flagged += 1;
            }
        }

        events.send(Event::Cluster(ClusterEvent::Completed {
            pass: ClusterPass::Duplicate,
            groups_found: duplicate_groups.len(),
            items_flagged: duplicates_flagged,
        }));

        // Similar pass over the same descriptors, looser threshold
        events.send(Event::Cluster(ClusterEvent::Started {
            pass: ClusterPass::Similar,
            descriptor_count: descriptors.len(),
        }));

        let similar_max = max_distance_for(self.settings.similar_threshold);
        let similar_groups = group_by_distance(descriptors, similar_max, distance);

        let mut similar_group_count = 0usize;
        let mut similar_flagged = 0usize;
        for group in &similar_groups {
            let unclaimed: Vec<&String> = group
                .iter()
                .filter(|id| !duplicate_ids.contains(*id))
                .collect();
            if unclaimed.len() < 2 {
                continue;
            }
            similar_group_count += 1;
            let group_id = Uuid::new_v4().to_string();
            for member in unclaimed.iter().skip(1) {
                let issue = self.clustered_issue(
                    member.as_str(),
                    IssueCategory::Similar,
                    0.85,
                    &group_id,
                    item_index,
                );
                self.record(issue, issues, progress, events);
                similar_flagged += 1;
            }
        }

        events.send(Event::Cluster(ClusterEvent::Completed {
            pass: ClusterPass::Similar,
            groups_found: similar_group_count,
            items_flagged: similar_flagged,
        }));
    }

    fn issue_for(&self, item: &MediaItem, category: IssueCategory, confidence: f64) -> Issue {
        Issue::new(item.id.clone(), category, confidence)
            .with_file_size(item.file_size)
            .with_is_video(item.is_video)
            .with_created_at(item.created_at)
    }

    fn clustered_issue(
        &self,
        item_id: &str,
        category: IssueCategory,
        confidence: f64,
        group_id: &str,
        item_index: &HashMap<&str, &MediaItem>,
    ) -> Issue {
        let mut issue = Issue::new(item_id, category, confidence).with_group_id(group_id);
        if let Some(item) = item_index.get(item_id) {
            issue = issue
                .with_file_size(item.file_size)
                .with_is_video(item.is_video)
                .with_created_at(item.created_at);
        }
        issue
    }

    fn record(
        &self,
        issue: Issue,
        issues: &mut Vec<Issue>,
        progress: &mut ScanProgress,
        events: &EventSender,
    ) {
        *progress.category_counts.entry(issue.category).or_insert(0) += 1;
        events.send(Event::Scan(ScanEvent::IssueFound {
            item_id: issue.item_id.clone(),
            category: issue.category,
        }));
        issues.push(issue);
    }
}

/// Bytes freed if every flagged item were deleted; items flagged in more
/// than one category count once.
fn reclaimable_bytes(issues: &[Issue]) -> u64 {
    let mut seen = HashSet::new();
    issues
        .iter()
        .filter(|issue| seen.insert(issue.item_id.as_str()))
        .map(|issue| issue.file_size)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analysis::{AestheticsScore, SalientRegion, SceneTag};
    use crate::core::clustering::cosine_similarity;
    use crate::core::issue::Decision;
    use crate::error::{AnalysisError, MediaError};
    use crate::events::EventChannel;
    use chrono::Utc;
    use image::{Rgb, RgbImage};

    /// Encodes test signals in pixel channels of a solid frame:
    /// red = embedding angle in degrees, green = text coverage * 255,
    /// blue = (aesthetics + 1) / 2 * 255.
    fn frame(red: u8, green: u8, blue: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([red, green, blue])))
    }

    struct TestProvider;

    impl AnalysisProvider for TestProvider {
        fn descriptor(&self, frame: &DynamicImage) -> Result<FeatureDescriptor, AnalysisError> {
            let angle = (frame.to_rgb8().get_pixel(0, 0)[0] as f32).to_radians();
            Ok(FeatureDescriptor::new(vec![angle.cos(), angle.sin()]))
        }

        fn descriptor_distance(
            &self,
            a: &FeatureDescriptor,
            b: &FeatureDescriptor,
        ) -> Result<f32, AnalysisError> {
            Ok((1.0 - cosine_similarity(a.as_slice(), b.as_slice())).max(0.0) * 100.0)
        }

        fn text_coverage(&self, frame: &DynamicImage) -> Result<f64, AnalysisError> {
            Ok(frame.to_rgb8().get_pixel(0, 0)[1] as f64 / 255.0)
        }

        fn classify_scene(
            &self,
            _frame: &DynamicImage,
            top_k: usize,
        ) -> Result<Vec<SceneTag>, AnalysisError> {
            Ok(vec![SceneTag {
                label: "test_scene".to_string(),
                confidence: 0.9,
            }]
            .into_iter()
            .take(top_k)
            .collect())
        }

        fn aesthetics_score(
            &self,
            frame: &DynamicImage,
        ) -> Result<AestheticsScore, AnalysisError> {
            let blue = frame.to_rgb8().get_pixel(0, 0)[2] as f32;
            Ok(AestheticsScore {
                score: blue / 255.0 * 2.0 - 1.0,
                is_utility: false,
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
            Ok(None)
        }
    }

    struct TestStore {
        items: Vec<MediaItem>,
        frames: HashMap<String, DynamicImage>,
        keyframes: HashMap<String, Vec<DynamicImage>>,
    }

    impl TestStore {
        fn new() -> Self {
            Self {
                items: Vec::new(),
                frames: HashMap::new(),
                keyframes: HashMap::new(),
            }
        }

        fn with_still(mut self, id: &str, frame: Option<DynamicImage>) -> Self {
            self.items.push(test_item(id, false));
            if let Some(frame) = frame {
                self.frames.insert(id.to_string(), frame);
            }
            self
        }

        fn with_item(mut self, item: MediaItem, frame: Option<DynamicImage>) -> Self {
            let id = item.id.clone();
            self.items.push(item);
            if let Some(frame) = frame {
                self.frames.insert(id, frame);
            }
            self
        }

        fn with_video(mut self, item: MediaItem, keyframes: Vec<DynamicImage>) -> Self {
            let id = item.id.clone();
            self.items.push(item);
            self.keyframes.insert(id, keyframes);
            self
        }
    }

    fn test_item(id: &str, is_video: bool) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            is_video,
            pixel_width: 4000,
            pixel_height: 3000,
            file_size: 1000,
            is_screenshot: false,
            is_depth_effect: false,
            is_screen_recording: false,
            has_camera_metadata: true,
            created_at: Utc::now(),
        }
    }

    impl MediaStore for TestStore {
        fn request_authorization(
            &self,
        ) -> Result<crate::core::media::Authorization, MediaError> {
            Ok(crate::core::media::Authorization::Authorized)
        }

        fn enumerate(&self, _: &HashSet<String>) -> Result<Vec<MediaItem>, MediaError> {
            Ok(self.items.clone())
        }

        fn load_frame(&self, id: &str, _target_size: u32) -> Result<DynamicImage, MediaError> {
            self.frames
                .get(id)
                .cloned()
                .ok_or_else(|| MediaError::FrameUnavailable {
                    id: id.to_string(),
                    reason: "no frame".to_string(),
                })
        }

        fn extract_keyframes(
            &self,
            id: &str,
            _count: usize,
        ) -> Result<Vec<DynamicImage>, MediaError> {
            Ok(self.keyframes.get(id).cloned().unwrap_or_default())
        }

        fn delete(&self, _ids: &[String]) -> Result<(), MediaError> {
            Ok(())
        }
    }

    fn pipeline_with(store: TestStore, settings: ScanSettings) -> ScanPipeline {
        ScanPipeline::builder()
            .store(Arc::new(store))
            .analysis(Arc::new(TestProvider))
            .settings(settings)
            .build()
            .unwrap()
    }

    /// Settings with blur disabled so solid test frames stay unflagged
    fn quiet_settings() -> ScanSettings {
        ScanSettings {
            blur_threshold: 0.0,
            ..ScanSettings::default()
        }
    }

    fn issues_of(outcome: &ScanOutcome, category: IssueCategory) -> Vec<&Issue> {
        outcome
            .issues
            .iter()
            .filter(|i| i.category == category)
            .collect()
    }

    #[test]
    fn threshold_to_distance_conversion() {
        assert!((max_distance_for(0.95) - 5.0).abs() < 1e-4);
        assert!((max_distance_for(0.80) - 20.0).abs() < 1e-4);
    }

    #[test]
    fn duplicate_pass_flags_non_canonical_members() {
        // red=0 and red=10 are 10 degrees apart: cos ~= 0.985, within the
        // duplicate cutoff. red=90 is orthogonal.
        let store = TestStore::new()
            .with_still("newest", Some(frame(0, 0, 255)))
            .with_still("copy", Some(frame(10, 0, 255)))
            .with_still("other", Some(frame(90, 0, 255)));

        let outcome = pipeline_with(store, quiet_settings()).run().unwrap();

        let duplicates = issues_of(&outcome, IssueCategory::Duplicate);
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].item_id, "copy");
        assert_eq!(duplicates[0].confidence, 0.95);
        assert!(duplicates[0].group_id.is_some());
        // The canonical first-seen member is never flagged
        assert!(!outcome.issues.iter().any(|i| i.item_id == "newest"));
    }

    #[test]
    fn duplicate_issues_carry_item_metadata() {
        let mut copy = test_item("copy", false);
        copy.file_size = 123_456;

        let store = TestStore::new()
            .with_still("original", Some(frame(0, 0, 255)))
            .with_item(copy, Some(frame(5, 0, 255)));

        let outcome = pipeline_with(store, quiet_settings()).run().unwrap();

        let duplicates = issues_of(&outcome, IssueCategory::Duplicate);
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].file_size, 123_456);
    }

    #[test]
    fn similar_pass_excludes_duplicate_claimed_items() {
        // a (180) and b (190) are 10 degrees apart: duplicates. c (150) and
        // d (210) both sit 30 degrees from a - close enough for the similar
        // pass, too far for the duplicate pass - while being 60 degrees from
        // each other and 40 from b.
        let store = TestStore::new()
            .with_still("a", Some(frame(180, 0, 255)))
            .with_still("b", Some(frame(190, 0, 255)))
            .with_still("c", Some(frame(150, 0, 255)))
            .with_still("d", Some(frame(210, 0, 255)));

        let outcome = pipeline_with(store, quiet_settings()).run().unwrap();

        let duplicates = issues_of(&outcome, IssueCategory::Duplicate);
        let similar = issues_of(&outcome, IssueCategory::Similar);

        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].item_id, "b");

        // The similar pass seeds at a and absorbs b, c, d; a and b are
        // claimed by the duplicate pass, so c becomes canonical of the
        // unclaimed remainder and only d is flagged.
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].item_id, "d");
        assert_eq!(similar[0].confidence, 0.85);
        assert_ne!(similar[0].group_id, duplicates[0].group_id);
    }

    #[test]
    fn similar_group_below_two_unclaimed_is_dropped() {
        // a/b duplicates; c similar to a but to nothing else unclaimed
        let store = TestStore::new()
            .with_still("a", Some(frame(0, 0, 255)))
            .with_still("b", Some(frame(10, 0, 255)))
            .with_still("c", Some(frame(30, 0, 255)));

        let outcome = pipeline_with(store, quiet_settings()).run().unwrap();

        assert_eq!(issues_of(&outcome, IssueCategory::Duplicate).len(), 1);
        assert!(issues_of(&outcome, IssueCategory::Similar).is_empty());
    }

    #[test]
    fn solid_frame_is_flagged_blurry_at_default_threshold() {
        let store = TestStore::new().with_still("flat", Some(frame(0, 0, 255)));

        let outcome = pipeline_with(store, ScanSettings::default()).run().unwrap();

        let blurry = issues_of(&outcome, IssueCategory::Blurry);
        assert_eq!(blurry.len(), 1);
        assert!(blurry[0].confidence > 0.99);
    }

    #[test]
    fn depth_effect_skips_blur_scoring() {
        let mut portrait = test_item("portrait", false);
        portrait.is_depth_effect = true;

        let store = TestStore::new().with_item(portrait, Some(frame(0, 0, 255)));
        let outcome = pipeline_with(store, ScanSettings::default()).run().unwrap();

        assert!(issues_of(&outcome, IssueCategory::Blurry).is_empty());
    }

    #[test]
    fn screenshot_flag_wins_over_heuristic() {
        let mut shot = test_item("shot", false);
        shot.is_screenshot = true;

        let store = TestStore::new().with_item(shot, Some(frame(0, 0, 255)));
        let outcome = pipeline_with(store, quiet_settings()).run().unwrap();

        let screenshots = issues_of(&outcome, IssueCategory::Screenshot);
        assert_eq!(screenshots.len(), 1);
        assert_eq!(screenshots[0].confidence, 1.0);
    }

    #[test]
    fn device_resolution_heuristic_flags_at_lower_confidence() {
        let mut suspicious = test_item("suspicious", false);
        suspicious.pixel_width = 1170;
        suspicious.pixel_height = 2532;
        suspicious.has_camera_metadata = false;

        let mut camera_shot = test_item("camera", false);
        camera_shot.pixel_width = 1170;
        camera_shot.pixel_height = 2532;
        camera_shot.has_camera_metadata = true;

        let store = TestStore::new()
            .with_item(suspicious, Some(frame(0, 0, 255)))
            .with_item(camera_shot, Some(frame(90, 0, 255)));
        let outcome = pipeline_with(store, quiet_settings()).run().unwrap();

        let screenshots = issues_of(&outcome, IssueCategory::Screenshot);
        assert_eq!(screenshots.len(), 1);
        assert_eq!(screenshots[0].item_id, "suspicious");
        assert_eq!(screenshots[0].confidence, 0.9);
    }

    #[test]
    fn metadata_checks_run_without_a_frame() {
        let mut shot = test_item("no_frame_shot", false);
        shot.is_screenshot = true;

        // No frame registered: the load fails and frame checks are skipped
        let store = TestStore::new().with_item(shot, None);
        let outcome = pipeline_with(store, ScanSettings::default()).run().unwrap();

        assert_eq!(issues_of(&outcome, IssueCategory::Screenshot).len(), 1);
        assert!(issues_of(&outcome, IssueCategory::Blurry).is_empty());
        assert_eq!(outcome.progress.processed, 1);
    }

    #[test]
    fn text_heavy_confidence_is_doubled_coverage_capped() {
        // green 128 -> coverage ~0.502 -> confidence capped at 1.0
        let store = TestStore::new().with_still("doc", Some(frame(0, 128, 255)));
        let outcome = pipeline_with(store, quiet_settings()).run().unwrap();

        let text_heavy = issues_of(&outcome, IssueCategory::TextHeavy);
        assert_eq!(text_heavy.len(), 1);
        assert_eq!(text_heavy[0].confidence, 1.0);
    }

    #[test]
    fn low_quality_attaches_scene_tags_and_raw_score() {
        // blue 0 -> aesthetics -1.0, far below the -0.3 default
        let store = TestStore::new().with_still("ugly", Some(frame(0, 0, 0)));
        let outcome = pipeline_with(store, quiet_settings()).run().unwrap();

        let low_quality = issues_of(&outcome, IssueCategory::LowQuality);
        assert_eq!(low_quality.len(), 1);
        assert!((low_quality[0].confidence - 1.0).abs() < 1e-6);
        assert_eq!(low_quality[0].scene_tags, vec!["test_scene".to_string()]);
        assert_eq!(low_quality[0].aesthetics_score, Some(-1.0));
    }

    #[test]
    fn unsupported_lens_smudge_degrades_silently() {
        let store = TestStore::new().with_still("fine", Some(frame(0, 0, 255)));
        let outcome = pipeline_with(store, quiet_settings()).run().unwrap();

        assert!(issues_of(&outcome, IssueCategory::LensSmudge).is_empty());
    }

    #[test]
    fn screen_recording_is_flagged_and_still_processed() {
        let mut recording = test_item("recording", true);
        recording.is_screen_recording = true;

        let store = TestStore::new().with_video(recording, vec![frame(0, 0, 255)]);
        let outcome = pipeline_with(store, quiet_settings()).run().unwrap();

        let recordings = issues_of(&outcome, IssueCategory::ScreenRecording);
        assert_eq!(recordings.len(), 1);
        assert_eq!(recordings[0].confidence, 1.0);
        assert!(recordings[0].is_video);
    }

    #[test]
    fn video_keyframe_descriptor_joins_clustering() {
        let video = test_item("clip", true);
        let store = TestStore::new()
            .with_video(video, vec![frame(0, 0, 255)])
            .with_still("still_twin", Some(frame(5, 0, 255)));

        let outcome = pipeline_with(store, quiet_settings()).run().unwrap();

        let duplicates = issues_of(&outcome, IssueCategory::Duplicate);
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].item_id, "still_twin");
    }

    #[test]
    fn video_without_keyframes_gets_metadata_only_processing() {
        let video = test_item("opaque_clip", true);
        let store = TestStore::new().with_video(video, Vec::new());

        let outcome = pipeline_with(store, ScanSettings::default()).run().unwrap();

        assert!(outcome.issues.is_empty());
        assert_eq!(outcome.progress.processed, 1);
    }

    #[test]
    fn group_id_set_iff_clustering_category() {
        let mut shot = test_item("shot", false);
        shot.is_screenshot = true;

        let store = TestStore::new()
            .with_item(shot, Some(frame(0, 0, 255)))
            .with_still("a", Some(frame(40, 0, 255)))
            .with_still("b", Some(frame(45, 0, 255)));

        let outcome = pipeline_with(store, quiet_settings()).run().unwrap();

        for issue in &outcome.issues {
            let clustered = matches!(
                issue.category,
                IssueCategory::Duplicate | IssueCategory::Similar
            );
            assert_eq!(issue.group_id.is_some(), clustered, "{:?}", issue.category);
        }
    }

    #[test]
    fn cancelled_scan_returns_no_partial_result() {
        let store = TestStore::new().with_still("a", Some(frame(0, 0, 255)));
        let pipeline = pipeline_with(store, quiet_settings());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = pipeline.run_with_events(&null_sender(), &cancel);
        assert!(matches!(
            result,
            Err(TriageError::Scan(ScanError::Cancelled))
        ));
    }

    #[test]
    fn progress_events_fire_per_item() {
        let store = TestStore::new()
            .with_still("a", Some(frame(0, 0, 255)))
            .with_still("b", Some(frame(90, 0, 255)))
            .with_still("c", Some(frame(150, 0, 255)));

        let pipeline = pipeline_with(store, quiet_settings());
        let (sender, receiver) = EventChannel::new();
        pipeline
            .run_with_events(&sender, &CancellationToken::new())
            .unwrap();
        drop(sender);

        let progress_updates: Vec<ScanProgress> = receiver
            .iter()
            .filter_map(|event| match event {
                Event::Scan(ScanEvent::Progress(p)) => Some(p),
                _ => None,
            })
            .collect();

        // One per item plus the final snapshot
        assert_eq!(progress_updates.len(), 4);
        assert_eq!(progress_updates[0].processed, 1);
        assert_eq!(progress_updates[2].processed, 3);
        assert_eq!(progress_updates.last().unwrap().fraction(), 1.0);
    }

    #[test]
    fn empty_library_completes_with_empty_outcome() {
        let outcome = pipeline_with(TestStore::new(), ScanSettings::default())
            .run()
            .unwrap();

        assert_eq!(outcome.total_items, 0);
        assert!(outcome.issues.is_empty());
        assert_eq!(outcome.progress.fraction(), 0.0);
    }

    #[test]
    fn all_issues_default_to_pending() {
        let store = TestStore::new()
            .with_still("a", Some(frame(0, 0, 0)))
            .with_still("b", Some(frame(10, 128, 255)));

        let outcome = pipeline_with(store, quiet_settings()).run().unwrap();

        assert!(!outcome.issues.is_empty());
        assert!(outcome
            .issues
            .iter()
            .all(|i| i.decision == Decision::Pending));
    }
}
