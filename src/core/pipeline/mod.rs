//! # Pipeline Module
//!
//! Orchestrates a full triage scan.
//!
//! ## Scan Stages
//! 1. **Enumerate** - fetch all media items from the store, newest first
//! 2. **Detect** - run every per-item detector in fixed-size batches,
//!    collecting content descriptors along the way
//! 3. **Cluster** - after all items are processed, group descriptors into
//!    duplicate groups, then similar groups
//!
//! The per-item detectors are best-effort: a failing or unsupported detector
//! contributes no issue and the scan continues. Clustering is a hard
//! barrier - it only ever sees the complete descriptor set.

mod executor;

pub use executor::{CancellationToken, ScanOutcome, ScanPipeline, ScanPipelineBuilder};
