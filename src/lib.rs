//! # Photo Triage
//!
//! Triage a large media library: flag duplicates, near-duplicates, blurry
//! shots, screenshots, screen recordings, text-heavy captures, low-quality
//! photos and lens smudges, then let a human review and delete.
//!
//! ## Core Philosophy
//! - **Never auto-delete** - every removal goes through an explicit,
//!   undoable review
//! - **Degrade, don't abort** - a failing detector or unreadable item costs
//!   one signal, never the scan
//! - **UI-agnostic** - the engine reports progress over an event channel
//!   and leaves rendering to the caller
//!
//! ## Architecture
//! - `core` - the scan, clustering and review engine
//! - `events` - event-driven progress reporting (GUI-ready)
//! - `error` - user-friendly error types

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{Result, TriageError};

/// Initialize tracing for the library
///
/// This should be called by the application entry point (CLI or GUI).
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
