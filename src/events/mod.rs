//! # Events Module
//!
//! Event-driven progress reporting for the triage engine.
//!
//! The engine emits [`Event`]s through an [`EventSender`] while it runs;
//! any consumer (CLI progress bar, GUI, tests) reads them from the paired
//! [`EventReceiver`]. Senders never block the engine: if nobody listens,
//! events are dropped.

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::{ClusterEvent, ClusterPass, Event, ScanEvent, ScanSummary};
