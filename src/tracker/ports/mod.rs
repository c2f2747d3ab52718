//! Port contracts for the external issue tracker.
//!
//! Ports define infrastructure-agnostic interfaces used by the reconciler
//! services.

pub mod tracker;

pub use tracker::{IssueTracker, TrackerError, TrackerResult};
