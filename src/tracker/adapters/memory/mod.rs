//! In-memory tracker adapter and manual clock.

mod clock;
mod tracker;

pub use clock::ManualClock;
pub use tracker::{InMemoryIssueTracker, RecordedMutation, TrackerOperation};
