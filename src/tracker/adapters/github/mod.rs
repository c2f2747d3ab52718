//! GitHub REST adapter for the [`IssueTracker`] port.
//!
//! [`IssueTracker`]: crate::tracker::ports::IssueTracker

mod client;
pub(crate) mod models;

#[cfg(test)]
pub(crate) use client::classify_failure;
pub use client::{GitHubIssueTracker, GitHubSetupError, GitHubTrackerConfig};
