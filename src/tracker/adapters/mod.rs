//! Tracker adapters.
//!
//! - [`memory::InMemoryIssueTracker`]: shared-state tracker with failure
//!   injection, used by tests and dry runs
//! - [`github::GitHubIssueTracker`]: single-attempt GitHub REST client

pub mod github;
pub mod memory;
