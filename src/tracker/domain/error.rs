//! Error types for tracker value validation and parsing.

use thiserror::Error;

/// Errors returned while constructing tracker domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackerDomainError {
    /// The repository name does not follow `owner/repo` format.
    #[error("invalid repository name '{0}', expected owner/repo")]
    InvalidRepository(String),

    /// The issue number is invalid.
    #[error("invalid issue number {0}, expected a positive integer")]
    InvalidIssueNumber(u64),

    /// The pull request number is invalid.
    #[error("invalid pull request number {0}, expected a positive integer")]
    InvalidPullRequestNumber(u64),

    /// The login is empty or contains whitespace.
    #[error("invalid login '{0}'")]
    InvalidLogin(String),

    /// The change request state string is unknown.
    #[error("unknown change request state: {0}")]
    UnknownChangeRequestState(String),

    /// The item state string is unknown.
    #[error("unknown item state: {0}")]
    UnknownItemState(String),
}
