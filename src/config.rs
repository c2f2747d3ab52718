//! Reconciler configuration.
//!
//! Values come from builder setters or from the environment through
//! [`ReconcilerConfig::from_env`], which takes the lookup function as a
//! parameter so tests never touch process state.

use crate::assignment::domain::{ClaimLabels, NoticeTimings};
use crate::tracker::domain::{RepositoryFullName, TrackerDomainError};
use chrono::Duration;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is absent.
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// A variable could not be parsed.
    #[error("invalid value '{value}' for {name}: {reason}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The repository name is malformed.
    #[error(transparent)]
    Repository(#[from] TrackerDomainError),
}

/// Settings shared by every reconciler component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    repository: RepositoryFullName,
    claim_label: String,
    pending_label: String,
    stale_after: Duration,
    grace_window: Duration,
    takeover_after: Duration,
    claim_limit: usize,
    max_concurrency: usize,
    bounty_label_prefix: String,
    chat_channel: Option<String>,
}

impl ReconcilerConfig {
    /// Creates a configuration with default policy for `repository`.
    #[must_use]
    pub fn new(repository: RepositoryFullName) -> Self {
        Self {
            repository,
            claim_label: "assigned".to_owned(),
            pending_label: "pending-unassignment".to_owned(),
            stale_after: Duration::hours(24),
            grace_window: Duration::hours(12),
            takeover_after: Duration::days(60),
            claim_limit: 1,
            max_concurrency: 4,
            bounty_label_prefix: "$".to_owned(),
            chat_channel: None,
        }
    }

    /// Loads configuration through `lookup`.
    ///
    /// Reads `GITHUB_REPOSITORY` and the optional overrides
    /// `CLAIMWARDEN_CLAIM_LABEL`, `CLAIMWARDEN_PENDING_LABEL`,
    /// `CLAIMWARDEN_STALE_HOURS`, `CLAIMWARDEN_GRACE_HOURS`,
    /// `CLAIMWARDEN_TAKEOVER_DAYS`, `CLAIMWARDEN_CLAIM_LIMIT`,
    /// `CLAIMWARDEN_CONCURRENCY`, `CLAIMWARDEN_BOUNTY_PREFIX` and
    /// `CLAIMWARDEN_CHAT_CHANNEL`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the repository is missing or any value
    /// is malformed.
    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let repository =
            lookup("GITHUB_REPOSITORY").ok_or(ConfigError::Missing("GITHUB_REPOSITORY"))?;
        let mut config = Self::new(RepositoryFullName::new(repository)?);

        if let Some(label) = non_blank(&lookup, "CLAIMWARDEN_CLAIM_LABEL")? {
            config = config.with_claim_label(label);
        }
        if let Some(label) = non_blank(&lookup, "CLAIMWARDEN_PENDING_LABEL")? {
            config = config.with_pending_label(label);
        }
        if let Some(hours) = positive(&lookup, "CLAIMWARDEN_STALE_HOURS")? {
            let threshold = duration("CLAIMWARDEN_STALE_HOURS", hours, Duration::try_hours)?;
            config = config.with_stale_after(threshold);
        }
        if let Some(hours) = positive(&lookup, "CLAIMWARDEN_GRACE_HOURS")? {
            let window = duration("CLAIMWARDEN_GRACE_HOURS", hours, Duration::try_hours)?;
            config = config.with_grace_window(window);
        }
        if let Some(days) = positive(&lookup, "CLAIMWARDEN_TAKEOVER_DAYS")? {
            let threshold = duration("CLAIMWARDEN_TAKEOVER_DAYS", days, Duration::try_days)?;
            config = config.with_takeover_after(threshold);
        }
        if let Some(limit) = positive(&lookup, "CLAIMWARDEN_CLAIM_LIMIT")? {
            config = config.with_claim_limit(to_usize("CLAIMWARDEN_CLAIM_LIMIT", limit)?);
        }
        if let Some(workers) = positive(&lookup, "CLAIMWARDEN_CONCURRENCY")? {
            config = config.with_max_concurrency(to_usize("CLAIMWARDEN_CONCURRENCY", workers)?);
        }
        if let Some(prefix) = non_blank(&lookup, "CLAIMWARDEN_BOUNTY_PREFIX")? {
            config = config.with_bounty_label_prefix(prefix);
        }
        if let Some(channel) = non_blank(&lookup, "CLAIMWARDEN_CHAT_CHANNEL")? {
            config = config.with_chat_channel(channel);
        }
        Ok(config)
    }

    /// Sets the claimed label.
    #[must_use]
    pub fn with_claim_label(mut self, label: impl Into<String>) -> Self {
        self.claim_label = label.into();
        self
    }

    /// Sets the pending-unassignment label.
    #[must_use]
    pub fn with_pending_label(mut self, label: impl Into<String>) -> Self {
        self.pending_label = label.into();
        self
    }

    /// Sets the staleness threshold measured from the assignment event.
    #[must_use]
    pub const fn with_stale_after(mut self, threshold: Duration) -> Self {
        self.stale_after = threshold;
        self
    }

    /// Sets the grace window measured from the marker comment.
    #[must_use]
    pub const fn with_grace_window(mut self, window: Duration) -> Self {
        self.grace_window = window;
        self
    }

    /// Sets the change-request age beyond which a claim may be taken over.
    #[must_use]
    pub const fn with_takeover_after(mut self, threshold: Duration) -> Self {
        self.takeover_after = threshold;
        self
    }

    /// Sets how many claims without an open change request a contributor
    /// may hold.
    #[must_use]
    pub fn with_claim_limit(mut self, limit: usize) -> Self {
        self.claim_limit = limit.max(1);
        self
    }

    /// Sets the number of items reconciled concurrently during a sweep.
    #[must_use]
    pub fn with_max_concurrency(mut self, workers: usize) -> Self {
        self.max_concurrency = workers.max(1);
        self
    }

    /// Sets the bounty label prefix.
    #[must_use]
    pub fn with_bounty_label_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.bounty_label_prefix = prefix.into();
        self
    }

    /// Routes chat notifications to a named channel.
    #[must_use]
    pub fn with_chat_channel(mut self, channel: impl Into<String>) -> Self {
        self.chat_channel = Some(channel.into());
        self
    }

    /// Returns the repository.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryFullName {
        &self.repository
    }

    /// Returns the claimed label.
    #[must_use]
    pub fn claim_label(&self) -> &str {
        &self.claim_label
    }

    /// Returns the pending-unassignment label.
    #[must_use]
    pub fn pending_label(&self) -> &str {
        &self.pending_label
    }

    /// Returns both state labels.
    #[must_use]
    pub fn labels(&self) -> ClaimLabels {
        ClaimLabels::new(self.claim_label.clone(), self.pending_label.clone())
    }

    /// Returns the staleness threshold.
    #[must_use]
    pub const fn stale_after(&self) -> Duration {
        self.stale_after
    }

    /// Returns the grace window.
    #[must_use]
    pub const fn grace_window(&self) -> Duration {
        self.grace_window
    }

    /// Returns the takeover threshold.
    #[must_use]
    pub const fn takeover_after(&self) -> Duration {
        self.takeover_after
    }

    /// Returns the claim limit.
    #[must_use]
    pub const fn claim_limit(&self) -> usize {
        self.claim_limit
    }

    /// Returns the sweep worker count.
    #[must_use]
    pub const fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Returns the bounty label prefix.
    #[must_use]
    pub fn bounty_label_prefix(&self) -> &str {
        &self.bounty_label_prefix
    }

    /// Returns the chat channel override.
    #[must_use]
    pub fn chat_channel(&self) -> Option<&str> {
        self.chat_channel.as_deref()
    }

    /// Returns the durations quoted in notices.
    #[must_use]
    pub fn notice_timings(&self) -> NoticeTimings {
        NoticeTimings {
            stale_hours: self.stale_after.num_hours(),
            grace_hours: self.grace_window.num_hours(),
            takeover_days: self.takeover_after.num_days(),
        }
    }
}

fn non_blank(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<String>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Err(ConfigError::Invalid {
            name,
            value,
            reason: "must not be blank".to_owned(),
        }),
        Some(value) => Ok(Some(value.trim().to_owned())),
    }
}

fn positive(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<i64>, ConfigError> {
    let Some(value) = lookup(name) else {
        return Ok(None);
    };
    match value.trim().parse::<i64>() {
        Ok(parsed) if parsed > 0 => Ok(Some(parsed)),
        Ok(_) => Err(ConfigError::Invalid {
            name,
            value,
            reason: "must be positive".to_owned(),
        }),
        Err(err) => Err(ConfigError::Invalid {
            name,
            value,
            reason: err.to_string(),
        }),
    }
}

fn duration(
    name: &'static str,
    value: i64,
    build: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError> {
    build(value).ok_or_else(|| ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: "duration out of range".to_owned(),
    })
}

fn to_usize(name: &'static str, value: i64) -> Result<usize, ConfigError> {
    usize::try_from(value).map_err(|err| ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: err.to_string(),
    })
}
