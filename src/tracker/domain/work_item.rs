//! Work item aggregate as observed on the external tracker.

use super::{IssueNumber, Login, TrackerDomainError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Open or closed state of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// The item accepts new claims.
    Open,
    /// The item was closed; no further transitions apply.
    Closed,
}

impl ItemState {
    /// Returns the canonical tracker representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl TryFrom<&str> for ItemState {
    type Error = TrackerDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(TrackerDomainError::UnknownItemState(value.to_owned())),
        }
    }
}

/// A tracked unit of work (an issue).
///
/// The tracker is the only store: labels and assignees carry all durable
/// claim state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    number: IssueNumber,
    state: ItemState,
    labels: BTreeSet<String>,
    assignees: Vec<Login>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkItem {
    /// Creates an open item with no labels or assignees.
    #[must_use]
    pub const fn new(number: IssueNumber, created_at: DateTime<Utc>) -> Self {
        Self {
            number,
            state: ItemState::Open,
            labels: BTreeSet::new(),
            assignees: Vec::new(),
            created_at,
            updated_at: created_at,
        }
    }

    /// Sets the item state.
    #[must_use]
    pub const fn with_state(mut self, state: ItemState) -> Self {
        self.state = state;
        self
    }

    /// Sets item labels, dropping blank names.
    #[must_use]
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels
            .into_iter()
            .map(Into::into)
            .map(|label| label.trim().to_owned())
            .filter(|label| !label.is_empty())
            .collect();
        self
    }

    /// Sets item assignees, dropping duplicates while keeping order.
    #[must_use]
    pub fn with_assignees(mut self, assignees: impl IntoIterator<Item = Login>) -> Self {
        let mut seen = BTreeSet::new();
        self.assignees = assignees
            .into_iter()
            .filter(|login| seen.insert(login.clone()))
            .collect();
        self
    }

    /// Sets the last-updated timestamp.
    #[must_use]
    pub const fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Returns the item number.
    #[must_use]
    pub const fn number(&self) -> IssueNumber {
        self.number
    }

    /// Returns the item state.
    #[must_use]
    pub const fn state(&self) -> ItemState {
        self.state
    }

    /// Returns `true` when the item is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == ItemState::Open
    }

    /// Returns the label names.
    #[must_use]
    pub const fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    /// Returns `true` when the label is present.
    #[must_use]
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.contains(name)
    }

    /// Returns the assignees in tracker order.
    #[must_use]
    pub fn assignees(&self) -> &[Login] {
        &self.assignees
    }

    /// Returns `true` when `login` is among the assignees.
    #[must_use]
    pub fn is_assigned_to(&self, login: &Login) -> bool {
        self.assignees.contains(login)
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last-updated timestamp.
    ///
    /// Never used as a staleness anchor: unrelated activity moves it.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
