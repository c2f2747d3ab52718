//! Claimwarden: issue-assignment lifecycle reconciler.
//!
//! Contributors claim issues with comment commands. Claimwarden keeps the
//! tracker's assignees and claim labels consistent with that intent and
//! expires claims that go quiet. It also hands abandoned work to new
//! contributors and gives a claimant a grace window after an unmerged close.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: pure decisions over tracker snapshots, no I/O
//! - **Ports**: the [`tracker::ports::IssueTracker`] and
//!   [`notify::ChatNotifier`] traits
//! - **Adapters**: GitHub REST, Slack-compatible webhooks and in-memory
//!   doubles
//!
//! # Modules
//!
//! - [`tracker`]: identifiers, work items and the tracker port
//! - [`notify`]: best-effort chat notifications
//! - [`assignment`]: claim state machine, sweeps, takeover and grace windows
//! - [`bounty`]: `/bounty $N` commands and bounty labels
//! - [`config`]: reconciler settings

pub mod assignment;
pub mod bounty;
pub mod config;
pub mod notify;
pub mod tracker;
