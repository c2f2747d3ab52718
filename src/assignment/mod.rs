//! Claim lifecycle for work items.
//!
//! Contributors claim and release items with comment commands. Stale claims
//! are released by a scheduled sweep, claims whose change request closed
//! unmerged get a grace window, and abandoned claims may be taken over.
//! All durable state lives on the tracker as labels, assignees and marker
//! comments. The module follows hexagonal architecture:
//!
//! - Pure state projection and transitions in [`domain`]
//! - Orchestration services in [`services`]
//! - Webhook parsing in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod services;

#[cfg(test)]
mod tests;
