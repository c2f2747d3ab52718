//! Behaviour tests for claiming, stale release and grace windows.

#[path = "claim_lifecycle_steps/mod.rs"]
mod claim_lifecycle_steps_defs;

use claim_lifecycle_steps_defs::world::{ClaimWorld, world};
use rstest_bdd_macros::scenario;

#[scenario(
    path = "tests/features/claim_lifecycle.feature",
    name = "A contributor claims an open issue"
)]
#[tokio::test(flavor = "multi_thread")]
async fn contributor_claims_open_issue(world: ClaimWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/claim_lifecycle.feature",
    name = "A stale claim is released by the sweep"
)]
#[tokio::test(flavor = "multi_thread")]
async fn stale_claim_is_released(world: ClaimWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/claim_lifecycle.feature",
    name = "A recent claim survives the sweep"
)]
#[tokio::test(flavor = "multi_thread")]
async fn recent_claim_survives(world: ClaimWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/claim_lifecycle.feature",
    name = "Only the claimant can release a claim"
)]
#[tokio::test(flavor = "multi_thread")]
async fn only_claimant_releases(world: ClaimWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/claim_lifecycle.feature",
    name = "An unmerged close opens a grace window that expires"
)]
#[tokio::test(flavor = "multi_thread")]
async fn grace_window_expires(world: ClaimWorld) {
    let _ = world;
}
