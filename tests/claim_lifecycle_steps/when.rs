//! When steps for claim lifecycle BDD scenarios.

use super::world::{ClaimWorld, run_async};
use chrono::Duration;
use claimwarden::assignment::domain::{ChangeRequestAction, ChangeRequestEvent, Trigger};
use claimwarden::tracker::{domain::PullRequestNumber, ports::IssueTracker};
use mockable::Clock;
use rstest_bdd_macros::when;

#[when(r#""{actor}" comments "{text}" on issue #{number:u64}"#)]
fn comments(
    world: &mut ClaimWorld,
    actor: String,
    text: String,
    number: u64,
) -> Result<(), eyre::Report> {
    world.comment(&actor, &text, number)
}

#[when("{hours:i64} hours pass")]
fn hours_pass(world: &mut ClaimWorld, hours: i64) {
    world.clock.advance(Duration::hours(hours));
}

#[when("the scheduled sweep runs")]
fn sweep_runs(world: &mut ClaimWorld) -> Result<(), eyre::Report> {
    world.reconcile(Trigger::ScheduledSweep)
}

#[when("change request #{pr:u64} is closed without merging")]
fn closed_without_merging(world: &mut ClaimWorld, pr: u64) -> Result<(), eyre::Report> {
    let stored = run_async(world.tracker.get_change_request(PullRequestNumber::new(pr)?))?;
    let closed = stored.closed(false, world.clock.utc());
    world.tracker.insert_change_request(closed.clone())?;
    world.reconcile(Trigger::ChangeRequestEvent(ChangeRequestEvent {
        action: ChangeRequestAction::Closed,
        change_request: closed,
    }))
}
