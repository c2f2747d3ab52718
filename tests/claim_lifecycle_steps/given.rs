//! Given steps for claim lifecycle BDD scenarios.

use super::world::{ClaimWorld, REPOSITORY};
use claimwarden::tracker::domain::{
    ChangeRequest, CrossReferenceSource, IssueNumber, Login, PullRequestNumber,
    RepositoryFullName, TimelineEvent,
};
use eyre::WrapErr;
use mockable::Clock;
use rstest_bdd_macros::given;

#[given("an open issue #{number:u64}")]
fn open_issue(world: &mut ClaimWorld, number: u64) -> Result<(), eyre::Report> {
    world.seed(number)
}

#[given(r#""{actor}" has claimed issue #{number:u64}"#)]
fn has_claimed(world: &mut ClaimWorld, actor: String, number: u64) -> Result<(), eyre::Report> {
    world
        .comment(&actor, "/assign", number)
        .wrap_err("claim in scenario setup")
}

#[given(r#""{author}" opened change request #{pr:u64} fixing issue #{number:u64}"#)]
fn opened_change_request(
    world: &mut ClaimWorld,
    author: String,
    pr: u64,
    number: u64,
) -> Result<(), eyre::Report> {
    let change_request = ChangeRequest::new(
        PullRequestNumber::new(pr)?,
        RepositoryFullName::new(REPOSITORY)?,
        Login::new(author)?,
        world.clock.utc(),
    )
    .with_body(format!("Fixes #{number}"));
    world.tracker.record_event(
        IssueNumber::new(number)?,
        TimelineEvent::CrossReferenced {
            source: CrossReferenceSource {
                number: pr,
                repository: REPOSITORY.to_owned(),
                is_change_request: true,
            },
            created_at: world.clock.utc(),
        },
    )?;
    world.tracker.insert_change_request(change_request)?;
    Ok(())
}
