//! Then steps for claim lifecycle BDD scenarios.

use super::world::{BOT_LOGIN, ClaimWorld};
use claimwarden::tracker::domain::{IssueNumber, Login};
use rstest_bdd_macros::then;

#[then(r#"issue #{number:u64} is assigned to "{login}""#)]
fn is_assigned_to(world: &ClaimWorld, number: u64, login: String) -> Result<(), eyre::Report> {
    let item = world.item(number)?;
    let expected = [Login::new(login)?];
    if item.assignees() != expected.as_slice() {
        return Err(eyre::eyre!(
            "expected assignees {expected:?}, found {:?}",
            item.assignees()
        ));
    }
    Ok(())
}

#[then("issue #{number:u64} has no assignees")]
fn has_no_assignees(world: &ClaimWorld, number: u64) -> Result<(), eyre::Report> {
    let item = world.item(number)?;
    if !item.assignees().is_empty() {
        return Err(eyre::eyre!("expected no assignees, found {:?}", item.assignees()));
    }
    Ok(())
}

#[then(r#"issue #{number:u64} carries the "{label}" label"#)]
fn carries_label(world: &ClaimWorld, number: u64, label: String) -> Result<(), eyre::Report> {
    let item = world.item(number)?;
    if !item.has_label(&label) {
        return Err(eyre::eyre!("expected label {label}, found {:?}", item.labels()));
    }
    Ok(())
}

#[then(r#"issue #{number:u64} has {count:usize} notice containing "{needle}""#)]
fn notice_count(
    world: &ClaimWorld,
    number: u64,
    count: usize,
    needle: String,
) -> Result<(), eyre::Report> {
    let found = world
        .tracker
        .comments(IssueNumber::new(number)?)?
        .iter()
        .filter(|comment| comment.author.as_str() == BOT_LOGIN && comment.contains(&needle))
        .count();
    if found != count {
        return Err(eyre::eyre!(
            "expected {count} notices containing {needle:?}, found {found}"
        ));
    }
    Ok(())
}
