//! Applies state-machine mutations through the tracker, in order.

use crate::assignment::domain::Mutation;
use crate::tracker::{
    domain::IssueNumber,
    ports::{IssueTracker, TrackerResult},
};
use std::slice;

/// Applies `mutations` to `item`, stopping at the first failure.
pub(crate) async fn apply_mutations<T>(
    tracker: &T,
    item: IssueNumber,
    mutations: &[Mutation],
) -> TrackerResult<()>
where
    T: IssueTracker + ?Sized,
{
    for mutation in mutations {
        match mutation {
            Mutation::AddAssignee(login) => {
                tracker.add_assignees(item, slice::from_ref(login)).await?;
            }
            Mutation::RemoveAssignee(login) => {
                tracker.remove_assignees(item, slice::from_ref(login)).await?;
            }
            Mutation::AddLabel(label) => tracker.add_label(item, label).await?,
            Mutation::RemoveLabel(label) => tracker.remove_label(item, label).await?,
        }
    }
    Ok(())
}
