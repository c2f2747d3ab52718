//! Pure claim-lifecycle domain: no I/O, no clock reads.

mod grace;
mod intent;
mod notice;
mod staleness;
mod state;
mod trigger;

pub use grace::{GRACE_MARKER_TOKEN, GraceMarker};
pub use intent::{ActorKind, Command, CommandIntent, classify_command, classify_intent};
pub use notice::{Notice, NoticeKey, NoticeKind, NoticeTimings};
pub use staleness::is_stale;
pub use state::{
    ClaimEvent, ClaimGuard, ClaimLabels, Divergence, LogicalState, Mutation, Outcome, Projection,
    Transition, project, transition,
};
pub use trigger::{ChangeRequestAction, ChangeRequestEvent, CommentEvent, Trigger};
