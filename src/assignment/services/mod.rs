//! Claim-lifecycle services: resolution, policy, state transitions,
//! takeover, grace periods and the top-level reconciler.

mod claims;
mod error;
mod grace;
pub(crate) mod mutations;
mod notices;
mod policy;
mod reconciler;
mod resolver;
mod takeover;

pub use claims::{AssignmentParts, AssignmentService};
pub use error::{NoticeError, ReconcileError, ReconcileResult};
pub use grace::GracePeriodReconciler;
pub use notices::{NoticeBoard, NoticeRenderer};
pub use policy::ClaimPolicy;
pub use reconciler::{ItemAction, ItemReport, ReconcileReport, Reconciler};
pub use resolver::{LinkedChangeRequest, LinkedChangeRequests, LinkedItemResolver};
pub use takeover::{TakeoverOutcome, TakeoverTransaction};
