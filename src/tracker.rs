mod detection;
mod identity;
mod matching;
mod reconcile;
mod rect;

pub use detection::Detection;
pub use identity::{IdSequence, IdentityId, IdentityStore, TrackedIdentity};
pub use matching::{AssignmentResult, MatchPolicy, associate, best_iou, first_intersecting, linear_assignment};
pub use reconcile::{Reconciliation, reconcile, refine};
pub use rect::{Rect, iou_batch};
