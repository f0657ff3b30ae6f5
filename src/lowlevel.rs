//! Low-level building blocks for custom detection pipelines.
//!
//! These expose the individual stages behind `DetectionPipeline` for callers
//! that need to interleave their own logic, for example decoding once and
//! filtering against several allow-lists. Most users should prefer
//! `DetectionPipeline`.

pub use crate::decode::{candidate_count, decode_candidates, decode_candidates_with};
pub use crate::filter::ClassFilter;
pub use crate::nms::suppress;
pub use crate::roles::{ByName, ByPosition, ByShape, NameThenShape, ResolvedRoles, RoleResolver};
