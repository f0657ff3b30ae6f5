//! detdecode turns raw object-detection tensors into labeled boxes.
//!
//! The crate sits between an inference engine and the code that consumes
//! detections. Given the model's output arrays and a label table it resolves
//! which output holds boxes, scores and classes, decodes candidates into
//! original-image pixels, keeps allow-listed labels above a confidence
//! threshold and removes duplicates with per-label non-maximum suppression.
//! Parallel batch decoding is available with the `rayon` feature and span
//! instrumentation with the `tracing` feature.

pub mod decode;
mod detection;
pub mod filter;
pub mod labels;
pub mod lowlevel;
pub mod nms;
pub mod observe;
pub mod pipeline;
pub mod roles;
pub mod tensor;
mod trace;
pub mod util;

pub use decode::{BoxCoordinates, Candidate, ClampPolicy, DecodeConfig, ImageSize};
pub use detection::Detection;
pub use filter::{AllowList, ClassFilter};
pub use labels::LabelTable;
pub use nms::{suppress, IouThresholds};
pub use observe::{DetectionObserver, PipelineEvent, Rejection};
pub use pipeline::{DetectionPipeline, PipelineConfig};
pub use roles::{
    ByName, ByPosition, ByShape, NameThenShape, ResolvedRoles, RoleResolver, RoleStrategy,
};
pub use tensor::{OutputMap, OwnedTensor, TensorView};
pub use util::{DetDecodeError, DetDecodeResult};
