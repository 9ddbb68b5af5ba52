pub mod butt;
pub mod end_cap;
pub mod fillet;
pub mod kernel_ext;
pub mod pairing;
pub mod scratch;
pub mod sketch;
pub mod types;

pub use end_cap::{match_end_caps, EndTreatment};
pub use kernel_ext::KernelBundle;
pub use pairing::{expand_faces, fillet_candidates, match_butt_edge, ButtMatch, FacePairCandidate, PairKind};
pub use scratch::delete_scratch;
pub use sketch::{sketch_profile, SketchedProfile};
pub use types::*;

/// Plan a fillet weld between two face sets.
pub use fillet::synthesize as synthesize_fillet;

/// Plan butt welds along weld-line edges.
pub use butt::synthesize as synthesize_butt;
