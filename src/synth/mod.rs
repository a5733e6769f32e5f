//! Synthesis orchestration: segmentation, dispatch, assembly

pub mod orchestrator;
pub mod segment;

pub use orchestrator::{Orchestrator, SynthesisRequest};
pub use segment::{segment_plain, segment_ssml, SynthesisUnit};
