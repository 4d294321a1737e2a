//! Animation sampling and compression.
//!
//! Samplers record one value per frame while the exporter steps through the
//! frame range. Exporting a sampler consumes it and yields spline-linear
//! [`AnimationChannel`]s with redundant samples removed.

mod channel;
mod sample;
mod sampler;

pub use channel::{AnimationChannel, TARGET_MORPH_TARGET, TARGET_SCENE_NODE};
pub use sample::{remove_redundant_samples, Sample, SampleValue};
pub use sampler::{frame_target_name, BakedMorphSampler, TransformEntity, TransformSampler, WeightSampler};
