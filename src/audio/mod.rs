//! Audio normalization layer
//!
//! - Canonical PCM segment representation and WAV decoding
//! - Sample rate conversion (rubato sinc interpolation)
//! - Final RIFF/WAVE container encoding

pub mod resampler;
pub mod segment;
pub mod wav;

pub use resampler::conform;
pub use segment::{segment_from_f32, AudioSegment};
pub use wav::{encode_wav_i16, encode_wav_pcm16};
