//! Neural synthesis pipeline
//!
//! Shared machinery for the ONNX-based engines: phoneme encoding, espeak
//! phonemization, acoustic model and vocoder inference, mel transforms,
//! and spectral-subtraction denoising.

pub mod audio;
pub mod denoiser;
pub mod phonemes;
pub mod phonemizer;
pub mod pipeline;

pub use denoiser::Denoiser;
pub use phonemes::PhonemeEncoder;
pub use phonemizer::{EspeakPhonemizer, Phonemizer};
pub use pipeline::{AcousticModel, Vocoder};
