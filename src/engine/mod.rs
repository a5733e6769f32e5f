//! TTS engine abstraction layer
//!
//! One trait, four adapter families:
//! - `espeak` / `flite`: one-shot subprocess synthesizers
//! - `marytts`: persistent subprocess bound to the active voice
//! - `remote`: HTTP forwarding to another TTS server
//! - `glow-speak`: in-process ONNX pipeline

pub mod espeak;
pub mod flite;
pub mod glow_speak;
pub mod marytts;
pub mod process;
pub mod registry;
pub mod remote;
pub mod traits;

pub use espeak::EspeakEngine;
pub use flite::FliteEngine;
pub use glow_speak::{GlowSpeakEngine, NeuralDefaults};
pub use marytts::MaryTtsEngine;
pub use registry::EngineRegistry;
pub use remote::{RemoteEngine, RemoteEngineConfig};
pub use traits::{Gender, SayOptions, TtsEngine, Voice, VoiceTag, VocoderQuality};
