//! # voxgate: unifying text-to-speech gateway
//!
//! One HTTP API in front of a heterogeneous pool of speech engines:
//! command-line synthesizers spawned per request, a persistent MaryTTS
//! process, remote TTS servers, and in-process ONNX pipelines. Outputs are
//! normalized to a common PCM form, concatenated in request order with
//! SSML pause handling, and returned as a single canonical WAV.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use voxgate::engine::{EngineRegistry, EspeakEngine};
//! use voxgate::gateway::{Gateway, GatewayRequest};
//! use voxgate::voice::VoiceResolver;
//!
//! let registry = Arc::new(EngineRegistry::new(vec![
//!     Arc::new(EspeakEngine::new(None)?),
//! ]));
//! let gateway = Gateway::new(registry, VoiceResolver::with_defaults(), None);
//!
//! let wav = gateway.synthesize(GatewayRequest {
//!     text: "Hello world.".into(),
//!     voice: "en".into(),
//!     lang: "en".into(),
//!     ssml: false,
//!     options: Default::default(),
//!     use_cache: false,
//! }).await?;
//! ```
//!
//! ## Engines
//!
//! | Engine | Kind |
//! |--------|------|
//! | `espeak` | one-shot subprocess |
//! | `flite` | one-shot subprocess, on-disk voice files |
//! | `marytts` | persistent subprocess per active voice |
//! | remote | HTTP forwarding to another TTS server |
//! | `glow-speak` | in-process ONNX (GlowTTS + HiFi-GAN) |

pub mod audio;
pub mod cache;
pub mod core;
pub mod engine;
pub mod gateway;
pub mod neural;
pub mod server;
pub mod synth;
pub mod voice;

// Re-exports for the common entry points
pub use crate::core::error::{Result, TtsError};
pub use cache::WavCache;
pub use engine::{
    EngineRegistry, EspeakEngine, FliteEngine, Gender, GlowSpeakEngine, MaryTtsEngine,
    NeuralDefaults, RemoteEngine, RemoteEngineConfig, SayOptions, TtsEngine, Voice, VoiceTag,
    VocoderQuality,
};
pub use gateway::{Gateway, GatewayRequest, VoiceFilter};
pub use synth::{Orchestrator, SynthesisRequest, SynthesisUnit};
pub use voice::VoiceResolver;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
