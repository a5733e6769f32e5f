//! voxgate server binary
//!
//! Probes the configured engines, builds the registry and resolver, and
//! serves the HTTP API. An engine whose prerequisites are missing is
//! skipped with a warning instead of failing startup; explicitly
//! configured remote engines are the exception and abort on error.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use voxgate::engine::{
    EngineRegistry, EspeakEngine, FliteEngine, GlowSpeakEngine, MaryTtsEngine, NeuralDefaults,
    RemoteEngine, RemoteEngineConfig, TtsEngine, VocoderQuality,
};
use voxgate::gateway::Gateway;
use voxgate::server::{serve, AppState, RequestDefaults};
use voxgate::voice::VoiceResolver;
use voxgate::WavCache;

/// Unifying text-to-speech gateway
#[derive(Parser, Debug)]
#[command(name = "voxgate", version, about)]
struct Args {
    /// Host of the HTTP server
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port of the HTTP server
    #[arg(long, default_value_t = 5500)]
    port: u16,

    /// Default language for requests that do not specify one
    #[arg(long, default_value = "en")]
    language: String,

    /// Root directory for engine voices and models
    #[arg(long, default_value = "voices")]
    voices_dir: PathBuf,

    /// Cache synthesized WAV files in this directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Don't use espeak
    #[arg(long)]
    no_espeak: bool,

    /// Don't use flite
    #[arg(long)]
    no_flite: bool,

    /// Don't use MaryTTS
    #[arg(long)]
    no_marytts: bool,

    /// Don't use Glow-Speak
    #[arg(long)]
    no_glow_speak: bool,

    /// Directory where flite voices are stored (default: <voices-dir>/flite)
    #[arg(long)]
    flite_voices_dir: Option<PathBuf>,

    /// MaryTTS installation directory (default: <voices-dir>/marytts)
    #[arg(long)]
    marytts_dir: Option<PathBuf>,

    /// Glow-Speak models directory (default: <voices-dir>/glow-speak)
    #[arg(long)]
    glow_speak_dir: Option<PathBuf>,

    /// Remote TTS server as NAME=URL; repeatable
    #[arg(long, value_name = "NAME=URL")]
    remote: Vec<String>,

    /// Skip TLS certificate verification for remote engines
    #[arg(long)]
    no_verify_tls: bool,

    /// Preferred voice for a language, e.g. "de glow-speak:de_thorsten"
    #[arg(long, num_args = 2, value_names = ["LANG", "VOICE"])]
    preferred_voice: Vec<String>,

    /// Abort a subprocess/remote engine call after this many seconds
    #[arg(long)]
    engine_timeout: Option<u64>,

    /// Vocoder quality to use if not specified in the API call
    #[arg(long, default_value = "high")]
    vocoder_quality: String,

    /// Denoiser strength to use if not specified in the API call
    #[arg(long, default_value_t = 0.005)]
    denoiser_strength: f32,

    /// Noise scale (voice volatility) if not specified in the API call
    #[arg(long, default_value_t = 0.667)]
    noise_scale: f32,

    /// Length scale (< 1 is faster) if not specified in the API call
    #[arg(long, default_value_t = 1.0)]
    length_scale: f32,

    /// Print DEBUG messages to console
    #[arg(long)]
    debug: bool,
}

fn setup_logging(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("failed to set tracing subscriber");
}

/// Collect the engines whose prerequisites are present
fn build_engines(args: &Args) -> Result<Vec<Arc<dyn TtsEngine>>> {
    let timeout = args.engine_timeout.map(Duration::from_secs);
    let mut engines: Vec<Arc<dyn TtsEngine>> = Vec::new();

    let mut register = |name: &str, result: voxgate::Result<Arc<dyn TtsEngine>>| match result {
        Ok(engine) => engines.push(engine),
        Err(e) => warn!("engine '{name}' not registered: {e}"),
    };

    if !args.no_espeak {
        register(
            "espeak",
            EspeakEngine::new(timeout).map(|e| Arc::new(e) as Arc<dyn TtsEngine>),
        );
    }

    if !args.no_flite {
        let voice_dir = args
            .flite_voices_dir
            .clone()
            .unwrap_or_else(|| args.voices_dir.join("flite"));
        register(
            "flite",
            FliteEngine::new(voice_dir, timeout).map(|e| Arc::new(e) as Arc<dyn TtsEngine>),
        );
    }

    if !args.no_marytts {
        let base_dir = args
            .marytts_dir
            .clone()
            .unwrap_or_else(|| args.voices_dir.join("marytts"));
        register(
            "marytts",
            MaryTtsEngine::new(base_dir, timeout).map(|e| Arc::new(e) as Arc<dyn TtsEngine>),
        );
    }

    if !args.no_glow_speak {
        let models_dir = args
            .glow_speak_dir
            .clone()
            .unwrap_or_else(|| args.voices_dir.join("glow-speak"));
        let defaults = NeuralDefaults {
            vocoder_quality: VocoderQuality::from_str(&args.vocoder_quality)
                .unwrap_or(VocoderQuality::High),
            ..NeuralDefaults::default()
        };
        register(
            "glow-speak",
            GlowSpeakEngine::new(models_dir, defaults).map(|e| Arc::new(e) as Arc<dyn TtsEngine>),
        );
    }

    // Remote servers were asked for explicitly; failing to set one up is
    // a startup error, not a silent degradation.
    for spec in &args.remote {
        let (name, base_url) = spec
            .split_once('=')
            .with_context(|| format!("bad --remote value '{spec}', expected NAME=URL"))?;

        let engine = RemoteEngine::new(RemoteEngineConfig {
            name: name.to_string(),
            base_url: base_url.to_string(),
            timeout_secs: args.engine_timeout.unwrap_or(60),
            verify_tls: !args.no_verify_tls,
        })
        .with_context(|| format!("cannot set up remote engine '{name}'"))?;

        engines.push(Arc::new(engine));
    }

    Ok(engines)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.debug);

    info!("voxgate v{}", voxgate::VERSION);

    let engines = build_engines(&args)?;
    if engines.is_empty() {
        warn!("no TTS engines registered; every synthesis request will fail");
    }

    let registry = Arc::new(EngineRegistry::new(engines));
    info!("loaded TTS engines: {}", registry.names().join(", "));

    let mut resolver = VoiceResolver::with_defaults();
    for pair in args.preferred_voice.chunks_exact(2) {
        resolver.prefer(&pair[0], &pair[1]);
    }

    let cache = match &args.cache_dir {
        Some(dir) => Some(WavCache::new(dir).context("cannot set up WAV cache")?),
        None => None,
    };

    let vocoder_quality = VocoderQuality::from_str(&args.vocoder_quality)
        .map_err(|e| anyhow::anyhow!(e))
        .context("bad --vocoder-quality")?;

    let state = Arc::new(AppState {
        gateway: Gateway::new(registry, resolver, cache),
        defaults: RequestDefaults {
            vocoder_quality: Some(vocoder_quality),
            noise_scale: Some(args.noise_scale),
            length_scale: Some(args.length_scale),
            denoiser_strength: Some(args.denoiser_strength),
        },
        default_language: args.language.clone(),
    });

    serve(state, &args.host, args.port).await
}
