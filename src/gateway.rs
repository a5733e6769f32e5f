//! The narrow interface the boundary layer calls into
//!
//! `Gateway` owns the engine registry, the voice resolver, and the optional
//! result cache, and exposes the three inbound operations: synthesize,
//! list voices, list languages. Caching is read-before-synthesize and
//! write-after-synthesize; cache failures fall through to direct synthesis.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::WavCache;
use crate::core::error::Result;
use crate::engine::registry::EngineRegistry;
use crate::engine::traits::{SayOptions, Voice};
use crate::synth::orchestrator::{Orchestrator, SynthesisRequest};
use crate::voice::resolver::VoiceResolver;

/// One inbound synthesis call
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub text: String,
    pub voice: String,
    pub lang: String,
    pub ssml: bool,
    pub options: SayOptions,
    pub use_cache: bool,
}

/// Voice listing filters; empty fields match everything
#[derive(Debug, Clone, Default)]
pub struct VoiceFilter {
    pub language: Option<String>,
    pub locale: Option<String>,
    pub gender: Option<String>,
    pub engine: Option<String>,
}

pub struct Gateway {
    orchestrator: Orchestrator,
    cache: Option<WavCache>,
}

impl Gateway {
    pub fn new(
        registry: Arc<EngineRegistry>,
        resolver: VoiceResolver,
        cache: Option<WavCache>,
    ) -> Self {
        Self {
            orchestrator: Orchestrator::new(registry, resolver),
            cache,
        }
    }

    pub fn registry(&self) -> &EngineRegistry {
        self.orchestrator.registry()
    }

    /// Synthesize a request into one WAV, consulting the cache around it
    pub async fn synthesize(&self, request: GatewayRequest) -> Result<Vec<u8>> {
        let cache_key = self.cache_key(&request);

        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Some(wav) = cache.load(key) {
                return Ok(wav);
            }
        }

        info!(
            "synthesizing with {} ({} char(s))",
            request.voice,
            request.text.len()
        );

        let wav = self
            .orchestrator
            .synthesize(&SynthesisRequest {
                text: request.text,
                voice: request.voice,
                lang: request.lang,
                ssml: request.ssml,
                options: request.options,
            })
            .await?;

        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            cache.store(key, &wav);
        }

        Ok(wav)
    }

    /// Enumerate voices across engines as (full id, voice) pairs
    ///
    /// An engine whose enumeration fails is skipped with a warning rather
    /// than failing the listing.
    pub async fn list_voices(&self, filter: &VoiceFilter) -> Vec<(String, Voice)> {
        let mut result = Vec::new();

        for (engine_name, engine) in self.orchestrator.registry().iter() {
            if filter
                .engine
                .as_deref()
                .is_some_and(|wanted| wanted != engine_name)
            {
                continue;
            }

            let voices = match engine.voices().await {
                Ok(voices) => voices,
                Err(e) => {
                    warn!("skipping voices of '{engine_name}': {e}");
                    continue;
                }
            };

            for voice in voices {
                if filter
                    .language
                    .as_deref()
                    .is_some_and(|wanted| !wanted.eq_ignore_ascii_case(&voice.language))
                {
                    continue;
                }
                if filter
                    .locale
                    .as_deref()
                    .is_some_and(|wanted| !wanted.eq_ignore_ascii_case(&voice.locale))
                {
                    continue;
                }
                if filter
                    .gender
                    .as_deref()
                    .is_some_and(|wanted| !wanted.eq_ignore_ascii_case(voice.gender.as_str()))
                {
                    continue;
                }

                result.push((format!("{engine_name}:{}", voice.id), voice));
            }
        }

        result
    }

    /// Set of language codes available from the registered engines
    pub async fn list_languages(&self, engine: Option<&str>) -> BTreeSet<String> {
        let filter = VoiceFilter {
            engine: engine.map(str::to_string),
            ..VoiceFilter::default()
        };

        self.list_voices(&filter)
            .await
            .into_iter()
            .map(|(_, voice)| voice.language)
            .collect()
    }

    /// Cache key over text, resolved voice, and option values
    ///
    /// Resolution keeps the key stable across alias spellings of the same
    /// voice; if the request voice cannot be resolved (it may still work
    /// through per-sentence SSML overrides), the raw string is used.
    fn cache_key(&self, request: &GatewayRequest) -> Option<String> {
        if !request.use_cache || self.cache.is_none() {
            return None;
        }

        let voice = self
            .orchestrator
            .resolver()
            .resolve(self.orchestrator.registry(), &request.voice, None)
            .unwrap_or_else(|_| request.voice.clone());

        let opts = &request.options;
        let settings = format!(
            "denoiser_strength={:?};noise_scale={:?};length_scale={:?};vocoder={:?};ssml={}",
            opts.denoiser_strength, opts.noise_scale, opts.length_scale, opts.vocoder_quality,
            request.ssml,
        );

        Some(WavCache::key(&request.text, &voice, &settings))
    }
}
