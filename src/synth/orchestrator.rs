//! Synthesis orchestration
//!
//! Drives one request end to end: segment the input, resolve a voice per
//! unit, dispatch to the owning engine, and assemble the collected audio
//! into a single WAV. Units are processed and assembled in strict input
//! order. Any unit that yields no audio fails the whole request; partial
//! output is never returned.

use std::sync::Arc;

use tracing::debug;

use crate::audio::{conform, encode_wav_pcm16, AudioSegment};
use crate::core::error::{Result, TtsError};
use crate::engine::registry::EngineRegistry;
use crate::engine::traits::SayOptions;
use crate::synth::segment::{segment_plain, segment_ssml, SynthesisUnit};
use crate::voice::resolver::VoiceResolver;

/// One synthesis request as seen by the core
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// Plain text or SSML markup
    pub text: String,
    /// Voice or language shorthand, resolved through the alias table
    pub voice: String,
    /// Default language for SSML language switching
    pub lang: String,
    /// Treat `text` as SSML
    pub ssml: bool,
    /// Request-level synthesis options
    pub options: SayOptions,
}

/// Sample width of the assembled output, bytes
const OUTPUT_SAMPLE_WIDTH: u16 = 2;
/// Channel count of the assembled output
const OUTPUT_CHANNELS: u16 = 1;

struct CollectedUnit {
    segment: AudioSegment,
    pause_before_ms: u64,
    pause_after_ms: u64,
}

/// Per-request synthesis pipeline over a fixed engine registry
pub struct Orchestrator {
    registry: Arc<EngineRegistry>,
    resolver: VoiceResolver,
}

impl Orchestrator {
    pub fn new(registry: Arc<EngineRegistry>, resolver: VoiceResolver) -> Self {
        Self { registry, resolver }
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &VoiceResolver {
        &self.resolver
    }

    /// Synthesize a request into a single canonical WAV
    pub async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>> {
        let units = if request.ssml {
            segment_ssml(&request.text)?
        } else {
            segment_plain(&request.text)
        };

        if units.is_empty() {
            return Err(TtsError::Internal {
                message: "no synthesizable text in request".to_string(),
            });
        }

        let collected = self.dispatch(request, &units).await?;
        self.assemble(collected)
    }

    /// Invoke engines for each unit, preserving input order
    async fn dispatch(
        &self,
        request: &SynthesisRequest,
        units: &[SynthesisUnit],
    ) -> Result<Vec<CollectedUnit>> {
        let mut collected = Vec::with_capacity(units.len());

        for (index, unit) in units.iter().enumerate() {
            // A <voice> override wins, then a language switch away from the
            // request default, then the request-level voice.
            let requested = match (&unit.voice, &unit.lang) {
                (Some(voice), _) => voice.clone(),
                (None, Some(lang)) if !lang.eq_ignore_ascii_case(&request.lang) => lang.clone(),
                _ => request.voice.clone(),
            };

            let resolved = self
                .resolver
                .resolve(&self.registry, &requested, None)?;

            let (engine_name, voice_ref) =
                resolved
                    .split_once(':')
                    .ok_or_else(|| TtsError::Resolution {
                        voice: resolved.clone(),
                    })?;

            // Only a #speaker carried by the resolved voice survives; an
            // inherited speaker id must not bleed into single-speaker voices.
            let (voice_id, speaker_id) = match voice_ref.split_once('#') {
                Some((id, speaker)) => (id, Some(speaker.to_string())),
                None => (voice_ref, None),
            };
            let opts = request.options.with_speaker(speaker_id);

            let engine =
                self.registry
                    .get(engine_name)
                    .ok_or_else(|| TtsError::Resolution {
                        voice: resolved.clone(),
                    })?;

            debug!(
                "synthesizing unit {} with {resolved}: {}",
                index + 1,
                unit.text
            );

            let wav = engine.say(&unit.text, voice_id, &opts).await?;
            if wav.is_empty() {
                return Err(TtsError::synthesis(
                    engine_name,
                    format!("no audio for unit {}", index + 1),
                ));
            }

            let segment = AudioSegment::from_wav_bytes(&wav)?;
            if segment.num_frames() == 0 {
                return Err(TtsError::synthesis(
                    engine_name,
                    format!("empty audio for unit {}", index + 1),
                ));
            }

            debug!(
                "unit {}: {} frame(s) at {} Hz",
                index + 1,
                segment.num_frames(),
                segment.sample_rate
            );

            collected.push(CollectedUnit {
                segment,
                pause_before_ms: unit.pause_before_ms,
                pause_after_ms: unit.pause_after_ms,
            });
        }

        Ok(collected)
    }

    /// Concatenate collected segments and pause silence into one WAV
    ///
    /// The output rate is the maximum rate over all segments, so no segment
    /// is ever downsampled below its native rate. Mismatched segments are
    /// conformed to (rate, 16-bit, mono) before appending.
    fn assemble(&self, collected: Vec<CollectedUnit>) -> Result<Vec<u8>> {
        let target_rate = collected
            .iter()
            .map(|c| c.segment.sample_rate)
            .max()
            .expect("dispatch yields at least one unit");

        let mut pcm: Vec<u8> = Vec::new();

        for unit in collected {
            if unit.pause_before_ms > 0 {
                pcm.extend_from_slice(
                    &AudioSegment::silence(
                        unit.pause_before_ms,
                        target_rate,
                        OUTPUT_SAMPLE_WIDTH,
                        OUTPUT_CHANNELS,
                    )
                    .data,
                );
            }

            let conformed = conform(unit.segment, target_rate)?;
            pcm.extend_from_slice(&conformed.data);

            if unit.pause_after_ms > 0 {
                pcm.extend_from_slice(
                    &AudioSegment::silence(
                        unit.pause_after_ms,
                        target_rate,
                        OUTPUT_SAMPLE_WIDTH,
                        OUTPUT_CHANNELS,
                    )
                    .data,
                );
            }
        }

        encode_wav_pcm16(&pcm, target_rate)
    }
}
