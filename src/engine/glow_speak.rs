//! Glow-Speak engine adapter (in-process ONNX pipeline)
//!
//! Each voice directory holds a GlowTTS acoustic model plus phoneme
//! tables; HiFi-GAN vocoders are shared across voices per quality level.
//! Models load lazily on first use and stay cached for the process
//! lifetime. Inference runs on the blocking pool so the request loop stays
//! responsive.
//!
//! Concurrent first uses of the same voice may each load the model once;
//! the extra load is wasted work, not a correctness problem, and the cache
//! settles on a single instance.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::audio::encode_wav_i16;
use crate::core::error::{Result, TtsError};
use crate::engine::traits::{Gender, SayOptions, TtsEngine, Voice, VocoderQuality};
use crate::neural::{AcousticModel, EspeakPhonemizer, Phonemizer, Vocoder};

const ENGINE_NAME: &str = "glow-speak";

/// Adapter-level defaults, overridable per voice tag and per request
#[derive(Debug, Clone, Copy)]
pub struct NeuralDefaults {
    pub vocoder_quality: VocoderQuality,
    pub noise_scale: f32,
    pub length_scale: f32,
    pub denoiser_strength: f32,
}

impl Default for NeuralDefaults {
    fn default() -> Self {
        Self {
            vocoder_quality: VocoderQuality::High,
            noise_scale: 0.667,
            length_scale: 1.0,
            denoiser_strength: 0.0,
        }
    }
}

pub struct GlowSpeakEngine {
    inner: Arc<Inner>,
}

struct Inner {
    models_dir: PathBuf,
    defaults: NeuralDefaults,
    catalog: BTreeMap<String, Voice>,
    phonemizer: Box<dyn Phonemizer>,
    acoustic_models: DashMap<String, Arc<AcousticModel>>,
    vocoders: DashMap<&'static str, Arc<Vocoder>>,
}

impl GlowSpeakEngine {
    pub fn new(models_dir: impl Into<PathBuf>, defaults: NeuralDefaults) -> Result<Self> {
        let models_dir = models_dir.into();
        if !models_dir.is_dir() {
            return Err(TtsError::config(
                "glow-speak models directory does not exist",
                Some(models_dir),
            ));
        }

        let phonemizer = EspeakPhonemizer::new()?;

        let catalog = GLOW_SPEAK_VOICES
            .iter()
            .map(|(id, name, gender, language, locale)| {
                (
                    (*id).to_string(),
                    Voice::new(*id, *name, Gender::parse(gender), *language, *locale),
                )
            })
            .collect();

        Ok(Self {
            inner: Arc::new(Inner {
                models_dir,
                defaults,
                catalog,
                phonemizer: Box::new(phonemizer),
                acoustic_models: DashMap::new(),
                vocoders: DashMap::new(),
            }),
        })
    }
}

#[async_trait]
impl TtsEngine for GlowSpeakEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    async fn voices(&self) -> Result<Vec<Voice>> {
        Ok(self
            .inner
            .catalog
            .values()
            .filter(|voice| self.inner.models_dir.join(&voice.id).exists())
            .cloned()
            .collect())
    }

    async fn say(&self, text: &str, voice_id: &str, opts: &SayOptions) -> Result<Vec<u8>> {
        let inner = Arc::clone(&self.inner);
        let text = text.to_string();
        let voice_id = voice_id.to_string();
        let opts = opts.clone();

        // Model loading and inference are CPU-bound
        tokio::task::spawn_blocking(move || inner.synthesize(&text, &voice_id, &opts))
            .await
            .map_err(|e| TtsError::Internal {
                message: format!("synthesis task failed: {e}"),
            })?
    }
}

impl Inner {
    fn synthesize(&self, text: &str, voice_id: &str, opts: &SayOptions) -> Result<Vec<u8>> {
        let voice = self.catalog.get(voice_id).ok_or_else(|| {
            TtsError::synthesis(ENGINE_NAME, format!("unknown voice '{voice_id}'"))
        })?;

        // Precedence: request > voice tag > adapter default
        let tag = voice.tag.as_ref();
        let noise_scale = opts
            .noise_scale
            .or(tag.and_then(|t| t.noise_scale))
            .unwrap_or(self.defaults.noise_scale);
        let length_scale = opts
            .length_scale
            .or(tag.and_then(|t| t.length_scale))
            .unwrap_or(self.defaults.length_scale);
        let denoiser_strength = opts
            .denoiser_strength
            .or(tag.and_then(|t| t.denoiser_strength))
            .unwrap_or(self.defaults.denoiser_strength);
        let quality = opts.vocoder_quality.unwrap_or(self.defaults.vocoder_quality);

        let acoustic = self.acoustic_model(voice)?;
        let vocoder = self.vocoder(quality)?;

        let ipa = self.phonemizer.phonemize(text, &acoustic.text_language)?;
        let ids = acoustic.encoder.encode_ipa(&ipa)?;
        let mel = acoustic.infer(&ids, noise_scale, length_scale)?;
        let samples = vocoder.synthesize(mel, denoiser_strength)?;

        if samples.is_empty() {
            return Err(TtsError::synthesis(
                ENGINE_NAME,
                format!("vocoder produced no audio for voice '{voice_id}'"),
            ));
        }

        encode_wav_i16(&samples, vocoder.audio.sampling_rate, vocoder.audio.channels)
    }

    fn acoustic_model(&self, voice: &Voice) -> Result<Arc<AcousticModel>> {
        if let Some(model) = self.acoustic_models.get(&voice.id) {
            return Ok(Arc::clone(&model));
        }

        // The voice id leads with its espeak language ("en-us_ljspeech")
        let text_language = voice
            .id
            .split(['-', '_'])
            .next()
            .unwrap_or(&voice.id)
            .to_string();

        let model_dir = self.models_dir.join(&voice.id);
        let model = Arc::new(AcousticModel::load(&model_dir, &text_language)?);
        self.acoustic_models
            .insert(voice.id.clone(), Arc::clone(&model));

        Ok(model)
    }

    fn vocoder(&self, quality: VocoderQuality) -> Result<Arc<Vocoder>> {
        let name = quality.model_name();
        if let Some(vocoder) = self.vocoders.get(name) {
            return Ok(Arc::clone(&vocoder));
        }

        let vocoder = Arc::new(Vocoder::load(&self.models_dir.join(name))?);
        self.vocoders.insert(name, Arc::clone(&vocoder));

        Ok(vocoder)
    }
}

/// (id, name, gender, language, locale)
const GLOW_SPEAK_VOICES: &[(&str, &str, &str, &str, &str)] = &[
    ("de_thorsten", "thorsten", "M", "de", "de-de"),
    ("el_rapunzelina", "rapunzelina", "F", "el", "el-gr"),
    ("en-us_ljspeech", "ljspeech", "F", "en", "en-us"),
    ("en-us_mary_ann", "mary_ann", "F", "en", "en-us"),
    ("es_tux", "tux", "M", "es", "es-es"),
    ("fi_harri_tapani_ylilammi", "harri_tapani_ylilammi", "M", "fi", "fi-fi"),
    ("fr_siwis", "siwis", "F", "fr", "fr-fr"),
    ("hu_diana_majlinger", "diana_majlinger", "F", "hu", "hu-hu"),
    ("it_riccardo_fasol", "riccardo_fasol", "M", "it", "it-it"),
    ("ko_kss", "kss", "F", "ko", "ko-ko"),
    ("nl_rdh", "rdh", "M", "nl", "nl"),
    ("ru_nikolaev", "nikolaev", "M", "ru", "ru-ru"),
    ("sv_talesyntese", "talesyntese", "M", "sv", "sv-se"),
    ("sw_biblia_takatifu", "biblia_takatifu", "M", "sw", "sw"),
    ("cmn_jing_li", "jing_li", "F", "zh", "zh-cmn"),
];
