//! Core trait for TTS engine abstraction
//!
//! Every backend (one-shot subprocess, persistent subprocess, remote HTTP
//! server, or in-process neural pipeline) implements the same two-operation
//! contract: enumerate voices, speak text as WAV.

use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;

/// Unified interface implemented once per backend family
///
/// `voices()` is restartable: it may re-enumerate from scratch on every call
/// and reflects current on-disk/model availability. Implementations that
/// probe external state degrade to an empty list instead of failing the
/// whole request when the probe itself breaks.
///
/// `say()` returns a complete, self-describing WAV. It fails with a
/// synthesis error when the voice is unknown to the engine, the backing
/// process or service produced no data, or the process or service errored.
#[async_trait]
pub trait TtsEngine: Send + Sync {
    /// Short engine name used in `engine:voice` references
    fn name(&self) -> &str;

    /// Enumerate currently available voices
    async fn voices(&self) -> Result<Vec<Voice>>;

    /// Speak text as WAV bytes
    async fn say(&self, text: &str, voice_id: &str, opts: &SayOptions) -> Result<Vec<u8>>;
}

/// Single TTS voice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voice {
    /// Engine-local voice identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Speaker gender
    pub gender: Gender,
    /// ISO-639 language code (e.g. "en")
    pub language: String,
    /// Language + region (e.g. "en-us")
    pub locale: String,
    /// Per-voice synthesis parameter defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<VoiceTag>,
    /// Voice exposes multiple speakers
    #[serde(default)]
    pub multispeaker: bool,
    /// Speaker name to index map, present only for multispeaker voices
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speakers: Option<BTreeMap<String, u32>>,
}

impl Voice {
    /// Convenience constructor for single-speaker catalog entries
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        gender: Gender,
        language: impl Into<String>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            gender,
            language: language.into(),
            locale: locale.into(),
            tag: None,
            multispeaker: false,
            speakers: None,
        }
    }
}

/// Speaker gender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    /// Multi-speaker voices with both male and female speakers
    #[serde(rename = "MF")]
    Mixed,
    #[serde(rename = "?")]
    Unknown,
}

impl Gender {
    /// Parse the single-letter form used by engine catalogs ("M", "F", ...)
    pub fn parse(s: &str) -> Gender {
        match s.trim().to_ascii_uppercase().as_str() {
            "M" | "MALE" => Gender::Male,
            "F" | "FEMALE" => Gender::Female,
            "MF" | "FM" => Gender::Mixed,
            _ => Gender::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Mixed => "MF",
            Gender::Unknown => "?",
        }
    }
}

/// Typed per-voice synthesis parameter overrides
///
/// Merged against request-level values and adapter defaults with precedence
/// request > voice tag > adapter default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceTag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_scale: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_scale: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denoiser_strength: Option<f32>,
}

/// Request-level synthesis options passed to `TtsEngine::say`
///
/// All fields are optional; unset fields fall back to the voice tag and
/// then the adapter default. Engines ignore fields they have no use for.
#[derive(Debug, Clone, Default)]
pub struct SayOptions {
    /// Speaker selection within a multispeaker voice
    pub speaker_id: Option<String>,
    /// Vocoder quality level for neural engines
    pub vocoder_quality: Option<VocoderQuality>,
    /// Prosodic variability (neural engines)
    pub noise_scale: Option<f32>,
    /// Speaking rate; values < 1.0 speed up speech (neural engines)
    pub length_scale: Option<f32>,
    /// Spectral-subtraction denoiser strength; 0 disables (neural engines)
    pub denoiser_strength: Option<f32>,
}

impl SayOptions {
    /// Copy with a different speaker id
    pub fn with_speaker(&self, speaker_id: Option<String>) -> Self {
        let mut opts = self.clone();
        opts.speaker_id = speaker_id;
        opts
    }
}

/// Neural vocoder quality level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VocoderQuality {
    High,
    Medium,
    Low,
}

impl VocoderQuality {
    /// Model directory name for this quality level
    pub fn model_name(&self) -> &'static str {
        match self {
            VocoderQuality::High => "hifi-gan_high",
            VocoderQuality::Medium => "hifi-gan_medium",
            VocoderQuality::Low => "hifi-gan_low",
        }
    }
}

impl FromStr for VocoderQuality {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(VocoderQuality::High),
            "medium" => Ok(VocoderQuality::Medium),
            "low" => Ok(VocoderQuality::Low),
            other => Err(format!("unknown vocoder quality: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_parse() {
        assert_eq!(Gender::parse("M"), Gender::Male);
        assert_eq!(Gender::parse("f"), Gender::Female);
        assert_eq!(Gender::parse("MF"), Gender::Mixed);
        assert_eq!(Gender::parse(""), Gender::Unknown);
    }

    #[test]
    fn test_vocoder_quality_from_str() {
        assert_eq!(" High ".parse::<VocoderQuality>(), Ok(VocoderQuality::High));
        assert_eq!("low".parse::<VocoderQuality>(), Ok(VocoderQuality::Low));
        assert!("ultra".parse::<VocoderQuality>().is_err());
    }

    #[test]
    fn test_vocoder_model_name() {
        assert_eq!(VocoderQuality::Medium.model_name(), "hifi-gan_medium");
    }

    #[test]
    fn test_voice_serialization_skips_empty() {
        let voice = Voice::new("en-us_x", "x", Gender::Female, "en", "en-us");
        let json = serde_json::to_value(&voice).unwrap();
        assert!(json.get("tag").is_none());
        assert!(json.get("speakers").is_none());
        assert_eq!(json["gender"], "F");
    }
}
