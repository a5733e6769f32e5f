//! flite engine adapter (one-shot subprocess)
//!
//! Voices are `.flitevox` model files in a configured directory; a catalog
//! entry is only exposed when its model file is present on disk.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::error::{Result, TtsError};
use crate::engine::process::{find_program, run_capture};
use crate::engine::traits::{Gender, SayOptions, TtsEngine, Voice};

pub struct FliteEngine {
    program: String,
    voice_dir: PathBuf,
    timeout: Option<Duration>,
}

impl FliteEngine {
    pub fn new(voice_dir: impl Into<PathBuf>, timeout: Option<Duration>) -> Result<Self> {
        let program = find_program(&["flite"])
            .ok_or_else(|| TtsError::config("flite binary not found on PATH", None))?;

        let voice_dir = voice_dir.into();
        if !voice_dir.is_dir() {
            return Err(TtsError::config(
                "flite voice directory does not exist",
                Some(voice_dir),
            ));
        }

        Ok(Self {
            program,
            voice_dir,
            timeout,
        })
    }

    fn voice_path(&self, voice_id: &str) -> PathBuf {
        self.voice_dir.join(format!("{voice_id}.flitevox"))
    }
}

#[async_trait]
impl TtsEngine for FliteEngine {
    fn name(&self) -> &str {
        "flite"
    }

    async fn voices(&self) -> Result<Vec<Voice>> {
        Ok(FLITE_VOICES
            .iter()
            .filter(|(id, ..)| self.voice_path(id).is_file())
            .map(|(id, gender, language, locale)| {
                Voice::new(*id, *id, Gender::parse(gender), *language, *locale)
            })
            .collect())
    }

    async fn say(&self, text: &str, voice_id: &str, _opts: &SayOptions) -> Result<Vec<u8>> {
        let voice_path = self.voice_path(voice_id);
        if !voice_path.is_file() {
            return Err(TtsError::synthesis(
                self.name(),
                format!("unknown voice '{voice_id}'"),
            ));
        }

        let voice_arg = voice_path.to_string_lossy().into_owned();
        let stdout = run_capture(
            self.name(),
            &self.program,
            &["-voice", &voice_arg, "-o", "/dev/stdout", "-t", text],
            None,
            self.timeout,
        )
        .await?;

        if stdout.is_empty() {
            return Err(TtsError::synthesis(
                self.name(),
                format!("no audio for voice '{voice_id}'"),
            ));
        }

        Ok(stdout)
    }
}

/// (id, gender, language, locale)
const FLITE_VOICES: &[(&str, &str, &str, &str)] = &[
    // English
    ("cmu_us_aew", "M", "en", "en-us"),
    ("cmu_us_awb", "M", "en", "en-us"),
    ("cmu_us_bdl", "M", "en", "en-us"),
    ("cmu_us_clb", "F", "en", "en-us"),
    ("cmu_us_eey", "F", "en", "en-us"),
    ("cmu_us_jmk", "M", "en", "en-us"),
    ("cmu_us_ksp", "M", "en", "en-in"),
    ("cmu_us_ljm", "F", "en", "en-us"),
    ("cmu_us_rms", "M", "en", "en-us"),
    ("cmu_us_slt", "F", "en", "en-us"),
    ("cmu_us_slp", "F", "en", "en-in"),
    ("mycroft_voice_4.0", "M", "en", "en-us"),
    // Indic
    ("cmu_indic_ben_rm", "F", "bn", "bn-in"),
    ("cmu_indic_guj_ad", "F", "gu", "gu-in"),
    ("cmu_indic_hin_ab", "F", "hi", "hi-in"),
    ("cmu_indic_kan_plv", "F", "kn", "kn-in"),
    ("cmu_indic_mar_aup", "F", "mr", "mr-in"),
    ("cmu_indic_pan_amp", "F", "pa", "pa-in"),
    ("cmu_indic_tam_sdr", "F", "ta", "ta-in"),
    ("cmu_indic_tel_kpn", "F", "te", "te-in"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_entries_are_well_formed() {
        for (id, gender, language, locale) in FLITE_VOICES {
            assert!(!id.is_empty());
            assert!(matches!(*gender, "M" | "F"));
            assert!(locale.starts_with(language) || language.len() == 2);
        }
    }

    #[test]
    fn test_voice_path_layout() {
        // Construct directly; the binary probe is environment-dependent
        let engine = FliteEngine {
            program: "flite".to_string(),
            voice_dir: PathBuf::from("/voices/flite"),
            timeout: None,
        };
        assert_eq!(
            engine.voice_path("cmu_us_slt"),
            PathBuf::from("/voices/flite/cmu_us_slt.flitevox")
        );
    }
}
