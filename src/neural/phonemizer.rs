//! Text to IPA phonemization
//!
//! The neural pipeline delegates its linguistic front-end to espeak-ng,
//! invoked with `--ipa=3` so phonemes inside a word come back separated by
//! underscores, matching the encoder's input contract. Implementations run
//! on the blocking pool, so the trait is synchronous.

use std::process::Command;

use tracing::debug;

use crate::core::error::{Result, TtsError};
use crate::engine::process::find_program;

/// Text -> IPA phoneme string (words by whitespace, phonemes by `_`)
pub trait Phonemizer: Send + Sync {
    fn phonemize(&self, text: &str, voice: &str) -> Result<String>;
}

/// espeak-ng-backed phonemizer
pub struct EspeakPhonemizer {
    program: String,
}

impl EspeakPhonemizer {
    pub fn new() -> Result<Self> {
        let program = find_program(&["espeak-ng", "espeak"]).ok_or_else(|| {
            TtsError::config("espeak-ng binary (needed for phonemization) not found", None)
        })?;

        Ok(Self { program })
    }
}

impl Phonemizer for EspeakPhonemizer {
    fn phonemize(&self, text: &str, voice: &str) -> Result<String> {
        let output = Command::new(&self.program)
            .args(["-q", "--ipa=3", "-v", voice, text])
            .output()
            .map_err(|e| TtsError::Internal {
                message: format!("failed to run {} for phonemization: {e}", self.program),
            })?;

        if !output.status.success() && output.stdout.is_empty() {
            return Err(TtsError::Internal {
                message: format!(
                    "{} phonemization failed for voice '{voice}'",
                    self.program
                ),
            });
        }

        // Multi-line output (one line per clause) flattens to one string
        let ipa = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        debug!("phonemized ({voice}): {ipa}");
        Ok(ipa)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed-output stand-in used by pipeline tests
    pub struct FixedPhonemizer(pub String);

    impl Phonemizer for FixedPhonemizer {
        fn phonemize(&self, _text: &str, _voice: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_fixed_phonemizer_contract() {
        let phonemizer = FixedPhonemizer("h_ə_l_oʊ .".to_string());
        assert_eq!(phonemizer.phonemize("hello", "en").unwrap(), "h_ə_l_oʊ .");
    }
}
