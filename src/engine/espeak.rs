//! eSpeak engine adapter (one-shot subprocess)
//!
//! Spawns `espeak-ng` (or `espeak`) per call with `--stdout` and takes the
//! WAV from standard output. Voices are enumerated from `--voices`, so the
//! catalog always reflects the installed binary.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::core::error::{Result, TtsError};
use crate::engine::process::{find_program, run_capture};
use crate::engine::traits::{Gender, SayOptions, TtsEngine, Voice};

pub struct EspeakEngine {
    program: String,
    timeout: Option<Duration>,
}

impl EspeakEngine {
    /// Probe for the espeak binary; fails when neither variant is on PATH
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let program = find_program(&["espeak-ng", "espeak"])
            .ok_or_else(|| TtsError::config("espeak-ng binary not found on PATH", None))?;

        Ok(Self { program, timeout })
    }

    fn parse_voices(output: &str) -> Vec<Voice> {
        let mut voices = Vec::new();

        // First line is the column header
        for line in output.lines().skip(1) {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 {
                continue;
            }

            let mut locale = parts[1].to_string();
            let gender = parts[2].chars().last().map(|c| c.to_string());
            let name = parts[3];

            // espeak reports bare ISO codes for Chinese variants
            let language = match locale.as_str() {
                "cmn" => {
                    locale = "zh-cmn".to_string();
                    "zh".to_string()
                }
                "yue" => {
                    locale = "zh-yue".to_string();
                    "zh".to_string()
                }
                _ => locale.split('-').next().unwrap_or(&locale).to_string(),
            };

            voices.push(Voice::new(
                parts[1],
                name,
                Gender::parse(gender.as_deref().unwrap_or("")),
                language,
                locale,
            ));
        }

        voices
    }
}

#[async_trait]
impl TtsEngine for EspeakEngine {
    fn name(&self) -> &str {
        "espeak"
    }

    async fn voices(&self) -> Result<Vec<Voice>> {
        match run_capture(self.name(), &self.program, &["--voices"], None, self.timeout).await {
            Ok(stdout) => Ok(Self::parse_voices(&String::from_utf8_lossy(&stdout))),
            Err(e) => {
                // A broken probe hides this engine's voices, nothing more
                warn!("espeak voice enumeration failed: {e}");
                Ok(Vec::new())
            }
        }
    }

    async fn say(&self, text: &str, voice_id: &str, _opts: &SayOptions) -> Result<Vec<u8>> {
        let stdout = run_capture(
            self.name(),
            &self.program,
            &["-v", voice_id, "--stdout", text],
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

#[cfg(test)]
mod tests {
    use super::*;

    const VOICES_OUTPUT: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 5  cmn             --/M      Chinese_(Mandarin) sit/cmn              (zh-cmn 5)(zh 5)
 5  en-us           --/M      English_(America)  gmw/en-US            (en 3)
 5  yue             --/F      Chinese_(Cantonese) sit/yue
";

    #[test]
    fn test_parse_voices() {
        let voices = EspeakEngine::parse_voices(VOICES_OUTPUT);
        assert_eq!(voices.len(), 4);

        assert_eq!(voices[0].id, "af");
        assert_eq!(voices[0].gender, Gender::Male);
        assert_eq!(voices[0].language, "af");

        assert_eq!(voices[2].id, "en-us");
        assert_eq!(voices[2].language, "en");
        assert_eq!(voices[2].locale, "en-us");
    }

    #[test]
    fn test_parse_voices_chinese_fixups() {
        let voices = EspeakEngine::parse_voices(VOICES_OUTPUT);

        let mandarin = voices.iter().find(|v| v.id == "cmn").unwrap();
        assert_eq!(mandarin.locale, "zh-cmn");
        assert_eq!(mandarin.language, "zh");

        let cantonese = voices.iter().find(|v| v.id == "yue").unwrap();
        assert_eq!(cantonese.locale, "zh-yue");
        assert_eq!(cantonese.gender, Gender::Female);
    }

    #[test]
    fn test_parse_voices_empty_output() {
        assert!(EspeakEngine::parse_voices("").is_empty());
    }
}
