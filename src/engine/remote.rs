//! Remote HTTP engine adapter
//!
//! Forwards synthesis to another TTS server speaking the same API: GET
//! `{base}/api/tts?voice=..&text=..` returning WAV, with the voice catalog
//! at `{base}/api/voices`. The catalog is fetched once per process and
//! cached; a failed fetch degrades to an empty catalog without being
//! cached, so a recovered server becomes visible again.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::core::error::{Result, TtsError};
use crate::engine::traits::{Gender, SayOptions, TtsEngine, Voice, VoiceTag};

/// Connection settings for one remote server
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteEngineConfig {
    /// Engine name exposed in `engine:voice` references
    pub name: String,
    /// Server base URL, e.g. "https://tts.example.org:5500"
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Verify the server's TLS certificate
    #[serde(default = "default_true")]
    pub verify_tls: bool,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

/// Voice payload as the remote server serializes it
#[derive(Debug, Deserialize)]
struct RemoteVoice {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    language: String,
    #[serde(default)]
    locale: String,
    #[serde(default)]
    tag: Option<VoiceTag>,
    #[serde(default)]
    multispeaker: bool,
    #[serde(default)]
    speakers: Option<BTreeMap<String, u32>>,
}

pub struct RemoteEngine {
    config: RemoteEngineConfig,
    client: reqwest::Client,
    catalog: OnceCell<Vec<Voice>>,
}

impl RemoteEngine {
    pub fn new(config: RemoteEngineConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(TtsError::config("remote engine needs a base URL", None));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| TtsError::config(format!("cannot build HTTP client: {e}"), None))?;

        Ok(Self {
            config,
            client,
            catalog: OnceCell::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn fetch_catalog(&self) -> Result<Vec<Voice>> {
        let url = self.url("/api/voices");
        debug!("fetching remote voice catalog from {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TtsError::synthesis(&self.config.name, format!("voices request: {e}")))?
            .error_for_status()
            .map_err(|e| TtsError::synthesis(&self.config.name, format!("voices request: {e}")))?;

        let raw: BTreeMap<String, RemoteVoice> = response
            .json()
            .await
            .map_err(|e| TtsError::synthesis(&self.config.name, format!("bad voices payload: {e}")))?;

        Ok(raw
            .into_values()
            .map(|v| Voice {
                name: v.name.unwrap_or_else(|| v.id.clone()),
                gender: Gender::parse(v.gender.as_deref().unwrap_or("")),
                language: v.language,
                locale: v.locale,
                tag: v.tag,
                multispeaker: v.multispeaker,
                speakers: v.speakers,
                id: v.id,
            })
            .collect())
    }
}

#[async_trait]
impl TtsEngine for RemoteEngine {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn voices(&self) -> Result<Vec<Voice>> {
        match self.catalog.get_or_try_init(|| self.fetch_catalog()).await {
            Ok(voices) => Ok(voices.clone()),
            Err(e) => {
                // Unreachable server hides its voices instead of failing the
                // whole listing; the next call retries the fetch.
                warn!("remote voice catalog unavailable: {e}");
                Ok(Vec::new())
            }
        }
    }

    async fn say(&self, text: &str, voice_id: &str, opts: &SayOptions) -> Result<Vec<u8>> {
        let voice = match &opts.speaker_id {
            Some(speaker) => format!("{voice_id}#{speaker}"),
            None => voice_id.to_string(),
        };

        let response = self
            .client
            .get(self.url("/api/tts"))
            .query(&[("voice", voice.as_str()), ("text", text)])
            .send()
            .await
            .map_err(|e| TtsError::synthesis(&self.config.name, format!("tts request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TtsError::synthesis(
                &self.config.name,
                format!("server returned {status}: {body}"),
            ));
        }

        let wav = response
            .bytes()
            .await
            .map_err(|e| TtsError::synthesis(&self.config.name, format!("tts response: {e}")))?;

        if wav.is_empty() {
            return Err(TtsError::synthesis(
                &self.config.name,
                format!("no audio for voice '{voice_id}'"),
            ));
        }

        Ok(wav.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config: RemoteEngineConfig =
            serde_json::from_str(r#"{"name": "upstream", "base_url": "http://host:5500"}"#)
                .unwrap();
        assert_eq!(config.timeout_secs, 60);
        assert!(config.verify_tls);
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let engine = RemoteEngine::new(RemoteEngineConfig {
            name: "upstream".into(),
            base_url: "http://host:5500/".into(),
            timeout_secs: 5,
            verify_tls: true,
        })
        .unwrap();

        assert_eq!(engine.url("/api/tts"), "http://host:5500/api/tts");
    }

    #[test]
    fn test_remote_voice_payload_parsing() {
        let raw = r#"{
            "glow-speak:en-us_mary_ann": {
                "id": "glow-speak:en-us_mary_ann",
                "name": "mary_ann",
                "gender": "F",
                "language": "en",
                "locale": "en-us"
            }
        }"#;

        let parsed: BTreeMap<String, RemoteVoice> = serde_json::from_str(raw).unwrap();
        let voice = &parsed["glow-speak:en-us_mary_ann"];
        assert_eq!(voice.id, "glow-speak:en-us_mary_ann");
        assert_eq!(voice.gender.as_deref(), Some("F"));
        assert!(!voice.multispeaker);
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let result = RemoteEngine::new(RemoteEngineConfig {
            name: "x".into(),
            base_url: String::new(),
            timeout_secs: 5,
            verify_tls: true,
        });
        assert!(result.is_err());
    }
}
