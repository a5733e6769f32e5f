//! HTTP route handlers
//!
//! Handlers translate query parameters into `Gateway` calls and typed
//! errors into plain-text 500 responses; no synthesis logic lives here.
//! `/process` and `/voices` exist for MaryTTS client compatibility.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::Deserialize;
use tracing::error;

use crate::core::error::TtsError;
use crate::engine::traits::{SayOptions, VocoderQuality};
use crate::gateway::{GatewayRequest, VoiceFilter};

use super::AppState;

fn convert_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "on" | "1" | "enable"
    )
}

fn error_response(err: TtsError) -> Response {
    error!("{err}");
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    (status, err.to_string()).into_response()
}

fn wav_response(wav: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "audio/wav")], wav).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsParams {
    #[serde(default)]
    voice: String,
    lang: Option<String>,
    text: Option<String>,
    cache: Option<String>,
    ssml: Option<String>,
    vocoder: Option<String>,
    denoiser_strength: Option<f32>,
    noise_scale: Option<f32>,
    length_scale: Option<f32>,
    speaker_id: Option<String>,
}

/// GET /api/tts: text from the query string
pub async fn tts_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TtsParams>,
) -> Response {
    let text = params.text.clone().unwrap_or_default();
    run_tts(&state, params, text).await
}

/// POST /api/tts: text from the request body
pub async fn tts_post(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TtsParams>,
    body: String,
) -> Response {
    run_tts(&state, params, body).await
}

async fn run_tts(state: &AppState, params: TtsParams, text: String) -> Response {
    if params.voice.is_empty() {
        return (StatusCode::BAD_REQUEST, "no voice provided").into_response();
    }
    if text.is_empty() {
        return (StatusCode::BAD_REQUEST, "no text provided").into_response();
    }

    let mut voice = params.voice;
    if let Some(speaker) = params.speaker_id.filter(|s| !s.is_empty()) {
        if !voice.contains('#') {
            voice = format!("{voice}#{speaker}");
        }
    }

    let vocoder_quality = params
        .vocoder
        .as_deref()
        .and_then(|v| VocoderQuality::from_str(v).ok())
        .or(state.defaults.vocoder_quality);

    let options = SayOptions {
        speaker_id: None,
        vocoder_quality,
        noise_scale: params.noise_scale.or(state.defaults.noise_scale),
        length_scale: params.length_scale.or(state.defaults.length_scale),
        denoiser_strength: params.denoiser_strength.or(state.defaults.denoiser_strength),
    };

    let request = GatewayRequest {
        text,
        voice,
        lang: params
            .lang
            .unwrap_or_else(|| state.default_language.clone()),
        ssml: params.ssml.as_deref().map(convert_bool).unwrap_or(false),
        options,
        use_cache: params.cache.as_deref().map(convert_bool).unwrap_or(false),
    };

    match state.gateway.synthesize(request).await {
        Ok(wav) => wav_response(wav),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct VoicesParams {
    language: Option<String>,
    locale: Option<String>,
    gender: Option<String>,
    tts_name: Option<String>,
}

/// GET /api/voices
pub async fn voices(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VoicesParams>,
) -> Json<serde_json::Value> {
    let filter = VoiceFilter {
        language: params.language,
        locale: params.locale,
        gender: params.gender,
        engine: params.tts_name,
    };

    let mut map = serde_json::Map::new();
    for (full_id, voice) in state.gateway.list_voices(&filter).await {
        let engine_name = full_id.split(':').next().unwrap_or_default().to_string();
        let mut value = serde_json::to_value(&voice).unwrap_or_default();
        if let Some(object) = value.as_object_mut() {
            object.insert("tts_name".to_string(), engine_name.into());
        }
        map.insert(full_id, value);
    }

    Json(serde_json::Value::Object(map))
}

#[derive(Debug, Deserialize)]
pub struct LanguagesParams {
    tts_name: Option<String>,
}

/// GET /api/languages
pub async fn languages(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LanguagesParams>,
) -> Json<Vec<String>> {
    let languages = state
        .gateway
        .list_languages(params.tts_name.as_deref())
        .await;

    Json(languages.into_iter().collect())
}

#[derive(Debug, Deserialize, Default)]
pub struct ProcessParams {
    #[serde(rename = "INPUT_TEXT")]
    input_text: Option<String>,
    #[serde(rename = "VOICE")]
    voice: Option<String>,
}

/// GET /process: MaryTTS-compatible synthesis endpoint
pub async fn process_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProcessParams>,
) -> Response {
    run_process(&state, params).await
}

/// POST /process: MaryTTS-compatible, form-encoded body
pub async fn process_post(
    State(state): State<Arc<AppState>>,
    Form(params): Form<ProcessParams>,
) -> Response {
    run_process(&state, params).await
}

async fn run_process(state: &AppState, params: ProcessParams) -> Response {
    let text = params.input_text.unwrap_or_default();
    let mut voice = params.voice.unwrap_or_default();
    if text.is_empty() || voice.is_empty() {
        return (StatusCode::BAD_REQUEST, "INPUT_TEXT and VOICE are required").into_response();
    }

    // MaryTTS clients can append the vocoder quality: <VOICE>;<VOCODER>
    let mut vocoder_quality = state.defaults.vocoder_quality;
    if let Some((voice_part, vocoder_part)) = voice.split_once(';') {
        vocoder_quality = VocoderQuality::from_str(vocoder_part).ok().or(vocoder_quality);
        voice = voice_part.to_string();
    }

    let request = GatewayRequest {
        text,
        voice,
        lang: state.default_language.clone(),
        ssml: false,
        options: SayOptions {
            speaker_id: None,
            vocoder_quality,
            noise_scale: state.defaults.noise_scale,
            length_scale: state.defaults.length_scale,
            denoiser_strength: state.defaults.denoiser_strength,
        },
        use_cache: false,
    };

    match state.gateway.synthesize(request).await {
        Ok(wav) => wav_response(wav),
        Err(err) => error_response(err),
    }
}

/// GET /voices: MaryTTS-compatible plain-text voice list
pub async fn voices_plain(State(state): State<Arc<AppState>>) -> String {
    state
        .gateway
        .list_voices(&VoiceFilter::default())
        .await
        .into_iter()
        .map(|(full_id, _)| full_id)
        .collect::<Vec<_>>()
        .join("\n")
}

/// GET /version
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_bool() {
        assert!(convert_bool("true"));
        assert!(convert_bool(" YES "));
        assert!(convert_bool("1"));
        assert!(!convert_bool("false"));
        assert!(!convert_bool("0"));
        assert!(!convert_bool(""));
    }
}
