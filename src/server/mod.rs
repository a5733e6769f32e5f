//! Thin HTTP surface over the gateway
//!
//! Routes, shared state, and middleware wiring. All synthesis behavior
//! lives behind the `Gateway`; this layer only speaks HTTP.

pub mod routes;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::engine::traits::VocoderQuality;
use crate::gateway::Gateway;

/// Request-level defaults injected when query parameters are absent
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestDefaults {
    pub vocoder_quality: Option<VocoderQuality>,
    pub noise_scale: Option<f32>,
    pub length_scale: Option<f32>,
    pub denoiser_strength: Option<f32>,
}

/// State shared across handlers
pub struct AppState {
    pub gateway: Gateway,
    pub defaults: RequestDefaults,
    pub default_language: String,
}

/// Build the router with all routes and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/tts", get(routes::tts_get).post(routes::tts_post))
        .route("/api/voices", get(routes::voices))
        .route("/api/languages", get(routes::languages))
        // MaryTTS compatibility layer
        .route("/process", get(routes::process_get).post(routes::process_post))
        .route("/voices", get(routes::voices_plain))
        .route("/version", get(routes::version))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Serve until the process is stopped
pub async fn serve(state: Arc<AppState>, host: &str, port: u16) -> anyhow::Result<()> {
    let router = create_router(state);
    let addr = format!("{host}:{port}");
    tracing::info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
