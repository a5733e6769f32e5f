//! Integration tests for the gateway
//!
//! Exercises the full path from request to WAV with stub engines standing
//! in for the real backends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use voxgate::audio::encode_wav_i16;
use voxgate::gateway::{Gateway, GatewayRequest, VoiceFilter};
use voxgate::{
    EngineRegistry, Gender, Result, SayOptions, TtsEngine, TtsError, Voice, VoiceResolver,
    WavCache,
};

/// Stub engine: a 1-second constant-valued "tone" per call, plus a counter
struct ToneEngine {
    name: &'static str,
    sample_rate: u32,
    value: i16,
    calls: AtomicUsize,
}

impl ToneEngine {
    fn new(name: &'static str, sample_rate: u32, value: i16) -> Arc<Self> {
        Arc::new(Self {
            name,
            sample_rate,
            value,
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TtsEngine for ToneEngine {
    fn name(&self) -> &str {
        self.name
    }

    async fn voices(&self) -> Result<Vec<Voice>> {
        Ok(vec![Voice::new("A", "A", Gender::Female, "en", "en-us")])
    }

    async fn say(&self, _text: &str, _voice_id: &str, _opts: &SayOptions) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let samples = vec![self.value; self.sample_rate as usize];
        encode_wav_i16(&samples, self.sample_rate, 1)
    }
}

fn gateway_with(engines: Vec<Arc<dyn TtsEngine>>, cache: Option<WavCache>) -> Gateway {
    Gateway::new(
        Arc::new(EngineRegistry::new(engines)),
        VoiceResolver::new(),
        cache,
    )
}

fn request(text: &str, voice: &str, use_cache: bool) -> GatewayRequest {
    GatewayRequest {
        text: text.to_string(),
        voice: voice.to_string(),
        lang: "en".to_string(),
        ssml: false,
        options: SayOptions::default(),
        use_cache,
    }
}

fn wav_spec(wav: &[u8]) -> (hound::WavSpec, u32) {
    let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
    (reader.spec(), reader.len())
}

#[tokio::test]
async fn two_line_request_yields_two_seconds_of_mono_wav() {
    let engine = ToneEngine::new("test", 8000, 120);
    let gateway = gateway_with(vec![engine.clone()], None);

    let wav = gateway
        .synthesize(request("Hello.\nGoodbye.", "test:A", false))
        .await
        .unwrap();

    let (spec, frames) = wav_spec(&wav);
    assert_eq!(spec.sample_rate, 8000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);

    let duration = frames as f64 / spec.sample_rate as f64;
    assert!((duration - 2.0).abs() < 0.05, "duration {duration}");
    assert_eq!(engine.call_count(), 2);
}

#[tokio::test]
async fn cached_synthesis_is_byte_identical_and_skips_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    let engine = ToneEngine::new("test", 8000, 120);
    let gateway = gateway_with(
        vec![engine.clone()],
        Some(WavCache::new(dir.path()).unwrap()),
    );

    let first = gateway
        .synthesize(request("Hello.", "test:A", true))
        .await
        .unwrap();
    assert_eq!(engine.call_count(), 1);

    let second = gateway
        .synthesize(request("Hello.", "test:A", true))
        .await
        .unwrap();

    assert_eq!(first, second);
    // The second call was served from the cache
    assert_eq!(engine.call_count(), 1);
}

#[tokio::test]
async fn cache_disabled_by_request_always_synthesizes() {
    let dir = tempfile::tempdir().unwrap();
    let engine = ToneEngine::new("test", 8000, 120);
    let gateway = gateway_with(
        vec![engine.clone()],
        Some(WavCache::new(dir.path()).unwrap()),
    );

    gateway
        .synthesize(request("Hello.", "test:A", false))
        .await
        .unwrap();
    gateway
        .synthesize(request("Hello.", "test:A", false))
        .await
        .unwrap();

    assert_eq!(engine.call_count(), 2);
}

#[tokio::test]
async fn unwritable_cache_does_not_block_synthesis() {
    let dir = tempfile::tempdir().unwrap();
    let cache = WavCache::new(dir.path()).unwrap();
    // Pull the directory out from under the cache
    std::fs::remove_dir_all(dir.path()).unwrap();

    let engine = ToneEngine::new("test", 8000, 120);
    let gateway = gateway_with(vec![engine.clone()], Some(cache));

    let wav = gateway
        .synthesize(request("Hello.", "test:A", true))
        .await
        .unwrap();

    let (spec, _) = wav_spec(&wav);
    assert_eq!(spec.sample_rate, 8000);
    assert_eq!(engine.call_count(), 1);
}

#[tokio::test]
async fn different_options_use_different_cache_entries() {
    let dir = tempfile::tempdir().unwrap();
    let engine = ToneEngine::new("test", 8000, 120);
    let gateway = gateway_with(
        vec![engine.clone()],
        Some(WavCache::new(dir.path()).unwrap()),
    );

    let mut with_noise = request("Hello.", "test:A", true);
    with_noise.options.noise_scale = Some(0.9);

    gateway
        .synthesize(request("Hello.", "test:A", true))
        .await
        .unwrap();
    gateway.synthesize(with_noise).await.unwrap();

    assert_eq!(engine.call_count(), 2);
}

#[tokio::test]
async fn empty_engine_output_fails_the_whole_request() {
    struct EmptyEngine;

    #[async_trait]
    impl TtsEngine for EmptyEngine {
        fn name(&self) -> &str {
            "empty"
        }

        async fn voices(&self) -> Result<Vec<Voice>> {
            Ok(vec![])
        }

        async fn say(&self, _: &str, _: &str, _: &SayOptions) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    let gateway = gateway_with(vec![Arc::new(EmptyEngine)], None);
    let result = gateway.synthesize(request("a\nb\nc", "empty:A", false)).await;
    assert!(matches!(result, Err(TtsError::Synthesis { .. })));
}

#[tokio::test]
async fn assembly_preserves_unit_order_across_engines() {
    // Distinct tone values per engine make the frame order observable
    let one = ToneEngine::new("one", 8000, 10);
    let two = ToneEngine::new("two", 8000, 20);
    let gateway = gateway_with(vec![one, two], None);

    let mut req = request(
        "<speak><voice name=\"one:A\">First.</voice>\
         <voice name=\"two:B\">Second.</voice>\
         <voice name=\"one:A\">Third.</voice></speak>",
        "one:A",
        false,
    );
    req.ssml = true;

    let wav = gateway.synthesize(req).await.unwrap();
    let reader = hound::WavReader::new(std::io::Cursor::new(&wav)).unwrap();
    let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();

    assert_eq!(samples.len(), 3 * 8000);
    assert!(samples[..8000].iter().all(|&s| s == 10));
    assert!(samples[8000..16000].iter().all(|&s| s == 20));
    assert!(samples[16000..].iter().all(|&s| s == 10));
}

#[tokio::test]
async fn mixed_sample_rates_promote_to_the_maximum() {
    let low = ToneEngine::new("low", 16000, 50);
    let high = ToneEngine::new("high", 22050, 50);
    let gateway = gateway_with(vec![low, high], None);

    let mut req = request(
        "<speak><voice name=\"low:A\">One.</voice>\
         <voice name=\"high:B\">Two.</voice></speak>",
        "low:A",
        false,
    );
    req.ssml = true;

    let wav = gateway.synthesize(req).await.unwrap();
    let (spec, frames) = wav_spec(&wav);

    assert_eq!(spec.sample_rate, 22050);
    // Both one-second units land at ~22050 frames each after promotion
    let expected = 2.0 * 22050.0;
    assert!((frames as f64 - expected).abs() < expected * 0.1);
}

#[tokio::test]
async fn ssml_break_inserts_exact_silence() {
    let engine = ToneEngine::new("test", 22050, 99);
    let gateway = gateway_with(vec![engine], None);

    let mut req = request(
        "<speak>One.<break time=\"500ms\"/>Two.</speak>",
        "test:A",
        false,
    );
    req.ssml = true;

    let wav = gateway.synthesize(req).await.unwrap();
    let reader = hound::WavReader::new(std::io::Cursor::new(&wav)).unwrap();
    let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();

    // 500 ms at 22050 Hz 16-bit mono is ceil(0.5 * 22050 * 2) bytes of zeros
    let silence_samples = (0.5f64 * 22050.0 * 2.0).ceil() as usize / 2;
    assert_eq!(samples.len(), 22050 + silence_samples + 22050);
    assert!(samples[22050..22050 + silence_samples].iter().all(|&s| s == 0));
}

#[tokio::test]
async fn voice_listing_filters_by_engine_and_language() {
    let one = ToneEngine::new("one", 8000, 1);
    let two = ToneEngine::new("two", 8000, 2);
    let gateway = gateway_with(vec![one, two], None);

    let all = gateway.list_voices(&VoiceFilter::default()).await;
    assert_eq!(all.len(), 2);
    assert!(all.iter().any(|(id, _)| id == "one:A"));

    let only_one = gateway
        .list_voices(&VoiceFilter {
            engine: Some("one".to_string()),
            ..VoiceFilter::default()
        })
        .await;
    assert_eq!(only_one.len(), 1);

    let no_german = gateway
        .list_voices(&VoiceFilter {
            language: Some("de".to_string()),
            ..VoiceFilter::default()
        })
        .await;
    assert!(no_german.is_empty());
}

#[tokio::test]
async fn language_listing_collects_codes() {
    let engine = ToneEngine::new("test", 8000, 1);
    let gateway = gateway_with(vec![engine], None);

    let languages = gateway.list_languages(None).await;
    assert!(languages.contains("en"));
    assert_eq!(languages.len(), 1);
}

#[tokio::test]
async fn failing_voice_enumeration_degrades_to_empty() {
    struct BrokenVoices;

    #[async_trait]
    impl TtsEngine for BrokenVoices {
        fn name(&self) -> &str {
            "broken"
        }

        async fn voices(&self) -> Result<Vec<Voice>> {
            Err(TtsError::synthesis("broken", "probe exploded"))
        }

        async fn say(&self, _: &str, _: &str, _: &SayOptions) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    let good = ToneEngine::new("good", 8000, 1);
    let gateway = gateway_with(vec![Arc::new(BrokenVoices), good], None);

    // The broken engine is skipped; the listing still succeeds
    let all = gateway.list_voices(&VoiceFilter::default()).await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].0, "good:A");
}
