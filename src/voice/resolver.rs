//! Voice alias resolution
//!
//! Maps user-facing language/voice shorthand ("en", "de-de", "fr#2") to a
//! concrete `engine:voice[#speaker]` reference against the set of engines
//! that actually loaded. Deployments can drop an engine without breaking
//! every alias that mentions it: resolution skips candidates whose engine
//! is not registered.

use std::collections::BTreeMap;

use crate::core::error::{Result, TtsError};
use crate::engine::registry::EngineRegistry;

/// Alias table plus resolution logic
#[derive(Debug, Clone, Default)]
pub struct VoiceResolver {
    /// Language/locale code or symbolic name -> preferred voices in order
    aliases: BTreeMap<String, Vec<String>>,
}

impl VoiceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver preloaded with the stock language aliases
    pub fn with_defaults() -> Self {
        let mut resolver = Self::new();

        for (lang, voices) in DEFAULT_ALIASES {
            resolver.aliases.insert(
                (*lang).to_string(),
                voices.iter().map(|v| (*v).to_string()).collect(),
            );
        }

        resolver
    }

    /// Insert a user-preferred voice for a language with highest priority
    pub fn prefer(&mut self, lang: &str, voice: &str) {
        self.aliases
            .entry(lang.to_ascii_lowercase())
            .or_default()
            .insert(0, voice.to_string());
    }

    /// Alias entries for a language, if any
    pub fn aliases_for(&self, lang: &str) -> Option<&[String]> {
        self.aliases.get(&lang.to_ascii_lowercase()).map(Vec::as_slice)
    }

    /// Resolve a voice or language string to `engine:voice[#speaker]`
    ///
    /// Candidates are tried in order: alias entries, the caller-supplied
    /// fallback, the original input, and finally an `espeak:` rendition of
    /// the input when it carried no explicit engine prefix. The first
    /// candidate whose engine prefix names a registered engine wins. A
    /// stripped `#speaker` suffix is reattached to the winner.
    pub fn resolve(
        &self,
        registry: &EngineRegistry,
        voice: &str,
        fallback: Option<&str>,
    ) -> Result<String> {
        let voice = voice.trim();

        // Strip an optional #speaker_id suffix before alias lookup
        let (base, speaker_id) = match voice.split_once('#') {
            Some((base, speaker)) => (base, Some(speaker)),
            None => (voice, None),
        };

        let mut alias_key = base.to_ascii_lowercase();
        if !self.aliases.contains_key(&alias_key) {
            // en-US -> en, per language-tag fallback
            alias_key = alias_key
                .split(['-', '_'])
                .next()
                .unwrap_or(&alias_key)
                .to_string();
        }

        let espeak_candidate = format!("espeak:{base}");

        let mut candidates: Vec<&str> = Vec::new();
        if let Some(entries) = self.aliases.get(&alias_key) {
            candidates.extend(entries.iter().map(String::as_str));
        }
        if let Some(fallback) = fallback {
            candidates.push(fallback);
        }
        candidates.push(base);
        if !base.contains(':') {
            candidates.push(&espeak_candidate);
        }

        for candidate in candidates {
            let Some((engine, _voice_id)) = candidate.split_once(':') else {
                continue;
            };

            if registry.contains(engine) {
                // If the engine loaded, assume the voice is present
                return Ok(match speaker_id {
                    Some(speaker) if !candidate.contains('#') => format!("{candidate}#{speaker}"),
                    _ => candidate.to_string(),
                });
            }
        }

        Err(TtsError::Resolution {
            voice: voice.to_string(),
        })
    }
}

/// Stock aliases: language/locale -> preferred `engine:voice` entries
const DEFAULT_ALIASES: &[(&str, &[&str])] = &[
    ("en", &["glow-speak:en-us_mary_ann", "flite:cmu_us_slt"]),
    ("en-gb", &["marytts:dfki-spike-hsmm", "espeak:en-gb"]),
    ("de", &["glow-speak:de_thorsten", "marytts:bits1-hsmm"]),
    ("es", &["glow-speak:es_tux", "espeak:es"]),
    ("fr", &["glow-speak:fr_siwis", "espeak:fr"]),
    ("it", &["glow-speak:it_riccardo_fasol", "espeak:it"]),
    ("el", &["glow-speak:el_rapunzelina"]),
    ("fi", &["glow-speak:fi_harri_tapani_ylilammi"]),
    ("hu", &["glow-speak:hu_diana_majlinger"]),
    ("ko", &["glow-speak:ko_kss"]),
    ("nl", &["glow-speak:nl_rdh"]),
    ("ru", &["glow-speak:ru_nikolaev"]),
    ("sv", &["glow-speak:sv_talesyntese"]),
    ("sw", &["glow-speak:sw_biblia_takatifu"]),
    ("bn", &["flite:cmu_indic_ben_rm"]),
    ("gu", &["flite:cmu_indic_guj_ad"]),
    ("hi", &["flite:cmu_indic_hin_ab"]),
    ("kn", &["flite:cmu_indic_kan_plv"]),
    ("mr", &["flite:cmu_indic_mar_aup"]),
    ("pa", &["flite:cmu_indic_pan_amp"]),
    ("ta", &["flite:cmu_indic_tam_sdr"]),
    ("te", &["marytts:cmu-nk-hsmm", "flite:cmu_indic_tel_kpn"]),
    ("tr", &["marytts:dfki-ot-hsmm"]),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::traits::{SayOptions, TtsEngine, Voice};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NamedStub(&'static str);

    #[async_trait]
    impl TtsEngine for NamedStub {
        fn name(&self) -> &str {
            self.0
        }

        async fn voices(&self) -> crate::core::Result<Vec<Voice>> {
            Ok(vec![])
        }

        async fn say(
            &self,
            _text: &str,
            _voice_id: &str,
            _opts: &SayOptions,
        ) -> crate::core::Result<Vec<u8>> {
            Ok(vec![])
        }
    }

    fn registry(names: &[&'static str]) -> EngineRegistry {
        EngineRegistry::new(
            names
                .iter()
                .map(|n| Arc::new(NamedStub(n)) as Arc<dyn TtsEngine>)
                .collect(),
        )
    }

    fn test_resolver() -> VoiceResolver {
        let mut resolver = VoiceResolver::new();
        resolver
            .aliases
            .insert("en".into(), vec!["x:v1".into(), "y:v2".into()]);
        resolver
    }

    #[test]
    fn test_fallback_chain_skips_unregistered_engine() {
        let resolver = test_resolver();
        let registry = registry(&["y"]);

        assert_eq!(resolver.resolve(&registry, "en", None).unwrap(), "y:v2");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let resolver = test_resolver();
        let registry = registry(&["x", "y"]);

        let first = resolver.resolve(&registry, "en", None).unwrap();
        for _ in 0..5 {
            assert_eq!(resolver.resolve(&registry, "en", None).unwrap(), first);
        }
        assert_eq!(first, "x:v1");
    }

    #[test]
    fn test_speaker_id_round_trip() {
        let resolver = test_resolver();
        let registry = registry(&["y"]);

        assert_eq!(resolver.resolve(&registry, "en#3", None).unwrap(), "y:v2#3");
    }

    #[test]
    fn test_locale_falls_back_to_primary_subtag() {
        let resolver = test_resolver();
        let registry = registry(&["y"]);

        assert_eq!(resolver.resolve(&registry, "en-US", None).unwrap(), "y:v2");
    }

    #[test]
    fn test_explicit_engine_reference_wins_without_alias() {
        let resolver = test_resolver();
        let registry = registry(&["marytts"]);

        assert_eq!(
            resolver
                .resolve(&registry, "marytts:cmu-slt-hsmm", None)
                .unwrap(),
            "marytts:cmu-slt-hsmm"
        );
    }

    #[test]
    fn test_espeak_last_resort_for_bare_language() {
        let resolver = VoiceResolver::new();
        let registry = registry(&["espeak"]);

        assert_eq!(resolver.resolve(&registry, "pt", None).unwrap(), "espeak:pt");
    }

    #[test]
    fn test_no_espeak_synthesis_for_prefixed_input() {
        let resolver = VoiceResolver::new();
        let registry = registry(&["espeak"]);

        // Input carries an engine prefix, so no espeak:<input> candidate
        assert!(resolver.resolve(&registry, "gone:v1", None).is_err());
    }

    #[test]
    fn test_caller_fallback_considered_before_input() {
        let resolver = VoiceResolver::new();
        let registry = registry(&["y"]);

        assert_eq!(
            resolver
                .resolve(&registry, "x:v1", Some("y:v9"))
                .unwrap(),
            "y:v9"
        );
    }

    #[test]
    fn test_unresolvable_voice_errors() {
        let resolver = test_resolver();
        let registry = registry(&[]);

        assert!(matches!(
            resolver.resolve(&registry, "en", None),
            Err(TtsError::Resolution { .. })
        ));
    }

    #[test]
    fn test_preferred_voice_takes_priority() {
        let mut resolver = test_resolver();
        resolver.prefer("en", "z:best");
        let registry = registry(&["x", "z"]);

        assert_eq!(resolver.resolve(&registry, "en", None).unwrap(), "z:best");
    }

    #[test]
    fn test_alias_lookup_is_case_insensitive() {
        let resolver = test_resolver();
        let registry = registry(&["x"]);

        assert_eq!(resolver.resolve(&registry, "EN", None).unwrap(), "x:v1");
    }
}
