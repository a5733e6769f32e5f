//! Engine registry
//!
//! Maps short engine names to adapter instances. Built once from startup
//! configuration and never mutated at request time; the registry is passed
//! by reference into the resolver and orchestrator instead of living in
//! process-global state.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::traits::TtsEngine;

/// Immutable engine name -> adapter mapping
pub struct EngineRegistry {
    engines: BTreeMap<String, Arc<dyn TtsEngine>>,
}

impl EngineRegistry {
    /// Build a registry from the engines that survived startup probing
    pub fn new(engines: Vec<Arc<dyn TtsEngine>>) -> Self {
        let engines = engines
            .into_iter()
            .map(|engine| (engine.name().to_string(), engine))
            .collect();

        Self { engines }
    }

    /// Look up an engine by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn TtsEngine>> {
        self.engines.get(name).cloned()
    }

    /// Whether an engine with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.engines.contains_key(name)
    }

    /// Registered engine names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.engines.keys().map(String::as_str).collect()
    }

    /// Iterate over (name, engine) pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn TtsEngine>)> {
        self.engines.iter().map(|(name, engine)| (name.as_str(), engine))
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::traits::{SayOptions, Voice};
    use async_trait::async_trait;

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

    #[test]
    fn test_registry_lookup() {
        let registry =
            EngineRegistry::new(vec![Arc::new(NamedStub("espeak")), Arc::new(NamedStub("flite"))]);

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("espeak"));
        assert!(!registry.contains("marytts"));
        assert_eq!(registry.names(), vec!["espeak", "flite"]);
        assert!(registry.get("flite").is_some());
    }

    #[test]
    fn test_empty_registry() {
        let registry = EngineRegistry::new(vec![]);
        assert!(registry.is_empty());
        assert!(registry.get("espeak").is_none());
    }
}
