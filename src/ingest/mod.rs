// src/ingest/mod.rs
pub mod providers;
pub mod types;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::ingest::providers::vieon::VieOnProvider;
use crate::ingest::types::RankingProvider;

/// Maps a ranking's provider type to its implementation. Adding a
/// provider means registering a variant here, not branching in the
/// pipeline.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn RankingProvider>>,
}

impl ProviderRegistry {
    /// Registry with every built-in provider. One today: `vieon`.
    pub fn builtin() -> Self {
        let mut reg = Self::default();
        reg.register(Arc::new(VieOnProvider::new()));
        reg
    }

    pub fn register(&mut self, provider: Arc<dyn RankingProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn resolve(&self, provider_type: &str) -> Result<Arc<dyn RankingProvider>> {
        self.providers
            .get(provider_type)
            .cloned()
            .ok_or_else(|| Error::UnknownProvider(provider_type.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_resolves_vieon() {
        let reg = ProviderRegistry::builtin();
        assert_eq!(reg.resolve("vieon").unwrap().name(), "vieon");
    }

    #[test]
    fn unknown_type_is_an_error() {
        let reg = ProviderRegistry::builtin();
        let err = reg.resolve("youtube").unwrap_err();
        assert!(matches!(err, Error::UnknownProvider(_)));
    }
}
