//! Provider registry.
//!
//! Resolves a provider identifier to its adapter. Built once at startup and
//! read-only afterwards; unknown identifiers fail closed.

use crate::error::{RideError, Result};
use crate::providers::RideProvider;
use crate::state::ProviderId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Adapters keyed by provider identifier.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Arc<dyn RideProvider>>,
}

impl ProviderRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own identity, replacing any previous one.
    pub fn register(&mut self, provider: Arc<dyn RideProvider>) {
        self.providers.insert(provider.id().clone(), provider);
    }

    /// Builder form of [`Self::register`].
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn RideProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Resolve an identifier to its adapter.
    ///
    /// # Errors
    ///
    /// Returns [`RideError::UnknownProvider`] if nothing is registered under
    /// `provider`.
    pub fn resolve(&self, provider: &str) -> Result<Arc<dyn RideProvider>> {
        self.providers
            .get(&ProviderId::new(provider))
            .cloned()
            .ok_or_else(|| RideError::UnknownProvider {
                provider: provider.to_string(),
            })
    }

    /// Registered identifiers.
    pub fn provider_ids(&self) -> impl Iterator<Item = &ProviderId> {
        self.providers.keys()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::MockRideProvider;

    #[test]
    fn test_resolve_registered_provider() {
        let registry = ProviderRegistry::new().with_provider(Arc::new(MockRideProvider::new("UBER")));

        let provider = registry.resolve("UBER").unwrap();
        assert_eq!(provider.id().as_str(), "UBER");
    }

    #[test]
    fn test_unknown_provider_fails_closed() {
        let registry = ProviderRegistry::new().with_provider(Arc::new(MockRideProvider::new("UBER")));

        let result = registry.resolve("LYFT");
        assert!(matches!(
            result,
            Err(RideError::UnknownProvider { ref provider }) if provider == "LYFT"
        ));
        assert!(registry.resolve("uber").is_err());
    }
}
