//! Strategy registry and dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use crate::capability::Capabilities;
use crate::params::ResolvedValues;
use crate::request::{RequestDescriptor, SigningResult};
use crate::strategy::{
    AuthStrategy, AwsV4Strategy, BasicStrategy, JwtStrategy, NtlmStrategy, OAuth1Strategy,
    OAuth2Strategy, RequestContext,
};
use crate::{Error, Result};

/// Maps strategy names to implementations and applies them to requests.
///
/// `default()` registers the built-in set under `basic`, `jwt`, `oauth1`,
/// `awsv4`, `windows`, and `oauth2`.
pub struct StrategyRegistry {
    strategies: HashMap<&'static str, Arc<dyn AuthStrategy>>,
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(BasicStrategy::new()));
        registry.register(Arc::new(JwtStrategy::new()));
        registry.register(Arc::new(OAuth1Strategy::new()));
        registry.register(Arc::new(AwsV4Strategy::new()));
        registry.register(Arc::new(NtlmStrategy::new()));
        registry.register(Arc::new(OAuth2Strategy::new()));
        registry
    }
}

impl StrategyRegistry {
    /// A registry with no strategies.
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Register a strategy under its own name, replacing any previous
    /// registration.
    pub fn register(&mut self, strategy: Arc<dyn AuthStrategy>) {
        self.strategies.insert(strategy.name(), strategy);
    }

    /// Look up a strategy by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn AuthStrategy>> {
        self.strategies.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.strategies.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Dispatch one signing attempt: look up `name`, validate `values`
    /// against its schema, and apply it to `request`.
    pub async fn apply(
        &self,
        name: &str,
        request: &RequestDescriptor,
        values: &ResolvedValues,
        capabilities: &Capabilities,
    ) -> Result<SigningResult> {
        let strategy = self.get(name).ok_or_else(|| {
            Error::invalid_configuration(format!("unknown authentication strategy: {}", name))
        })?;
        strategy.schema().validate(values)?;
        tracing::debug!(strategy = name, "applying authentication strategy");
        strategy
            .apply(&RequestContext::new(request, capabilities), values)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_names() {
        let registry = StrategyRegistry::default();
        assert_eq!(
            registry.names(),
            vec!["awsv4", "basic", "jwt", "oauth1", "oauth2", "windows"]
        );
    }

    #[tokio::test]
    async fn test_unknown_strategy_is_configuration_error() {
        let registry = StrategyRegistry::default();
        let request = RequestDescriptor::new("GET", "https://example.com/");
        let err = registry
            .apply("digest", &request, &ResolvedValues::new(), &Capabilities::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration { .. }));
        assert!(err.to_string().contains("digest"));
    }

    #[tokio::test]
    async fn test_dispatch_basic() {
        let registry = StrategyRegistry::default();
        let request = RequestDescriptor::new("GET", "https://example.com/");
        let values = ResolvedValues::new()
            .with_str("username", "user")
            .with_str("password", "pass");

        let result = registry
            .apply("basic", &request, &values, &Capabilities::new())
            .await
            .unwrap();
        assert_eq!(result.set_headers[0].1, "Basic dXNlcjpwYXNz");
    }

    #[tokio::test]
    async fn test_schema_validation_runs_before_apply() {
        let registry = StrategyRegistry::default();
        let request = RequestDescriptor::new("GET", "https://example.com/");

        // oauth2 requires its endpoint URLs.
        let err = registry
            .apply("oauth2", &request, &ResolvedValues::new(), &Capabilities::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration { .. }));
    }
}
