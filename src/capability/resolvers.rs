//! Profile credential resolvers.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::ProfileCredentials;
use crate::{Error, Result};

/// Credentials resolved for an AWS named profile.
#[derive(Clone)]
pub struct AwsCredentials {
    /// Access key identifier.
    pub access_key_id: String,
    secret_access_key: SecretString,
    session_token: Option<SecretString>,
}

impl AwsCredentials {
    /// Create from key material.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::from(secret_access_key.into()),
            session_token: None,
        }
    }

    /// Attach a session token.
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(SecretString::from(token.into()));
        self
    }

    /// The secret access key.
    pub fn secret_access_key(&self) -> &str {
        self.secret_access_key.expose_secret()
    }

    /// The session token, if any.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_ref().map(|s| s.expose_secret())
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[redacted]")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

/// Resolver reading `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` /
/// `AWS_SESSION_TOKEN`, ignoring the profile name.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentResolver;

impl EnvironmentResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProfileCredentials for EnvironmentResolver {
    fn name(&self) -> &str {
        "environment"
    }

    async fn resolve(&self, profile: &str) -> Result<AwsCredentials> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID").map_err(|_| {
            Error::missing_credential(format!(
                "AWS_ACCESS_KEY_ID not set (profile '{}')",
                profile
            ))
        })?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY").map_err(|_| {
            Error::missing_credential(format!(
                "AWS_SECRET_ACCESS_KEY not set (profile '{}')",
                profile
            ))
        })?;
        let mut credentials = AwsCredentials::new(access_key_id, secret_access_key);
        if let Ok(token) = std::env::var("AWS_SESSION_TOKEN") {
            credentials = credentials.with_session_token(token);
        }
        Ok(credentials)
    }
}

/// Resolver over a fixed profile map. Useful for embedding applications
/// holding their own credential storage, and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    profiles: HashMap<String, AwsCredentials>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register credentials for `profile`.
    pub fn with_profile(mut self, profile: impl Into<String>, credentials: AwsCredentials) -> Self {
        self.profiles.insert(profile.into(), credentials);
        self
    }
}

#[async_trait]
impl ProfileCredentials for StaticResolver {
    fn name(&self) -> &str {
        "static"
    }

    async fn resolve(&self, profile: &str) -> Result<AwsCredentials> {
        self.profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| Error::missing_credential(format!("unknown profile '{}'", profile)))
    }
}

/// Resolver that tries multiple resolvers in order.
pub struct ChainResolver {
    resolvers: Vec<Box<dyn ProfileCredentials>>,
}

impl ChainResolver {
    /// Create with specified resolvers.
    pub fn new(resolvers: Vec<Box<dyn ProfileCredentials>>) -> Self {
        Self { resolvers }
    }

    /// Add a resolver to the chain.
    pub fn with<R: ProfileCredentials + 'static>(mut self, resolver: R) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }
}

#[async_trait]
impl ProfileCredentials for ChainResolver {
    fn name(&self) -> &str {
        "chain"
    }

    async fn resolve(&self, profile: &str) -> Result<AwsCredentials> {
        let mut errors = Vec::new();

        for resolver in &self.resolvers {
            match resolver.resolve(profile).await {
                Ok(credentials) => {
                    tracing::debug!("profile '{}' resolved from: {}", profile, resolver.name());
                    return Ok(credentials);
                }
                Err(e) => {
                    tracing::debug!("resolver {} failed: {}", resolver.name(), e);
                    errors.push(format!("{}: {}", resolver.name(), e));
                }
            }
        }

        Err(Error::missing_credential(format!(
            "profile '{}' unresolvable. Tried: {}",
            profile,
            errors.join(", ")
        )))
    }
}
