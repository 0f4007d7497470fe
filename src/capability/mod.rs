//! Injected collaborator capabilities consumed by strategies.
//!
//! Strategies never reach for globals: network access, interactive
//! redirects, profile credentials, and token persistence all arrive through
//! [`Capabilities`]. Tests substitute deterministic fakes.

mod http;
mod redirect;
mod resolvers;
mod store;

pub use http::ReqwestSender;
pub use redirect::{NavigationEvent, RedirectHost, RedirectSession};
pub use resolvers::{AwsCredentials, ChainResolver, EnvironmentResolver, StaticResolver};
pub use store::{InMemoryStore, KeyValueStore};

use std::sync::Arc;

use async_trait::async_trait;

use crate::request::{RequestDescriptor, ResponseDescriptor};
use crate::{Error, Result};

/// Auxiliary HTTP request sender (consumed by NTLM and OAuth 2.0).
#[async_trait]
pub trait HttpSend: Send + Sync {
    /// Issue `request` and return its response.
    async fn send(&self, request: &RequestDescriptor) -> Result<ResponseDescriptor>;
}

#[async_trait]
impl<T: HttpSend + ?Sized> HttpSend for Arc<T> {
    async fn send(&self, request: &RequestDescriptor) -> Result<ResponseDescriptor> {
        (**self).send(request).await
    }
}

/// Named-profile credential resolver (consumed by AWS SigV4).
#[async_trait]
pub trait ProfileCredentials: Send + Sync {
    /// Resolver name for debugging.
    fn name(&self) -> &str;

    /// Resolve credentials for `profile`.
    async fn resolve(&self, profile: &str) -> Result<AwsCredentials>;
}

#[async_trait]
impl<T: ProfileCredentials + ?Sized> ProfileCredentials for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn resolve(&self, profile: &str) -> Result<AwsCredentials> {
        (**self).resolve(profile).await
    }
}

/// The capability set handed to a signing attempt.
///
/// Every slot is optional; a strategy needing an absent capability fails
/// with an invalid-configuration error naming it.
#[derive(Clone, Default)]
pub struct Capabilities {
    http: Option<Arc<dyn HttpSend>>,
    redirect: Option<Arc<dyn RedirectHost>>,
    profiles: Option<Arc<dyn ProfileCredentials>>,
    store: Option<Arc<dyn KeyValueStore>>,
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("http", &self.http.is_some())
            .field("redirect", &self.redirect.is_some())
            .field("profiles", &self.profiles.is_some())
            .field("store", &self.store.is_some())
            .finish()
    }
}

impl Capabilities {
    /// An empty capability set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an auxiliary request sender.
    pub fn with_http(mut self, sender: impl HttpSend + 'static) -> Self {
        self.http = Some(Arc::new(sender));
        self
    }

    /// Attach an interactive redirect host.
    pub fn with_redirect(mut self, host: impl RedirectHost + 'static) -> Self {
        self.redirect = Some(Arc::new(host));
        self
    }

    /// Attach a profile credential resolver.
    pub fn with_profiles(mut self, resolver: impl ProfileCredentials + 'static) -> Self {
        self.profiles = Some(Arc::new(resolver));
        self
    }

    /// Attach a key-value store.
    pub fn with_store(mut self, store: impl KeyValueStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// The auxiliary sender, or an error naming the missing capability.
    pub fn http(&self) -> Result<Arc<dyn HttpSend>> {
        self.http
            .clone()
            .ok_or_else(|| Error::invalid_configuration("no auxiliary HTTP sender capability"))
    }

    /// The redirect host, or an error naming the missing capability.
    pub fn redirect(&self) -> Result<Arc<dyn RedirectHost>> {
        self.redirect
            .clone()
            .ok_or_else(|| Error::invalid_configuration("no interactive redirect capability"))
    }

    /// The profile resolver, or an error naming the missing capability.
    pub fn profiles(&self) -> Result<Arc<dyn ProfileCredentials>> {
        self.profiles
            .clone()
            .ok_or_else(|| Error::invalid_configuration("no profile credential capability"))
    }

    /// The key-value store, if attached.
    pub fn store(&self) -> Option<Arc<dyn KeyValueStore>> {
        self.store.clone()
    }
}
