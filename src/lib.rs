//! # wiresign
//!
//! Pluggable HTTP request authentication signing.
//!
//! This crate turns an outgoing HTTP request descriptor into a patch of
//! headers and query parameters carrying valid proof of identity for a
//! target server. Six wire protocols are implemented: HTTP Basic,
//! Bearer/JWT, OAuth 1.0a, AWS Signature V4, NTLM challenge-response, and
//! OAuth 2.0 authorization-code.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wiresign::{Capabilities, RequestDescriptor, ResolvedValues, StrategyRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), wiresign::Error> {
//!     let registry = StrategyRegistry::default();
//!     let request = RequestDescriptor::new("GET", "https://api.example.com/items");
//!     let values = ResolvedValues::new()
//!         .with_str("username", "user")
//!         .with_str("password", "pass");
//!
//!     let patch = registry
//!         .apply("basic", &request, &values, &Capabilities::new())
//!         .await?;
//!     let signed = patch.apply_to(&request)?;
//!     println!("{:?}", signed.header("Authorization"));
//!     Ok(())
//! }
//! ```
//!
//! Strategies requiring network interaction (NTLM, OAuth 2.0) consume
//! injected [`Capabilities`]: an auxiliary request sender, an interactive
//! browser-redirect host, a named-profile credential resolver, and a small
//! key-value store. All other strategies are pure functions of their inputs.

#![deny(rustdoc::broken_intra_doc_links)]

pub mod cache;
pub mod canonical;
pub mod capability;
pub mod params;
pub mod registry;
pub mod request;
pub mod strategy;

// Re-exports for convenience
pub use cache::ClientCache;
pub use capability::{
    AwsCredentials, Capabilities, ChainResolver, EnvironmentResolver, HttpSend, InMemoryStore,
    KeyValueStore, NavigationEvent, ProfileCredentials, RedirectHost, RedirectSession,
    ReqwestSender, StaticResolver,
};
pub use params::{
    DisplayState, OptionsProvider, OptionsSource, ParameterKind, ParameterSchema, ParameterSpec,
    ResolvedValues, SelectOption, Value,
};
pub use registry::StrategyRegistry;
pub use request::{RequestDescriptor, ResponseDescriptor, SigningResult};
pub use strategy::{
    AuthStrategy, AwsV4Strategy, BasicStrategy, JwtStrategy, NtlmStrategy, OAuth1Strategy,
    OAuth2Strategy, RequestContext,
};

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by signing strategies and their collaborators.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required secret or profile is absent or unresolvable.
    #[error("Missing credential: {message}")]
    MissingCredential { message: String },

    /// Malformed configuration values (bad JSON, unknown algorithm, absent
    /// capability).
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The upstream server did not present the expected challenge.
    #[error("{message}")]
    UpstreamChallengeMissing { message: String },

    /// A signature or message computation failed.
    #[error("Signing computation failed: {message}")]
    SigningComputationFailed { message: String },

    /// The interactive flow was abandoned before completing.
    #[error("Authentication cancelled by user")]
    UserCancelled,

    /// Network connectivity or request failed.
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification used by callers deciding how to present a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Credential absent or rejected; the user must supply one.
    Credential,
    /// Configuration or parsing errors; the inputs must change.
    Configuration,
    /// Upstream or network conditions that may succeed on retry.
    Transient,
    /// The user abandoned an interactive flow.
    Cancelled,
    /// Internal computation failures.
    Internal,
}

impl Error {
    pub fn missing_credential(message: impl Into<String>) -> Self {
        Error::MissingCredential {
            message: message.into(),
        }
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Error::InvalidConfiguration {
            message: message.into(),
        }
    }

    pub fn challenge_missing(message: impl Into<String>) -> Self {
        Error::UpstreamChallengeMissing {
            message: message.into(),
        }
    }

    pub fn signing(message: impl Into<String>) -> Self {
        Error::SigningComputationFailed {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::MissingCredential { .. } => ErrorCategory::Credential,
            Error::InvalidConfiguration { .. } | Error::Json(_) => ErrorCategory::Configuration,
            Error::UpstreamChallengeMissing { .. } | Error::Network(_) => ErrorCategory::Transient,
            Error::UserCancelled => ErrorCategory::Cancelled,
            Error::SigningComputationFailed { .. } => ErrorCategory::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            Error::missing_credential("no key").category(),
            ErrorCategory::Credential
        );
        assert_eq!(
            Error::invalid_configuration("bad json").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            Error::challenge_missing("none").category(),
            ErrorCategory::Transient
        );
        assert_eq!(Error::UserCancelled.category(), ErrorCategory::Cancelled);
        assert_eq!(Error::signing("rsa").category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_challenge_missing_displays_message_verbatim() {
        let err = Error::challenge_missing("Unable to find NTLM challenge");
        assert_eq!(err.to_string(), "Unable to find NTLM challenge");
    }
}
