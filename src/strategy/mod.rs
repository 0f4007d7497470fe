//! Authentication strategies.
//!
//! Each strategy follows one published wire protocol:
//! - **Basic**: `Authorization: Basic` header
//! - **JWT**: signed bearer tokens in a header or query parameter
//! - **OAuth 1.0a**: RFC 5849 signed requests
//! - **AWS SigV4**: AWS Signature Version 4
//! - **NTLM**: challenge-response handshake (`windows`)
//! - **OAuth 2.0**: interactive authorization-code flow

mod awsv4;
mod basic;
mod jwt;
mod ntlm;
mod oauth1;
mod oauth2;
mod sign;

pub use awsv4::AwsV4Strategy;
pub use basic::BasicStrategy;
pub use jwt::JwtStrategy;
pub use ntlm::NtlmStrategy;
pub use oauth1::OAuth1Strategy;
pub use oauth2::OAuth2Strategy;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::capability::Capabilities;
use crate::params::{ParameterSchema, ResolvedValues};
use crate::request::{RequestDescriptor, SigningResult};
use crate::Result;

/// The request being signed plus the capabilities available to the attempt.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    /// The outgoing request. Never mutated; strategies return a patch.
    pub request: &'a RequestDescriptor,
    /// Collaborator capabilities for strategies that need them.
    pub capabilities: &'a Capabilities,
}

impl<'a> RequestContext<'a> {
    /// Bundle a request with its capabilities.
    pub fn new(request: &'a RequestDescriptor, capabilities: &'a Capabilities) -> Self {
        Self {
            request,
            capabilities,
        }
    }
}

/// Authentication strategy interface.
///
/// A strategy is a pure description of one protocol: it exposes its input
/// schema and produces a [`SigningResult`] patch. NTLM and OAuth 2.0 issue
/// real network calls or open a UI surface during `apply`; every other
/// strategy is a pure function of its inputs.
#[async_trait]
pub trait AuthStrategy: Send + Sync + Debug {
    /// Registry key for this strategy.
    fn name(&self) -> &'static str;

    /// Human-readable label.
    fn label(&self) -> &'static str;

    /// The declarative input schema.
    fn schema(&self) -> ParameterSchema;

    /// Sign the request, returning the header/query patch to merge.
    async fn apply(
        &self,
        ctx: &RequestContext<'_>,
        values: &ResolvedValues,
    ) -> Result<SigningResult>;
}
