//! NTLM challenge-response authentication strategy.

mod messages;

pub use messages::{Identity, Type2Message};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;

use super::{AuthStrategy, RequestContext};
use crate::params::{ParameterSchema, ParameterSpec, ResolvedValues};
use crate::request::{RequestDescriptor, ResponseDescriptor, SigningResult};
use crate::{Error, Result};

const CHALLENGE_MISSING: &str =
    "Unable to find NTLM challenge in WWW-Authenticate response headers";

/// Handshake progress, one pass per apply call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandshakeState {
    Type1Sent,
    ChallengeReceived,
    Type3Computed,
    Complete,
}

/// NTLM challenge-response signing (registry key `windows`).
///
/// Issues one auxiliary request to the target URL to obtain the server
/// challenge, then answers it. A missing or malformed challenge fails the
/// attempt; the handshake is never retried automatically.
#[derive(Debug, Clone, Default)]
pub struct NtlmStrategy;

impl NtlmStrategy {
    pub fn new() -> Self {
        Self
    }
}

/// Locate the first `NTLM <base64>` token across all `WWW-Authenticate`
/// values, which may arrive as multiple header instances or as one
/// comma-joined value.
fn extract_challenge(response: &ResponseDescriptor) -> Result<String> {
    for value in response.header_values("www-authenticate") {
        for piece in value.split(',') {
            if let Some(encoded) = piece.trim().strip_prefix("NTLM ") {
                let encoded = encoded.trim();
                if !encoded.is_empty() {
                    return Ok(encoded.to_string());
                }
            }
        }
    }
    Err(Error::challenge_missing(CHALLENGE_MISSING))
}

#[async_trait]
impl AuthStrategy for NtlmStrategy {
    fn name(&self) -> &'static str {
        "windows"
    }

    fn label(&self) -> &'static str {
        "Windows NTLM"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new(vec![
            ParameterSpec::text("username", "Username"),
            ParameterSpec::secret("password", "Password"),
            ParameterSpec::text("domain", "Domain"),
            ParameterSpec::group(
                "advanced",
                "Advanced",
                vec![ParameterSpec::text("workstation", "Workstation")],
            ),
        ])
    }

    async fn apply(
        &self,
        ctx: &RequestContext<'_>,
        values: &ResolvedValues,
    ) -> Result<SigningResult> {
        let http = ctx.capabilities.http()?;
        let identity = Identity {
            username: values.get_str("username").unwrap_or("").to_string(),
            password: values.get_str("password").unwrap_or("").to_string(),
            domain: values.get_str("domain").unwrap_or("").to_string(),
            workstation: values.get_str("workstation").unwrap_or("").to_string(),
        };

        let type1 = messages::type1_message(&identity);
        let probe = RequestDescriptor::new(ctx.request.method.clone(), ctx.request.url.clone())
            .with_header("Authorization", format!("NTLM {}", STANDARD.encode(&type1)))
            .with_header("Connection", "keep-alive");

        let response = http.send(&probe).await?;
        let mut state = HandshakeState::Type1Sent;
        tracing::debug!(?state, status = response.status, "NTLM negotiate sent");

        let encoded = extract_challenge(&response)?;
        state = HandshakeState::ChallengeReceived;
        tracing::debug!(?state, "NTLM challenge received");

        let raw = STANDARD
            .decode(&encoded)
            .map_err(|e| Error::signing(format!("NTLM challenge is not valid base64: {}", e)))?;
        let type2 = messages::parse_type2(&raw)?;

        let mut client_challenge = [0u8; 8];
        rand::rng().fill_bytes(&mut client_challenge);
        let type3 = messages::type3_message(
            &identity,
            &type2,
            &client_challenge,
            messages::filetime_now(),
        )?;
        state = HandshakeState::Type3Computed;
        tracing::debug!(?state, "NTLM authenticate computed");

        state = HandshakeState::Complete;
        tracing::debug!(?state, "NTLM handshake complete");
        Ok(SigningResult::new()
            .with_header("Authorization", format!("NTLM {}", STANDARD.encode(&type3))))
    }
}
