//! HTTP Basic authentication strategy.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::{AuthStrategy, RequestContext};
use crate::params::{ParameterSchema, ParameterSpec, ResolvedValues};
use crate::request::SigningResult;
use crate::Result;

/// HTTP Basic authentication.
///
/// Emits `Authorization: Basic base64(username:password)` unconditionally -
/// empty credentials are valid per RFC 7617 and produce `Basic Og==`.
#[derive(Debug, Clone, Default)]
pub struct BasicStrategy;

impl BasicStrategy {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuthStrategy for BasicStrategy {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn label(&self) -> &'static str {
        "Basic Auth"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new(vec![
            ParameterSpec::text("username", "Username").with_default(""),
            ParameterSpec::secret("password", "Password").with_default(""),
        ])
    }

    async fn apply(
        &self,
        _ctx: &RequestContext<'_>,
        values: &ResolvedValues,
    ) -> Result<SigningResult> {
        let username = values.get_str("username").unwrap_or("");
        let password = values.get_str("password").unwrap_or("");
        let encoded = STANDARD.encode(format!("{}:{}", username, password));
        Ok(SigningResult::new().with_header("Authorization", format!("Basic {}", encoded)))
    }
}
