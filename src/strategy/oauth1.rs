//! OAuth 1.0a authentication strategy (RFC 5849).

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::Rng;

use super::sign::{hmac_sha1, hmac_sha256, hmac_sha512, rsa_sign, RsaDigest};
use super::{AuthStrategy, RequestContext};
use crate::canonical::oauth1::signature_base_string;
use crate::canonical::percent_encode;
use crate::params::{
    DisplayState, ParameterSchema, ParameterSpec, ResolvedValues, SelectOption,
};
use crate::request::SigningResult;
use crate::{Error, Result};

const SIGNATURE_METHODS: &[&str] = &[
    "HMAC-SHA1",
    "HMAC-SHA256",
    "HMAC-SHA512",
    "RSA-SHA1",
    "RSA-SHA256",
    "RSA-SHA512",
    "PLAINTEXT",
];

/// OAuth 1.0a request signing.
///
/// Deterministic given a fixed nonce and timestamp; no network I/O.
#[derive(Debug, Clone, Default)]
pub struct OAuth1Strategy;

impl OAuth1Strategy {
    pub fn new() -> Self {
        Self
    }
}

fn generate_nonce() -> String {
    rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn signature_for(
    method: &str,
    base_string: &str,
    consumer_secret: &str,
    token_secret: &str,
) -> Result<String> {
    // HMAC and PLAINTEXT share the `consumerSecret&tokenSecret` key, both
    // halves percent-encoded (RFC 5849 section 3.4.2).
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );
    match method {
        "PLAINTEXT" => Ok(key),
        "HMAC-SHA1" => Ok(STANDARD.encode(hmac_sha1(key.as_bytes(), base_string.as_bytes())?)),
        "HMAC-SHA256" => Ok(STANDARD.encode(hmac_sha256(key.as_bytes(), base_string.as_bytes())?)),
        "HMAC-SHA512" => Ok(STANDARD.encode(hmac_sha512(key.as_bytes(), base_string.as_bytes())?)),
        // The token-secret slot carries the PEM private key for RSA methods.
        "RSA-SHA1" => Ok(STANDARD.encode(rsa_sign(
            RsaDigest::Sha1,
            token_secret,
            base_string.as_bytes(),
        )?)),
        "RSA-SHA256" => Ok(STANDARD.encode(rsa_sign(
            RsaDigest::Sha256,
            token_secret,
            base_string.as_bytes(),
        )?)),
        "RSA-SHA512" => Ok(STANDARD.encode(rsa_sign(
            RsaDigest::Sha512,
            token_secret,
            base_string.as_bytes(),
        )?)),
        other => Err(Error::invalid_configuration(format!(
            "unsupported OAuth 1.0a signature method: {}",
            other
        ))),
    }
}

#[async_trait]
impl AuthStrategy for OAuth1Strategy {
    fn name(&self) -> &'static str {
        "oauth1"
    }

    fn label(&self) -> &'static str {
        "OAuth 1.0"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new(vec![
            ParameterSpec::select(
                "signature_method",
                "Signature Method",
                SIGNATURE_METHODS
                    .iter()
                    .map(|m| SelectOption::new(*m, *m))
                    .collect(),
            )
            .with_default("HMAC-SHA1"),
            ParameterSpec::text("consumer_key", "Consumer Key"),
            ParameterSpec::secret("consumer_secret", "Consumer Secret"),
            ParameterSpec::text("token_key", "Access Token"),
            ParameterSpec::secret("token_secret", "Token Secret").with_visibility(|values| {
                if values
                    .get_str("signature_method")
                    .unwrap_or("HMAC-SHA1")
                    .starts_with("RSA")
                {
                    DisplayState::relabeled("Private Key (PEM)")
                } else {
                    DisplayState::visible()
                }
            }),
            ParameterSpec::text("version", "Version").with_default("1.0"),
            ParameterSpec::group(
                "advanced",
                "Advanced",
                vec![
                    ParameterSpec::text("callback", "Callback URL"),
                    ParameterSpec::text("verifier", "Verifier"),
                    ParameterSpec::text("timestamp", "Timestamp"),
                    ParameterSpec::text("nonce", "Nonce"),
                    ParameterSpec::text("realm", "Realm"),
                ],
            ),
        ])
    }

    async fn apply(
        &self,
        ctx: &RequestContext<'_>,
        values: &ResolvedValues,
    ) -> Result<SigningResult> {
        let method = values.get_nonempty("signature_method").unwrap_or("HMAC-SHA1");
        if !SIGNATURE_METHODS.contains(&method) {
            return Err(Error::invalid_configuration(format!(
                "unsupported OAuth 1.0a signature method: {}",
                method
            )));
        }

        let url = ctx.request.parsed_url()?;

        // Signable parameters: every non-oauth_* query parameter, repeated
        // keys included (RFC 5849 section 3.4.1.3).
        let mut params: Vec<(String, String)> = ctx
            .request
            .query_pairs()?
            .into_iter()
            .filter(|(k, _)| !k.starts_with("oauth_"))
            .collect();

        let timestamp = values
            .get_nonempty("timestamp")
            .map(str::to_string)
            .unwrap_or_else(|| chrono::Utc::now().timestamp().to_string());
        let nonce = values
            .get_nonempty("nonce")
            .map(str::to_string)
            .unwrap_or_else(generate_nonce);
        let version = values.get_nonempty("version").unwrap_or("1.0");

        let mut oauth_params: Vec<(String, String)> = vec![
            (
                "oauth_consumer_key".to_string(),
                values.get_str("consumer_key").unwrap_or("").to_string(),
            ),
            ("oauth_signature_method".to_string(), method.to_string()),
            ("oauth_timestamp".to_string(), timestamp),
            ("oauth_nonce".to_string(), nonce),
            ("oauth_version".to_string(), version.to_string()),
        ];
        if let Some(token) = values.get_nonempty("token_key") {
            oauth_params.push(("oauth_token".to_string(), token.to_string()));
        }
        if let Some(callback) = values.get_nonempty("callback") {
            oauth_params.push(("oauth_callback".to_string(), callback.to_string()));
        }
        if let Some(verifier) = values.get_nonempty("verifier") {
            oauth_params.push(("oauth_verifier".to_string(), verifier.to_string()));
        }

        params.extend(oauth_params.iter().cloned());
        let base_string = signature_base_string(&ctx.request.method, &url, &params)?;

        let signature = signature_for(
            method,
            &base_string,
            values.get_str("consumer_secret").unwrap_or(""),
            values.get_str("token_secret").unwrap_or(""),
        )?;
        oauth_params.push(("oauth_signature".to_string(), signature));

        // Deterministic header: optional raw realm first, then the oauth_*
        // parameters sorted by name, values percent-encoded.
        oauth_params.sort();
        let mut pairs: Vec<String> = Vec::with_capacity(oauth_params.len() + 1);
        if let Some(realm) = values.get_nonempty("realm") {
            pairs.push(format!("realm=\"{}\"", realm));
        }
        pairs.extend(
            oauth_params
                .iter()
                .map(|(k, v)| format!("{}=\"{}\"", k, percent_encode(v))),
        );

        Ok(SigningResult::new().with_header("Authorization", format!("OAuth {}", pairs.join(", "))))
    }
}
