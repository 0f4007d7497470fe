//! Bearer/JWT authentication strategy.

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde_json::{Map, Value as Json};

use super::sign::{hmac_sha256, hmac_sha384, hmac_sha512, rsa_sign, RsaDigest};
use super::{AuthStrategy, RequestContext};
use crate::params::{
    DisplayState, ParameterSchema, ParameterSpec, ResolvedValues, SelectOption,
};
use crate::request::SigningResult;
use crate::{Error, Result};

const ALGORITHMS: &[&str] = &[
    "none", "HS256", "HS384", "HS512", "RS256", "RS384", "RS512",
];

/// Bearer token authentication with a locally-signed JSON Web Token.
///
/// The token is composed from a claims payload and optional extra JOSE
/// header fields, signed per the selected algorithm, and placed either in a
/// header (`<prefix> <token>`) or a query parameter (bare token).
#[derive(Debug, Clone, Default)]
pub struct JwtStrategy;

impl JwtStrategy {
    pub fn new() -> Self {
        Self
    }
}

fn parse_json_object(raw: &str, what: &str) -> Result<Map<String, Json>> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Json>(raw) {
        Ok(Json::Object(map)) => Ok(map),
        Ok(_) => Err(Error::signing(format!("{} must be a JSON object", what))),
        Err(e) => Err(Error::signing(format!("invalid {} JSON: {}", what, e))),
    }
}

fn compose_header(algorithm: &str, extra: Map<String, Json>) -> Map<String, Json> {
    let mut header = Map::new();
    header.insert("alg".to_string(), Json::String(algorithm.to_string()));
    header.insert("typ".to_string(), Json::String("JWT".to_string()));
    // Caller-supplied fields override the computed ones.
    for (key, value) in extra {
        header.insert(key, value);
    }
    header
}

fn sign_token(algorithm: &str, key: &[u8], signing_input: &str) -> Result<Vec<u8>> {
    match algorithm {
        "none" => Ok(Vec::new()),
        "HS256" => hmac_sha256(key, signing_input.as_bytes()),
        "HS384" => hmac_sha384(key, signing_input.as_bytes()),
        "HS512" => hmac_sha512(key, signing_input.as_bytes()),
        "RS256" | "RS384" | "RS512" => {
            let pem = std::str::from_utf8(key)
                .map_err(|_| Error::signing("RSA private key is not valid UTF-8"))?;
            let digest = match algorithm {
                "RS256" => RsaDigest::Sha256,
                "RS384" => RsaDigest::Sha384,
                _ => RsaDigest::Sha512,
            };
            rsa_sign(digest, pem, signing_input.as_bytes())
        }
        other => Err(Error::invalid_configuration(format!(
            "unsupported JWT algorithm: {}",
            other
        ))),
    }
}

fn encode_token(algorithm: &str, key: &[u8], header: &Map<String, Json>, payload: &Map<String, Json>) -> Result<String> {
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header)?);
    let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload)?);
    let signing_input = format!("{}.{}", header_b64, payload_b64);
    let signature = sign_token(algorithm, key, &signing_input)?;
    Ok(format!(
        "{}.{}",
        signing_input,
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

#[async_trait]
impl AuthStrategy for JwtStrategy {
    fn name(&self) -> &'static str {
        "jwt"
    }

    fn label(&self) -> &'static str {
        "JWT Bearer"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new(vec![
            ParameterSpec::select(
                "algorithm",
                "Algorithm",
                ALGORITHMS
                    .iter()
                    .map(|a| SelectOption::new(*a, *a))
                    .collect(),
            )
            .with_default("HS256"),
            ParameterSpec::secret("secret", "Secret or Private Key").with_visibility(|values| {
                if values
                    .get_str("algorithm")
                    .unwrap_or("HS256")
                    .starts_with("RS")
                {
                    DisplayState::relabeled("Private Key (PEM)")
                } else {
                    DisplayState::visible()
                }
            }),
            ParameterSpec::checkbox("secret_base64", "Secret is base64 encoded"),
            ParameterSpec::text("payload", "Payload (JSON)").with_default("{}"),
            ParameterSpec::text("extra_headers", "Extra Header Fields (JSON)").with_default("{}"),
            ParameterSpec::select(
                "placement",
                "Placement",
                vec![
                    SelectOption::new("Request Header", "header"),
                    SelectOption::new("Query Parameter", "query"),
                ],
            )
            .with_default("header"),
            ParameterSpec::text("field_name", "Field Name").with_default("Authorization"),
            ParameterSpec::text("prefix", "Header Prefix")
                .with_default("Bearer")
                .with_visibility(|values| {
                    if values.get_str("placement") == Some("query") {
                        DisplayState::hidden()
                    } else {
                        DisplayState::visible()
                    }
                }),
        ])
    }

    async fn apply(
        &self,
        _ctx: &RequestContext<'_>,
        values: &ResolvedValues,
    ) -> Result<SigningResult> {
        let algorithm = values.get_str("algorithm").unwrap_or("HS256");
        if !ALGORITHMS.contains(&algorithm) {
            return Err(Error::invalid_configuration(format!(
                "unsupported JWT algorithm: {}",
                algorithm
            )));
        }

        let secret = values.get_str("secret").unwrap_or("");
        let key: Vec<u8> = if values.get_bool("secret_base64") {
            STANDARD
                .decode(secret)
                .map_err(|e| Error::signing(format!("secret is not valid base64: {}", e)))?
        } else {
            secret.as_bytes().to_vec()
        };

        let payload = parse_json_object(values.get_str("payload").unwrap_or("{}"), "payload")?;
        let extra = parse_json_object(
            values.get_str("extra_headers").unwrap_or("{}"),
            "extra header",
        )?;
        let header = compose_header(algorithm, extra);

        let token = encode_token(algorithm, &key, &header, &payload)?;

        match values.get_str("placement").unwrap_or("header") {
            "query" => {
                let name = values.get_nonempty("field_name").unwrap_or("token");
                Ok(SigningResult::new().with_query(name, token))
            }
            _ => {
                let name = values.get_nonempty("field_name").unwrap_or("Authorization");
                let prefix = values.get_str("prefix").unwrap_or("Bearer");
                let value = format!("{} {}", prefix, token).trim().to_string();
                Ok(SigningResult::new().with_header(name, value))
            }
        }
    }
}
