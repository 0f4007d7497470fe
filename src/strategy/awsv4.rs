//! AWS Signature Version 4 authentication strategy.

use async_trait::async_trait;

use super::{AuthStrategy, RequestContext};
use crate::cache::ClientCache;
use crate::canonical::sigv4::{
    canonical_headers, canonical_query_string, canonical_request, credential_scope, signature,
    signing_key, string_to_sign, EMPTY_STRING_SHA256, UNSIGNED_PAYLOAD,
};
use crate::capability::AwsCredentials;
use crate::params::{ParameterSchema, ParameterSpec, ResolvedValues};
use crate::request::SigningResult;
use crate::{Error, Result};

const DEFAULT_SERVICE: &str = "sts";
const DEFAULT_REGION: &str = "us-east-1";

/// Header names read from the request for canonicalization.
const SIGNED_HEADER_NAMES: &[&str] = &[
    "content-type",
    "host",
    "x-amz-content-sha256",
    "x-amz-date",
    "x-amz-security-token",
];

/// AWS Signature Version 4 request signing.
///
/// Explicit keys may be overridden by a named profile resolved through the
/// profile-credential capability; resolved profiles are cached per
/// authentication-method hash so concurrent attempts share one resolution.
#[derive(Debug, Default)]
pub struct AwsV4Strategy {
    profile_cache: ClientCache<AwsCredentials>,
}

impl AwsV4Strategy {
    pub fn new() -> Self {
        Self::default()
    }

    async fn credentials(
        &self,
        ctx: &RequestContext<'_>,
        values: &ResolvedValues,
    ) -> Result<AwsCredentials> {
        // A profile name overrides explicit keys.
        if let Some(profile) = values.get_nonempty("profile") {
            let resolver = ctx.capabilities.profiles()?;
            let key = ClientCache::<AwsCredentials>::method_key(&["awsv4", profile]);
            return self
                .profile_cache
                .get_or_try_create(&key, || async {
                    tracing::debug!("resolving AWS credentials for profile '{}'", profile);
                    resolver.resolve(profile).await
                })
                .await;
        }

        let access_key_id = values
            .get_nonempty("access_key_id")
            .ok_or_else(|| Error::missing_credential("AWS access key ID is not set"))?;
        let secret_access_key = values
            .get_nonempty("secret_access_key")
            .ok_or_else(|| Error::missing_credential("AWS secret access key is not set"))?;
        let mut credentials = AwsCredentials::new(access_key_id, secret_access_key);
        if let Some(token) = values.get_nonempty("session_token") {
            credentials = credentials.with_session_token(token);
        }
        Ok(credentials)
    }
}

#[async_trait]
impl AuthStrategy for AwsV4Strategy {
    fn name(&self) -> &'static str {
        "awsv4"
    }

    fn label(&self) -> &'static str {
        "AWS IAM v4"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new(vec![
            ParameterSpec::text("access_key_id", "Access Key ID"),
            ParameterSpec::secret("secret_access_key", "Secret Access Key"),
            ParameterSpec::secret("session_token", "Session Token"),
            ParameterSpec::text("service", "Service").with_default(DEFAULT_SERVICE),
            ParameterSpec::text("region", "Region"),
            ParameterSpec::text("profile", "Profile"),
        ])
    }

    async fn apply(
        &self,
        ctx: &RequestContext<'_>,
        values: &ResolvedValues,
    ) -> Result<SigningResult> {
        let credentials = self.credentials(ctx, values).await?;
        let service = values.get_nonempty("service").unwrap_or(DEFAULT_SERVICE);
        let region = values.get_nonempty("region").unwrap_or(DEFAULT_REGION);

        let request = ctx.request;
        let url = request.parsed_url()?;

        let amz_date = match request.header("x-amz-date") {
            Some(existing) => existing.to_string(),
            None => chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string(),
        };
        let generated_date = request.header("x-amz-date").is_none();
        let date_stamp = amz_date.chars().take(8).collect::<String>();

        // Select the canonicalization subset from the existing headers, then
        // fill in what the algorithm itself supplies.
        let mut headers: Vec<(String, String)> = request
            .headers
            .iter()
            .filter(|(n, _)| SIGNED_HEADER_NAMES.contains(&n.to_ascii_lowercase().as_str()))
            .cloned()
            .collect();
        if request.header("host").is_none() {
            headers.push(("host".to_string(), request.host()?));
        }
        if generated_date {
            headers.push(("x-amz-date".to_string(), amz_date.clone()));
        }
        let session_token = credentials.session_token().map(str::to_string);
        if let Some(token) = &session_token
            && request.header("x-amz-security-token").is_none()
        {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }

        // Lambda hashes request bodies itself; everything else signs an
        // unsigned-payload sentinel.
        let inject_content_sha = service != "lambda" && request.header("x-amz-content-sha256").is_none();
        if inject_content_sha {
            headers.push((
                "x-amz-content-sha256".to_string(),
                UNSIGNED_PAYLOAD.to_string(),
            ));
        }
        let payload_hash = headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case("x-amz-content-sha256"))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| EMPTY_STRING_SHA256.to_string());

        let (header_block, signed_headers) = canonical_headers(&headers);
        let canonical_query = canonical_query_string(&request.query_pairs()?);
        let creq = canonical_request(
            &request.method,
            url.path(),
            &canonical_query,
            &header_block,
            &signed_headers,
            &payload_hash,
        );

        let scope = credential_scope(&date_stamp, region, service);
        let sts = string_to_sign(&amz_date, &scope, &creq);
        let key = signing_key(
            credentials.secret_access_key(),
            &date_stamp,
            region,
            service,
        )?;
        let sig = signature(&key, &sts)?;

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            credentials.access_key_id, scope, signed_headers, sig
        );

        // The pre-existing content-type is read for canonicalization but
        // never re-emitted.
        let mut result = SigningResult::new().with_header("Authorization", authorization);
        if generated_date {
            result = result.with_header("x-amz-date", amz_date);
        }
        if let Some(token) = session_token {
            result = result.with_header("x-amz-security-token", token);
        }
        if inject_content_sha {
            result = result.with_header("x-amz-content-sha256", UNSIGNED_PAYLOAD);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capabilities, StaticResolver};
    use crate::request::RequestDescriptor;

    fn base_values() -> ResolvedValues {
        ResolvedValues::new()
            .with_str("access_key_id", "AKIDEXAMPLE")
            .with_str("secret_access_key", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
            .with_str("service", "iam")
            .with_str("region", "us-east-1")
    }

    fn dated_request() -> RequestDescriptor {
        RequestDescriptor::new("GET", "https://iam.amazonaws.com/?Action=ListUsers&Version=2010-05-08")
            .with_header("x-amz-date", "20150830T123600Z")
            .with_header("content-type", "application/x-www-form-urlencoded; charset=utf-8")
    }

    async fn apply(
        request: &RequestDescriptor,
        values: &ResolvedValues,
        capabilities: &Capabilities,
    ) -> Result<SigningResult> {
        AwsV4Strategy::new()
            .apply(&RequestContext::new(request, capabilities), values)
            .await
    }

    #[tokio::test]
    async fn test_authorization_shape_and_signed_headers() {
        let result = apply(&dated_request(), &base_values(), &Capabilities::new())
            .await
            .unwrap();

        let (_, auth) = result
            .set_headers
            .iter()
            .find(|(n, _)| n == "Authorization")
            .unwrap();
        assert!(auth.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/iam/aws4_request, "
        ));
        assert!(auth.contains(
            "SignedHeaders=content-type;host;x-amz-content-sha256;x-amz-date, "
        ));
        let sig = auth.rsplit("Signature=").next().unwrap();
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_deterministic_given_fixed_date() {
        let request = dated_request();
        let values = base_values();
        let caps = Capabilities::new();
        assert_eq!(
            apply(&request, &values, &caps).await.unwrap(),
            apply(&request, &values, &caps).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_content_type_read_but_not_reemitted() {
        let result = apply(&dated_request(), &base_values(), &Capabilities::new())
            .await
            .unwrap();
        assert!(
            !result
                .set_headers
                .iter()
                .any(|(n, _)| n.eq_ignore_ascii_case("content-type"))
        );
    }

    #[tokio::test]
    async fn test_content_type_omitted_from_signed_headers_when_absent() {
        let request = RequestDescriptor::new("GET", "https://iam.amazonaws.com/")
            .with_header("x-amz-date", "20150830T123600Z");
        let result = apply(&request, &base_values(), &Capabilities::new())
            .await
            .unwrap();
        let (_, auth) = result
            .set_headers
            .iter()
            .find(|(n, _)| n == "Authorization")
            .unwrap();
        assert!(auth.contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date, "));
    }

    #[tokio::test]
    async fn test_lambda_skips_unsigned_payload_header() {
        let values = base_values().with_str("service", "lambda");
        let result = apply(&dated_request(), &values, &Capabilities::new())
            .await
            .unwrap();
        assert!(
            !result
                .set_headers
                .iter()
                .any(|(n, _)| n == "x-amz-content-sha256")
        );
        let (_, auth) = result
            .set_headers
            .iter()
            .find(|(n, _)| n == "Authorization")
            .unwrap();
        assert!(!auth.contains("x-amz-content-sha256"));
    }

    #[tokio::test]
    async fn test_generated_date_emitted() {
        let request = RequestDescriptor::new("GET", "https://sts.amazonaws.com/");
        let result = apply(&request, &base_values(), &Capabilities::new())
            .await
            .unwrap();
        let (_, date) = result
            .set_headers
            .iter()
            .find(|(n, _)| n == "x-amz-date")
            .unwrap();
        assert_eq!(date.len(), 16);
        assert!(date.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_session_token_signed_and_emitted() {
        let values = base_values().with_str("session_token", "FQoGZXIvYXdzEXAMPLE");
        let result = apply(&dated_request(), &values, &Capabilities::new())
            .await
            .unwrap();
        let (_, token) = result
            .set_headers
            .iter()
            .find(|(n, _)| n == "x-amz-security-token")
            .unwrap();
        assert_eq!(token, "FQoGZXIvYXdzEXAMPLE");
        let (_, auth) = result
            .set_headers
            .iter()
            .find(|(n, _)| n == "Authorization")
            .unwrap();
        assert!(auth.contains("x-amz-security-token"));
    }

    #[tokio::test]
    async fn test_profile_overrides_explicit_keys() {
        let resolver = StaticResolver::new()
            .with_profile("prod", AwsCredentials::new("AKIDPROFILE", "profile-secret"));
        let caps = Capabilities::new().with_profiles(resolver);
        let values = base_values().with_str("profile", "prod");

        let result = apply(&dated_request(), &values, &caps).await.unwrap();
        let (_, auth) = result
            .set_headers
            .iter()
            .find(|(n, _)| n == "Authorization")
            .unwrap();
        assert!(auth.contains("Credential=AKIDPROFILE/"));
    }

    #[tokio::test]
    async fn test_unresolvable_profile_is_missing_credential() {
        let caps = Capabilities::new().with_profiles(StaticResolver::new());
        let values = base_values().with_str("profile", "ghost");
        let err = apply(&dated_request(), &values, &caps).await.unwrap_err();
        assert!(matches!(err, Error::MissingCredential { .. }));
    }

    #[tokio::test]
    async fn test_missing_keys_is_missing_credential() {
        let err = apply(
            &dated_request(),
            &ResolvedValues::new(),
            &Capabilities::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::MissingCredential { .. }));
    }
}
