//! OAuth 2.0 authorization-code authentication strategy.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use super::{AuthStrategy, RequestContext};
use crate::capability::{HttpSend, KeyValueStore, NavigationEvent};
use crate::params::{ParameterSchema, ParameterSpec, ResolvedValues, SelectOption};
use crate::request::{RequestDescriptor, SigningResult};
use crate::{Error, Result};

/// Flow progress across one interactive session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlowState {
    AwaitingRedirect,
    CodeReceived,
    ExchangingToken,
}

/// OAuth 2.0 authorization-code flow.
///
/// Opens the authorization URL on the redirect-host capability and resolves
/// as soon as a navigation event carries a `code` query parameter. The
/// authorization code itself is returned as the bearer value; the token
/// exchange then runs in the background and its outcome never rewrites the
/// already-returned patch (exchange failures are logged). Closing the
/// surface before a code appears cancels the attempt.
#[derive(Debug, Clone, Default)]
pub struct OAuth2Strategy;

impl OAuth2Strategy {
    pub fn new() -> Self {
        Self
    }
}

fn code_from_navigation(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(name, _)| name == "code")
        .map(|(_, value)| value.into_owned())
}

fn form_encode(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(name, value)| {
            format!(
                "{}={}",
                urlencoding::encode(name),
                urlencoding::encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

struct Exchange {
    http: Arc<dyn HttpSend>,
    store: Option<Arc<dyn KeyValueStore>>,
    token_url: String,
    code: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl Exchange {
    /// POST the code to the token endpoint. Failures are logged, never
    /// surfaced: the caller already holds its header.
    async fn run(self) {
        let body = form_encode(&[
            ("grant_type", "authorization_code"),
            ("code", &self.code),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("redirect_uri", &self.redirect_uri),
        ]);
        let request = RequestDescriptor::new("POST", self.token_url.clone())
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_header("Accept", "application/json")
            .with_body(body);

        match self.http.send(&request).await {
            Ok(response) if response.status < 400 => {
                match serde_json::from_str::<serde_json::Value>(&response.body) {
                    Ok(_) => {
                        tracing::debug!("OAuth 2.0 token exchange complete");
                        if let Some(store) = &self.store {
                            let key = format!("oauth2:{}:{}", self.token_url, self.client_id);
                            if let Err(e) = store.put(&key, &response.body).await {
                                tracing::warn!("failed to persist OAuth 2.0 token: {}", e);
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!("OAuth 2.0 token response is not valid JSON: {}", e);
                    }
                }
            }
            Ok(response) => {
                tracing::warn!(
                    status = response.status,
                    "OAuth 2.0 token exchange rejected"
                );
            }
            Err(e) => {
                tracing::warn!("OAuth 2.0 token exchange failed: {}", e);
            }
        }
    }
}

#[async_trait]
impl AuthStrategy for OAuth2Strategy {
    fn name(&self) -> &'static str {
        "oauth2"
    }

    fn label(&self) -> &'static str {
        "OAuth 2.0"
    }

    fn schema(&self) -> ParameterSchema {
        ParameterSchema::new(vec![
            ParameterSpec::select(
                "grant_type",
                "Grant Type",
                vec![SelectOption::new("Authorization Code", "authorization_code")],
            )
            .with_default("authorization_code"),
            ParameterSpec::text("authorization_url", "Authorization URL").required(),
            ParameterSpec::text("access_token_url", "Access Token URL").required(),
            ParameterSpec::text("client_id", "Client ID"),
            ParameterSpec::secret("client_secret", "Client Secret"),
            ParameterSpec::text("redirect_uri", "Redirect URI"),
            ParameterSpec::text("scope", "Scope"),
        ])
    }

    async fn apply(
        &self,
        ctx: &RequestContext<'_>,
        values: &ResolvedValues,
    ) -> Result<SigningResult> {
        let grant_type = values.get_nonempty("grant_type").unwrap_or("authorization_code");
        if grant_type != "authorization_code" {
            return Err(Error::invalid_configuration(format!(
                "unsupported OAuth 2.0 grant type: {}",
                grant_type
            )));
        }

        let redirect_host = ctx.capabilities.redirect()?;
        let http = ctx.capabilities.http()?;

        let authorization_url = values
            .get_nonempty("authorization_url")
            .ok_or_else(|| Error::invalid_configuration("authorization URL is not set"))?;
        let token_url = values
            .get_nonempty("access_token_url")
            .ok_or_else(|| Error::invalid_configuration("access token URL is not set"))?;
        let client_id = values.get_str("client_id").unwrap_or("");
        let redirect_uri = values.get_str("redirect_uri").unwrap_or("");
        let scope = values.get_str("scope").unwrap_or("");

        let mut url = Url::parse(authorization_url)
            .map_err(|e| Error::invalid_configuration(format!("invalid authorization URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", scope);

        let mut session = redirect_host.open(url.as_str()).await?;
        let mut state = FlowState::AwaitingRedirect;
        tracing::debug!(?state, "OAuth 2.0 authorization surface opened");

        let code = loop {
            match session.next().await {
                Some(NavigationEvent::Navigated(location)) => {
                    if let Some(code) = code_from_navigation(&location) {
                        break code;
                    }
                }
                Some(NavigationEvent::Closed) | None => {
                    tracing::debug!("OAuth 2.0 surface closed before a code appeared");
                    return Err(Error::UserCancelled);
                }
            }
        };
        state = FlowState::CodeReceived;
        tracing::debug!(?state, "OAuth 2.0 authorization code captured");

        // The code itself is the provisional bearer value; the exchange runs
        // after the attempt resolves and never rewrites this patch.
        let result =
            SigningResult::new().with_header("Authorization", format!("Bearer {}", code));

        state = FlowState::ExchangingToken;
        tracing::debug!(?state, "OAuth 2.0 token exchange started");
        let exchange = Exchange {
            http,
            store: ctx.capabilities.store(),
            token_url: token_url.to_string(),
            code,
            client_id: client_id.to_string(),
            client_secret: values.get_str("client_secret").unwrap_or("").to_string(),
            redirect_uri: redirect_uri.to_string(),
        };
        tokio::spawn(exchange.run());

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{
        Capabilities, InMemoryStore, RedirectHost, RedirectSession, ReqwestSender,
    };
    use crate::request::ResponseDescriptor;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct FakeHost {
        navigations: Vec<NavigationEvent>,
        opened: Mutex<Vec<String>>,
    }

    impl FakeHost {
        fn new(navigations: Vec<NavigationEvent>) -> Self {
            Self {
                navigations,
                opened: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RedirectHost for FakeHost {
        async fn open(&self, url: &str) -> Result<RedirectSession> {
            self.opened.lock().unwrap().push(url.to_string());
            let (tx, rx) = mpsc::channel(8);
            for event in self.navigations.clone() {
                tx.send(event).await.ok();
            }
            Ok(RedirectSession::new(rx))
        }
    }

    struct RecordingSender {
        response: ResponseDescriptor,
        seen: Mutex<Vec<RequestDescriptor>>,
    }

    #[async_trait]
    impl HttpSend for RecordingSender {
        async fn send(&self, request: &RequestDescriptor) -> Result<ResponseDescriptor> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self.response.clone())
        }
    }

    fn values() -> ResolvedValues {
        ResolvedValues::new()
            .with_str("authorization_url", "https://auth.example.com/authorize")
            .with_str("access_token_url", "https://auth.example.com/token")
            .with_str("client_id", "client-1")
            .with_str("client_secret", "shhh")
            .with_str("redirect_uri", "https://app.example.com/callback")
            .with_str("scope", "read write")
    }

    #[tokio::test]
    async fn test_code_resolves_as_provisional_bearer() {
        let host = std::sync::Arc::new(FakeHost::new(vec![
            NavigationEvent::Navigated("https://auth.example.com/login".to_string()),
            NavigationEvent::Navigated(
                "https://app.example.com/callback?state=x&code=auth-code-42".to_string(),
            ),
        ]));
        let capabilities = Capabilities::new()
            .with_redirect(host.clone())
            .with_http(ReqwestSender::new());
        let request = RequestDescriptor::new("GET", "https://api.example.com/");

        let result = OAuth2Strategy::new()
            .apply(&RequestContext::new(&request, &capabilities), &values())
            .await
            .unwrap();

        assert_eq!(
            result.set_headers,
            vec![(
                "Authorization".to_string(),
                "Bearer auth-code-42".to_string()
            )]
        );

        let opened = host.opened.lock().unwrap();
        assert_eq!(opened.len(), 1);
        assert!(opened[0].contains("client_id=client-1"));
        assert!(opened[0].contains("redirect_uri="));
        assert!(opened[0].contains("scope=read+write"));
    }

    #[tokio::test]
    async fn test_surface_closed_without_code_cancels() {
        let host = FakeHost::new(vec![
            NavigationEvent::Navigated("https://auth.example.com/login".to_string()),
            NavigationEvent::Closed,
        ]);
        let capabilities = Capabilities::new()
            .with_redirect(host)
            .with_http(ReqwestSender::new());
        let request = RequestDescriptor::new("GET", "https://api.example.com/");

        let err = OAuth2Strategy::new()
            .apply(&RequestContext::new(&request, &capabilities), &values())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UserCancelled));
    }

    #[tokio::test]
    async fn test_exchange_posts_form_and_persists_token() {
        let sender = std::sync::Arc::new(RecordingSender {
            response: ResponseDescriptor {
                status: 200,
                headers: vec![("content-type".to_string(), "application/json".to_string())],
                body: r#"{"access_token":"tok-1","token_type":"bearer"}"#.to_string(),
            },
            seen: Mutex::new(Vec::new()),
        });
        let store = std::sync::Arc::new(InMemoryStore::new());
        let host = FakeHost::new(vec![NavigationEvent::Navigated(
            "https://app.example.com/callback?code=c0de".to_string(),
        )]);
        let capabilities = Capabilities::new()
            .with_redirect(host)
            .with_http(sender.clone())
            .with_store(store.clone());
        let request = RequestDescriptor::new("GET", "https://api.example.com/");

        OAuth2Strategy::new()
            .apply(&RequestContext::new(&request, &capabilities), &values())
            .await
            .unwrap();

        // The exchange runs detached; wait for it to land in the store.
        let key = "oauth2:https://auth.example.com/token:client-1";
        let mut stored = None;
        for _ in 0..50 {
            if let Some(value) = store.get(key).await.unwrap() {
                stored = Some(value);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(
            stored.as_deref(),
            Some(r#"{"access_token":"tok-1","token_type":"bearer"}"#)
        );

        let seen = sender.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, "POST");
        assert_eq!(seen[0].url, "https://auth.example.com/token");
        assert_eq!(
            seen[0].header("Content-Type"),
            Some("application/x-www-form-urlencoded")
        );
        let body = seen[0].body.as_deref().unwrap();
        assert!(body.contains("grant_type=authorization_code"));
        assert!(body.contains("code=c0de"));
        assert!(body.contains("client_id=client-1"));
        assert!(body.contains("client_secret=shhh"));
        assert!(body.contains("redirect_uri=https%3A%2F%2Fapp.example.com%2Fcallback"));
    }

    #[tokio::test]
    async fn test_exchange_failure_does_not_invalidate_header() {
        let sender = std::sync::Arc::new(RecordingSender {
            response: ResponseDescriptor::new(500),
            seen: Mutex::new(Vec::new()),
        });
        let host = FakeHost::new(vec![NavigationEvent::Navigated(
            "https://app.example.com/callback?code=c0de".to_string(),
        )]);
        let capabilities = Capabilities::new()
            .with_redirect(host)
            .with_http(sender.clone());
        let request = RequestDescriptor::new("GET", "https://api.example.com/");

        let result = OAuth2Strategy::new()
            .apply(&RequestContext::new(&request, &capabilities), &values())
            .await
            .unwrap();
        assert_eq!(result.set_headers[0].1, "Bearer c0de");

        // Wait for the detached exchange to run; the patch stays as issued.
        for _ in 0..50 {
            if !sender.seen.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(sender.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_code_extraction() {
        assert_eq!(
            code_from_navigation("https://x/cb?a=1&code=abc"),
            Some("abc".to_string())
        );
        assert_eq!(code_from_navigation("https://x/cb?a=1"), None);
        assert_eq!(code_from_navigation("not a url"), None);
    }

    #[tokio::test]
    async fn test_unsupported_grant_type_rejected() {
        let capabilities = Capabilities::new();
        let request = RequestDescriptor::new("GET", "https://api.example.com/");
        let err = OAuth2Strategy::new()
            .apply(
                &RequestContext::new(&request, &capabilities),
                &values().with_str("grant_type", "client_credentials"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration { .. }));
    }
}
