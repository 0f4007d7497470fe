//! Default reqwest-backed auxiliary request sender.

use async_trait::async_trait;

use super::HttpSend;
use crate::request::{RequestDescriptor, ResponseDescriptor};
use crate::{Error, Result};

/// [`HttpSend`] implementation over a shared [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestSender {
    client: reqwest::Client,
}

impl ReqwestSender {
    /// Create a sender with a fresh client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sender over an existing client (shared connection pool).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestSender {
    async fn send(&self, request: &RequestDescriptor) -> Result<ResponseDescriptor> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::invalid_configuration(format!("invalid method: {}", request.method)))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await?;

        Ok(ResponseDescriptor {
            status,
            headers,
            body,
        })
    }
}
