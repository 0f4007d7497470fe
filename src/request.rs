//! Request and response descriptors plus the signing patch.

use url::Url;

use crate::{Error, Result};

/// Immutable description of an outgoing HTTP request.
///
/// Strategies read from a descriptor and return a [`SigningResult`]; they
/// never mutate the descriptor in place. Query parameters live in the URL
/// and are read through [`RequestDescriptor::query_pairs`].
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// HTTP method, e.g. `GET`.
    pub method: String,
    /// Absolute request URL, including any query string.
    pub url: String,
    /// Ordered header list. Names may repeat.
    pub headers: Vec<(String, String)>,
    /// Optional request body, used by auxiliary requests (token exchange).
    pub body: Option<String>,
}

impl RequestDescriptor {
    /// Create a descriptor with no headers and no body.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Append a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the request body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parsed form of the URL.
    pub fn parsed_url(&self) -> Result<Url> {
        Url::parse(&self.url)
            .map_err(|e| Error::invalid_configuration(format!("invalid request URL: {}", e)))
    }

    /// Host (with port when non-default) for the request URL.
    pub fn host(&self) -> Result<String> {
        let url = self.parsed_url()?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::invalid_configuration("request URL has no host"))?;
        Ok(match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }

    /// Decoded query pairs in URL order. Repeated keys are preserved.
    pub fn query_pairs(&self) -> Result<Vec<(String, String)>> {
        let url = self.parsed_url()?;
        Ok(url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect())
    }
}

/// Response to an auxiliary request issued by a strategy.
#[derive(Debug, Clone)]
pub struct ResponseDescriptor {
    /// HTTP status code.
    pub status: u16,
    /// Ordered header list. Names may repeat (multi-value headers arrive as
    /// separate entries or as one comma-joined value).
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: String,
}

impl ResponseDescriptor {
    /// Create a response descriptor.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// All values for `name`, case-insensitively, in arrival order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// The patch a strategy produces for the caller to merge into the outgoing
/// request.
///
/// Empty lists mean "no change requested" - never "clear existing".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigningResult {
    /// Headers to upsert, in order. Name matching on merge is
    /// case-insensitive and last-write-wins.
    pub set_headers: Vec<(String, String)>,
    /// Query parameters to upsert, in order. Name matching is exact.
    pub set_query: Vec<(String, String)>,
}

impl SigningResult {
    /// An empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header to upsert.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_headers.push((name.into(), value.into()));
        self
    }

    /// Add a query parameter to upsert.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_query.push((name.into(), value.into()));
        self
    }

    /// Whether the patch requests no changes.
    pub fn is_empty(&self) -> bool {
        self.set_headers.is_empty() && self.set_query.is_empty()
    }

    /// Merge this patch into `request`, returning the signed request.
    ///
    /// Headers are upserted case-insensitively, last write wins. Query
    /// parameters are upserted into the URL by name.
    pub fn apply_to(&self, request: &RequestDescriptor) -> Result<RequestDescriptor> {
        let mut signed = request.clone();

        for (name, value) in &self.set_headers {
            match signed
                .headers
                .iter_mut()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
            {
                Some((_, existing)) => *existing = value.clone(),
                None => signed.headers.push((name.clone(), value.clone())),
            }
        }

        if !self.set_query.is_empty() {
            let url = signed.url.clone();
            let mut parsed = Url::parse(&url)
                .map_err(|e| Error::invalid_configuration(format!("invalid request URL: {}", e)))?;
            let mut pairs: Vec<(String, String)> = parsed
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            for (name, value) in &self.set_query {
                match pairs.iter_mut().find(|(n, _)| n == name) {
                    Some((_, existing)) => *existing = value.clone(),
                    None => pairs.push((name.clone(), value.clone())),
                }
            }
            parsed
                .query_pairs_mut()
                .clear()
                .extend_pairs(pairs.iter());
            signed.url = parsed.to_string();
        }

        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_case_insensitive() {
        let request = RequestDescriptor::new("GET", "https://example.com/")
            .with_header("Content-Type", "application/json");
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("X-Missing"), None);
    }

    #[test]
    fn test_query_pairs_repeated_keys() {
        let request = RequestDescriptor::new("GET", "https://example.com/?a=1&b=2&a=3");
        let pairs = request.query_pairs().unwrap();
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
                ("a".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_host_includes_nonstandard_port() {
        let request = RequestDescriptor::new("GET", "https://example.com:8443/x");
        assert_eq!(request.host().unwrap(), "example.com:8443");
        let request = RequestDescriptor::new("GET", "https://example.com/x");
        assert_eq!(request.host().unwrap(), "example.com");
    }

    #[test]
    fn test_merge_header_upsert_last_write_wins() {
        let request = RequestDescriptor::new("GET", "https://example.com/")
            .with_header("authorization", "old");
        let patch = SigningResult::new().with_header("Authorization", "new");
        let signed = patch.apply_to(&request).unwrap();
        assert_eq!(signed.headers.len(), 1);
        assert_eq!(signed.header("Authorization"), Some("new"));
    }

    #[test]
    fn test_merge_query_upsert() {
        let request = RequestDescriptor::new("GET", "https://example.com/path?token=old&keep=1");
        let patch = SigningResult::new()
            .with_query("token", "new")
            .with_query("added", "x");
        let signed = patch.apply_to(&request).unwrap();
        assert!(signed.url.contains("token=new"));
        assert!(signed.url.contains("keep=1"));
        assert!(signed.url.contains("added=x"));
        assert!(!signed.url.contains("old"));
    }

    #[test]
    fn test_empty_patch_changes_nothing() {
        let request = RequestDescriptor::new("GET", "https://example.com/?a=1")
            .with_header("X-Keep", "yes");
        let signed = SigningResult::new().apply_to(&request).unwrap();
        assert_eq!(signed.url, request.url);
        assert_eq!(signed.headers, request.headers);
    }

    #[test]
    fn test_response_header_values() {
        let response = ResponseDescriptor::new(401)
            .with_header("WWW-Authenticate", "Negotiate")
            .with_header("www-authenticate", "NTLM abc=");
        assert_eq!(
            response.header_values("WWW-Authenticate"),
            vec!["Negotiate", "NTLM abc="]
        );
    }
}
