//! OAuth 1.0a signature base string construction (RFC 5849 section 3.4.1).

use url::Url;

use super::percent_encode;
use crate::{Error, Result};

/// Base string URI: scheme://host[:port]/path, lowercased scheme and host,
/// default ports elided, query string excluded (RFC 5849 section 3.4.1.2).
pub fn base_url(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| Error::invalid_configuration("request URL has no host"))?
        .to_ascii_lowercase();
    let scheme = url.scheme().to_ascii_lowercase();
    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}{}", scheme, host, port, url.path()),
        None => format!("{}://{}{}", scheme, host, url.path()),
    })
}

/// Normalize signable parameters (RFC 5849 section 3.4.1.3.2): percent-encode
/// each key and value, sort by encoded key then encoded value, join `k=v`
/// pairs with `&`. Repeated keys are kept.
pub fn normalize_parameters(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| {
            (
                percent_encode(k).into_owned(),
                percent_encode(v).into_owned(),
            )
        })
        .collect();
    encoded.sort();
    let pairs: Vec<String> = encoded
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    pairs.join("&")
}

/// Signature base string: uppercase method, encoded base URI, and encoded
/// normalized parameters joined with `&` (RFC 5849 section 3.4.1.1).
pub fn signature_base_string(method: &str, url: &Url, params: &[(String, String)]) -> Result<String> {
    Ok(format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(&base_url(url)?),
        percent_encode(&normalize_parameters(params)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_base_url_strips_query_and_default_port() {
        let url = Url::parse("HTTP://Photos.Example.NET:80/photos?file=vacation.jpg").unwrap();
        assert_eq!(base_url(&url).unwrap(), "http://photos.example.net/photos");

        let url = Url::parse("http://example.com:8080/r").unwrap();
        assert_eq!(base_url(&url).unwrap(), "http://example.com:8080/r");
    }

    #[test]
    fn test_normalize_sorts_by_encoded_key_then_value() {
        let normalized = normalize_parameters(&pairs(&[("b", "2"), ("a", "1"), ("a", "0")]));
        assert_eq!(normalized, "a=0&a=1&b=2");
    }

    #[test]
    fn test_spec_appendix_base_string() {
        // OAuth Core 1.0 appendix A.5.1 example.
        let url = Url::parse("http://photos.example.net/photos?file=vacation.jpg&size=original")
            .unwrap();
        let params = pairs(&[
            ("file", "vacation.jpg"),
            ("size", "original"),
            ("oauth_consumer_key", "dpf43f3p2l4k3l03"),
            ("oauth_token", "nnch734d00sl2jdk"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1191242096"),
            ("oauth_nonce", "kllo9940pd9333jh"),
            ("oauth_version", "1.0"),
        ]);
        let base = signature_base_string("get", &url, &params).unwrap();
        assert_eq!(
            base,
            "GET&http%3A%2F%2Fphotos.example.net%2Fphotos&file%3Dvacation.jpg%26\
             oauth_consumer_key%3Ddpf43f3p2l4k3l03%26oauth_nonce%3Dkllo9940pd9333jh%26\
             oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1191242096%26\
             oauth_token%3Dnnch734d00sl2jdk%26oauth_version%3D1.0%26size%3Doriginal"
        );
    }
}
