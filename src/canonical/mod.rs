//! Per-protocol request-normalization routines.
//!
//! OAuth 1.0a and AWS SigV4 both sign a canonical string derived from the
//! request; the routines here build those strings so the strategies stay
//! focused on key handling and header assembly.

pub mod oauth1;
pub mod sigv4;

use std::borrow::Cow;

/// RFC 3986 percent-encoding over the unreserved set
/// (`A-Z a-z 0-9 - _ . ~`), as both OAuth 1.0a and SigV4 require.
pub fn percent_encode(input: &str) -> Cow<'_, str> {
    urlencoding::encode(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreserved_untouched() {
        assert_eq!(percent_encode("Az09-_.~"), "Az09-_.~");
    }

    #[test]
    fn test_reserved_encoded_uppercase_hex() {
        assert_eq!(percent_encode("a b&c=d/e"), "a%20b%26c%3Dd%2Fe");
        assert_eq!(percent_encode("ladies + gentlemen"), "ladies%20%2B%20gentlemen");
    }
}
