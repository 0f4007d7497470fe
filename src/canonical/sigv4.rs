//! AWS Signature Version 4 canonicalization and key derivation.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use super::percent_encode;
use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// SHA-256 of the empty string, the payload hash for body-less requests.
pub const EMPTY_STRING_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Payload-hash sentinel for requests signed without hashing their body.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Hex-encoded SHA-256 digest.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::signing(format!("HMAC key setup failed: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Canonical query string: decoded pairs re-encoded per RFC 3986, sorted by
/// encoded key then encoded value, joined `k=v` with `&`.
pub fn canonical_query_string(pairs: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| {
            (
                percent_encode(k).into_owned(),
                percent_encode(v).into_owned(),
            )
        })
        .collect();
    encoded.sort();
    let parts: Vec<String> = encoded
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    parts.join("&")
}

/// Canonical headers block plus the `;`-joined signed-header list.
///
/// Names are lowercased and sorted, values trimmed. The input is the
/// already-selected signing subset.
pub fn canonical_headers(headers: &[(String, String)]) -> (String, String) {
    let mut entries: Vec<(String, String)> = headers
        .iter()
        .map(|(n, v)| (n.to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    entries.sort();

    let block: String = entries
        .iter()
        .map(|(n, v)| format!("{}:{}\n", n, v))
        .collect();
    let signed: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
    (block, signed.join(";"))
}

/// The canonical request string hashed into the string-to-sign.
pub fn canonical_request(
    method: &str,
    canonical_uri: &str,
    canonical_query: &str,
    canonical_header_block: &str,
    signed_headers: &str,
    payload_hash: &str,
) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method.to_ascii_uppercase(),
        canonical_uri,
        canonical_query,
        canonical_header_block,
        signed_headers,
        payload_hash,
    )
}

/// Credential scope: `date/region/service/aws4_request`.
pub fn credential_scope(date_stamp: &str, region: &str, service: &str) -> String {
    format!("{}/{}/{}/aws4_request", date_stamp, region, service)
}

/// The string the final signature is computed over.
pub fn string_to_sign(amz_date: &str, scope: &str, canonical_request: &str) -> String {
    format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        scope,
        sha256_hex(canonical_request.as_bytes()),
    )
}

/// Derive the signing key: chained HMAC over date, region, service, and the
/// `aws4_request` terminator.
pub fn signing_key(secret: &str, date_stamp: &str, region: &str, service: &str) -> Result<Vec<u8>> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

/// Final hex signature over the string-to-sign.
pub fn signature(key: &[u8], string_to_sign: &str) -> Result<String> {
    Ok(hex::encode(hmac_sha256(key, string_to_sign.as_bytes())?))
}
