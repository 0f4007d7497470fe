//! Shared signature primitives for the JWT and OAuth 1.0a strategies.

use hmac::{Hmac, Mac};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};

use crate::{Error, Result};

/// Digest selector for RSA PKCS#1 v1.5 signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum RsaDigest {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

/// Parse a PEM private key, accepting PKCS#8 or PKCS#1 encodings.
pub(super) fn parse_rsa_private_key(pem: &str) -> Result<RsaPrivateKey> {
    match RsaPrivateKey::from_pkcs8_pem(pem) {
        Ok(key) => Ok(key),
        Err(_) => RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|e| Error::signing(format!("invalid RSA private key: {}", e))),
    }
}

/// RSA PKCS#1 v1.5 signature over `data` with the selected digest.
pub(super) fn rsa_sign(digest: RsaDigest, pem: &str, data: &[u8]) -> Result<Vec<u8>> {
    let key = parse_rsa_private_key(pem)?;
    let signature = match digest {
        RsaDigest::Sha1 => SigningKey::<Sha1>::new(key)
            .try_sign(data)
            .map(|s| s.to_vec()),
        RsaDigest::Sha256 => SigningKey::<Sha256>::new(key)
            .try_sign(data)
            .map(|s| s.to_vec()),
        RsaDigest::Sha384 => SigningKey::<Sha384>::new(key)
            .try_sign(data)
            .map(|s| s.to_vec()),
        RsaDigest::Sha512 => SigningKey::<Sha512>::new(key)
            .try_sign(data)
            .map(|s| s.to_vec()),
    };
    signature.map_err(|e| Error::signing(format!("RSA signing failed: {}", e)))
}

macro_rules! hmac_fn {
    ($name:ident, $digest:ty) => {
        pub(super) fn $name(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
            let mut mac = Hmac::<$digest>::new_from_slice(key)
                .map_err(|e| Error::signing(format!("HMAC key setup failed: {}", e)))?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
    };
}

hmac_fn!(hmac_sha1, Sha1);
hmac_fn!(hmac_sha256, Sha256);
hmac_fn!(hmac_sha384, Sha384);
hmac_fn!(hmac_sha512, Sha512);
