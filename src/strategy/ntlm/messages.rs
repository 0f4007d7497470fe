//! NTLM message codec (MS-NLMP).
//!
//! Implements the Type-1 negotiate message, Type-2 challenge parsing, and
//! the Type-3 authenticate message with NTLMv2 responses.

use hmac::{Hmac, Mac};
use md4::{Digest, Md4};
use md5::Md5;

use crate::{Error, Result};

type HmacMd5 = Hmac<Md5>;

const SIGNATURE: &[u8; 8] = b"NTLMSSP\0";

const NEGOTIATE_UNICODE: u32 = 0x0000_0001;
const NEGOTIATE_OEM: u32 = 0x0000_0002;
const REQUEST_TARGET: u32 = 0x0000_0004;
const NEGOTIATE_NTLM: u32 = 0x0000_0200;
const NEGOTIATE_OEM_DOMAIN_SUPPLIED: u32 = 0x0000_1000;
const NEGOTIATE_OEM_WORKSTATION_SUPPLIED: u32 = 0x0000_2000;
const NEGOTIATE_ALWAYS_SIGN: u32 = 0x0000_8000;
const NEGOTIATE_EXTENDED_SESSION_SECURITY: u32 = 0x0008_0000;

/// Identity fields supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    pub username: String,
    pub password: String,
    pub domain: String,
    pub workstation: String,
}

/// Seconds between the Windows epoch (1601) and the Unix epoch.
const EPOCH_DELTA_SECS: u64 = 11_644_473_600;

/// Current time as a Windows FILETIME (100ns ticks since 1601).
pub fn filetime_now() -> u64 {
    let unix = chrono::Utc::now().timestamp().max(0) as u64;
    (unix + EPOCH_DELTA_SECS) * 10_000_000
}

fn utf16le(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

fn hmac_md5(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacMd5::new_from_slice(key)
        .map_err(|e| Error::signing(format!("HMAC key setup failed: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Message assembly with security buffers pointing into a trailing payload.
struct MessageBuilder {
    fixed: Vec<u8>,
    payload: Vec<u8>,
    payload_offset: u32,
}

impl MessageBuilder {
    fn new(message_type: u32, fixed_len: u32) -> Self {
        let mut fixed = Vec::with_capacity(fixed_len as usize);
        fixed.extend_from_slice(SIGNATURE);
        fixed.extend_from_slice(&message_type.to_le_bytes());
        Self {
            fixed,
            payload: Vec::new(),
            payload_offset: fixed_len,
        }
    }

    /// Append a security buffer (len, maxlen, offset) referencing `data`.
    fn buffer(&mut self, data: &[u8]) {
        let len = data.len() as u16;
        let offset = self.payload_offset + self.payload.len() as u32;
        self.fixed.extend_from_slice(&len.to_le_bytes());
        self.fixed.extend_from_slice(&len.to_le_bytes());
        self.fixed.extend_from_slice(&offset.to_le_bytes());
        self.payload.extend_from_slice(data);
    }

    fn raw(&mut self, bytes: &[u8]) {
        self.fixed.extend_from_slice(bytes);
    }

    fn finish(mut self) -> Vec<u8> {
        debug_assert_eq!(self.fixed.len() as u32, self.payload_offset);
        self.fixed.extend_from_slice(&self.payload);
        self.fixed
    }
}

/// Build the Type-1 negotiate message from the supplied identity fields.
pub fn type1_message(identity: &Identity) -> Vec<u8> {
    let domain = identity.domain.to_ascii_uppercase();
    let workstation = identity.workstation.to_ascii_uppercase();

    let mut flags = NEGOTIATE_UNICODE
        | NEGOTIATE_OEM
        | REQUEST_TARGET
        | NEGOTIATE_NTLM
        | NEGOTIATE_ALWAYS_SIGN
        | NEGOTIATE_EXTENDED_SESSION_SECURITY;
    if !domain.is_empty() {
        flags |= NEGOTIATE_OEM_DOMAIN_SUPPLIED;
    }
    if !workstation.is_empty() {
        flags |= NEGOTIATE_OEM_WORKSTATION_SUPPLIED;
    }

    // Fixed part: signature(8) + type(4) + flags(4) + two buffers(16) = 32.
    let mut builder = MessageBuilder::new(1, 32);
    builder.raw(&flags.to_le_bytes());
    builder.buffer(domain.as_bytes());
    builder.buffer(workstation.as_bytes());
    builder.finish()
}

/// Parsed Type-2 challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type2Message {
    /// Flags negotiated by the server.
    pub flags: u32,
    /// The 8-byte server challenge.
    pub challenge: [u8; 8],
    /// Raw target-information block, echoed into the NTLMv2 blob.
    pub target_info: Vec<u8>,
}

fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Parse a Type-2 challenge message. Any structural defect is fatal to the
/// signing attempt; the handshake is never retried automatically.
pub fn parse_type2(data: &[u8]) -> Result<Type2Message> {
    if data.len() < 32 {
        return Err(Error::signing("NTLM challenge message is truncated"));
    }
    if &data[0..8] != SIGNATURE {
        return Err(Error::signing("NTLM challenge has invalid signature"));
    }
    if read_u32(data, 8) != 2 {
        return Err(Error::signing("NTLM challenge has unexpected message type"));
    }

    let flags = read_u32(data, 20);
    let mut challenge = [0u8; 8];
    challenge.copy_from_slice(&data[24..32]);

    let target_info = if data.len() >= 48 {
        let len = read_u16(data, 40) as usize;
        let offset = read_u32(data, 44) as usize;
        if len > 0 {
            let end = offset
                .checked_add(len)
                .filter(|end| *end <= data.len())
                .ok_or_else(|| Error::signing("NTLM target info extends past message end"))?;
            data[offset..end].to_vec()
        } else {
            Vec::new()
        }
    } else {
        Vec::new()
    };

    Ok(Type2Message {
        flags,
        challenge,
        target_info,
    })
}

/// NTLMv2 response pair.
struct Responses {
    lm: Vec<u8>,
    nt: Vec<u8>,
}

fn ntlmv2_responses(
    identity: &Identity,
    challenge: &Type2Message,
    client_challenge: &[u8; 8],
    timestamp: u64,
) -> Result<Responses> {
    let nt_hash = Md4::digest(utf16le(&identity.password));
    let identity_key = utf16le(&format!(
        "{}{}",
        identity.username.to_uppercase(),
        identity.domain
    ));
    let v2_hash = hmac_md5(nt_hash.as_slice(), &identity_key)?;

    let mut blob = Vec::with_capacity(28 + challenge.target_info.len() + 4);
    blob.extend_from_slice(&[0x01, 0x01, 0x00, 0x00]);
    blob.extend_from_slice(&[0u8; 4]);
    blob.extend_from_slice(&timestamp.to_le_bytes());
    blob.extend_from_slice(client_challenge);
    blob.extend_from_slice(&[0u8; 4]);
    blob.extend_from_slice(&challenge.target_info);
    blob.extend_from_slice(&[0u8; 4]);

    let mut nt_input = Vec::with_capacity(8 + blob.len());
    nt_input.extend_from_slice(&challenge.challenge);
    nt_input.extend_from_slice(&blob);
    let nt_proof = hmac_md5(&v2_hash, &nt_input)?;
    let mut nt = nt_proof;
    nt.extend_from_slice(&blob);

    let mut lm_input = Vec::with_capacity(16);
    lm_input.extend_from_slice(&challenge.challenge);
    lm_input.extend_from_slice(client_challenge);
    let mut lm = hmac_md5(&v2_hash, &lm_input)?;
    lm.extend_from_slice(client_challenge);

    Ok(Responses { lm, nt })
}

/// Build the Type-3 authenticate message answering `challenge`.
pub fn type3_message(
    identity: &Identity,
    challenge: &Type2Message,
    client_challenge: &[u8; 8],
    timestamp: u64,
) -> Result<Vec<u8>> {
    let responses = ntlmv2_responses(identity, challenge, client_challenge, timestamp)?;

    let unicode = challenge.flags & NEGOTIATE_UNICODE != 0;
    let encode = |s: &str| -> Vec<u8> {
        if unicode {
            utf16le(s)
        } else {
            s.as_bytes().to_vec()
        }
    };
    let domain = encode(&identity.domain);
    let username = encode(&identity.username);
    let workstation = encode(&identity.workstation);

    let mut flags = NEGOTIATE_NTLM | NEGOTIATE_ALWAYS_SIGN;
    if unicode {
        flags |= NEGOTIATE_UNICODE;
    } else {
        flags |= NEGOTIATE_OEM;
    }

    // Fixed part: signature(8) + type(4) + six buffers(48) + flags(4) = 64.
    let mut builder = MessageBuilder::new(3, 64);
    builder.buffer(&responses.lm);
    builder.buffer(&responses.nt);
    builder.buffer(&domain);
    builder.buffer(&username);
    builder.buffer(&workstation);
    builder.buffer(&[]);
    builder.raw(&flags.to_le_bytes());
    Ok(builder.finish())
}
