//! TLS tarpits: handshake records that look right on the wire and go
//! nowhere.
//!
//! Record framing: content type, the fixed `0x03 0x03` version bytes,
//! a 16-bit big-endian fragment length, then the fragment. Handshake
//! fragments nest a type byte and a 24-bit body length.

use std::io;

use async_trait::async_trait;
use tokio::net::tcp::OwnedReadHalf;

use super::{ConnWriter, PatternDefaults, ProtocolPattern};
use crate::net::validator::ValidatorConfig;

pub const CONTENT_TYPE_HANDSHAKE: u8 = 0x16;
const VERSION: [u8; 2] = [0x03, 0x03];

const HANDSHAKE_HELLO_REQUEST: u8 = 0;
const HANDSHAKE_SERVER_HELLO: u8 = 2;

const EXTENSION_PADDING: u16 = 21;

/// One TLS record around `fragment`.
pub fn record(content_type: u8, fragment: &[u8]) -> Vec<u8> {
    debug_assert!(fragment.len() <= u16::MAX as usize);
    let mut out = Vec::with_capacity(5 + fragment.len());
    out.push(content_type);
    out.extend_from_slice(&VERSION);
    out.extend_from_slice(&(fragment.len() as u16).to_be_bytes());
    out.extend_from_slice(fragment);
    out
}

/// One handshake fragment around `body`.
pub fn handshake(handshake_type: u8, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + body.len());
    out.push(handshake_type);
    let len = body.len() as u32;
    out.extend_from_slice(&len.to_be_bytes()[1..]);
    out.extend_from_slice(body);
    out
}

fn tls_validator() -> ValidatorConfig {
    ValidatorConfig::for_prefixes(&[&[0x16, 0x03]], 2)
}

/// HelloRequest records forever. Each one invites the client to restart
/// negotiation; none of them is ever followed up.
pub struct EndlessHelloRequest {
    validator: ValidatorConfig,
    record: Vec<u8>,
}

impl EndlessHelloRequest {
    pub fn new() -> Self {
        Self {
            validator: tls_validator(),
            record: record(
                CONTENT_TYPE_HANDSHAKE,
                &handshake(HANDSHAKE_HELLO_REQUEST, &[]),
            ),
        }
    }
}

impl Default for EndlessHelloRequest {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolPattern for EndlessHelloRequest {
    fn name(&self) -> &'static str {
        "tls_endless_hello_request"
    }

    fn defaults(&self) -> PatternDefaults {
        PatternDefaults::baseline()
    }

    fn validator(&self) -> Option<&ValidatorConfig> {
        Some(&self.validator)
    }

    async fn serve(&self, _reader: &mut OwnedReadHalf, writer: &mut ConnWriter) -> io::Result<()> {
        loop {
            writer.write(&self.record).await?;
        }
    }
}

/// Build the padding-inflated ServerHello once per pattern instance.
///
/// The body is structurally valid — version, fixed random, a real cipher
/// suite — and blown up to a full 16 KiB record by a padding extension,
/// so the client has to take the whole buffer before it can decide
/// anything.
fn inflated_server_hello() -> Vec<u8> {
    // 40 bytes of fixed fields + 4-byte extension header + padding +
    // 4-byte handshake header lands the fragment exactly on the
    // 16384-byte record ceiling.
    const PADDING_LEN: usize = 16336;

    let mut body = Vec::with_capacity(44 + 4 + PADDING_LEN);
    body.extend_from_slice(&VERSION);
    let mut random = [0u8; 32];
    for (i, slot) in random.iter_mut().enumerate() {
        *slot = (i as u8).wrapping_mul(37).wrapping_add(11);
    }
    body.extend_from_slice(&random);
    // empty session id
    body.push(0);
    // TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256
    body.extend_from_slice(&[0xc0, 0x2f]);
    // null compression
    body.push(0);
    // extension block: one padding extension of zeros
    body.extend_from_slice(&((4 + PADDING_LEN) as u16).to_be_bytes());
    body.extend_from_slice(&EXTENSION_PADDING.to_be_bytes());
    body.extend_from_slice(&(PADDING_LEN as u16).to_be_bytes());
    body.resize(body.len() + PADDING_LEN, 0);

    record(CONTENT_TYPE_HANDSHAKE, &handshake(HANDSHAKE_SERVER_HELLO, &body))
}

/// A maximum-size ServerHello, served once or on repeat.
pub struct SlowHello {
    validator: ValidatorConfig,
    record: Vec<u8>,
    repeat: bool,
}

impl SlowHello {
    pub fn new(repeat: bool) -> Self {
        Self {
            validator: tls_validator(),
            record: inflated_server_hello(),
            repeat,
        }
    }
}

#[async_trait]
impl ProtocolPattern for SlowHello {
    fn name(&self) -> &'static str {
        "tls_slow_hello"
    }

    fn defaults(&self) -> PatternDefaults {
        PatternDefaults {
            rate_limit: 256,
            ..PatternDefaults::baseline()
        }
    }

    fn validator(&self) -> Option<&ValidatorConfig> {
        Some(&self.validator)
    }

    async fn serve(&self, _reader: &mut OwnedReadHalf, writer: &mut ConnWriter) -> io::Result<()> {
        writer.write(&self.record).await?;
        while self.repeat {
            writer.write(&self.record).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_record(bytes: &[u8]) -> (u8, [u8; 2], usize, &[u8]) {
        let length = u16::from_be_bytes([bytes[3], bytes[4]]) as usize;
        (bytes[0], [bytes[1], bytes[2]], length, &bytes[5..])
    }

    #[test]
    fn record_roundtrips() {
        let encoded = record(CONTENT_TYPE_HANDSHAKE, b"\x01\x02\x03");
        let (content_type, version, length, fragment) = decode_record(&encoded);
        assert_eq!(content_type, 0x16);
        assert_eq!(version, [0x03, 0x03]);
        assert_eq!(length, 3);
        assert_eq!(fragment, b"\x01\x02\x03");
    }

    #[test]
    fn handshake_length_is_24_bit_big_endian() {
        let encoded = handshake(HANDSHAKE_SERVER_HELLO, &[0u8; 300]);
        assert_eq!(encoded[0], HANDSHAKE_SERVER_HELLO);
        assert_eq!(&encoded[1..4], &[0x00, 0x01, 0x2c]);
        assert_eq!(encoded.len(), 4 + 300);
    }

    #[test]
    fn hello_request_is_nine_bytes_starting_16_03_03() {
        let pattern = EndlessHelloRequest::new();
        assert_eq!(pattern.record.len(), 9);
        assert_eq!(&pattern.record[..3], &[0x16, 0x03, 0x03]);
        assert_eq!(&pattern.record[5..], &[HANDSHAKE_HELLO_REQUEST, 0, 0, 0]);
    }

    #[test]
    fn server_hello_fills_the_record_ceiling() {
        let encoded = inflated_server_hello();
        let (content_type, version, length, fragment) = decode_record(&encoded);
        assert_eq!(content_type, 0x16);
        assert_eq!(version, [0x03, 0x03]);
        assert_eq!(length, 16384);
        assert_eq!(fragment.len(), 16384);
        assert_eq!(fragment[0], HANDSHAKE_SERVER_HELLO);
        // handshake body length covers everything after the 4-byte header
        let body_len =
            u32::from_be_bytes([0, fragment[1], fragment[2], fragment[3]]) as usize;
        assert_eq!(body_len, 16380);
    }
}
