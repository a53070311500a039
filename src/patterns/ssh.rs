//! SSH tarpits: a transport-layer hold that replays a key-exchange
//! opening and then keeps the peer waiting, and a validated endless
//! banner.
//!
//! Packet framing follows the RFC 4253 binary packet shape (no MAC, no
//! cipher): big-endian length, padding length, payload, zero padding.

use std::io;

use async_trait::async_trait;
use tokio::net::tcp::OwnedReadHalf;

use super::{ConnWriter, PatternDefaults, ProtocolPattern};
use crate::net::validator::ValidatorConfig;

const IDENT: &[u8] = b"SSH-2.0-OpenSSH_9.6\r\n";

const MSG_IGNORE: u8 = 2;
const MSG_KEXINIT: u8 = 20;

/// Frame `payload` as an SSH binary packet.
///
/// Padding keeps `1 + payload + padding` a multiple of 8 and is never
/// shorter than 4 bytes, so `4 <= padding <= 11`.
pub fn binary_packet(payload: &[u8]) -> Vec<u8> {
    let mut padding = 8 - ((1 + payload.len()) % 8);
    if padding < 4 {
        padding += 8;
    }
    let packet_length = (1 + payload.len() + padding) as u32;
    let mut packet = Vec::with_capacity(4 + packet_length as usize);
    packet.extend_from_slice(&packet_length.to_be_bytes());
    packet.push(padding as u8);
    packet.extend_from_slice(payload);
    packet.resize(packet.len() + padding, 0);
    packet
}

/// `SSH_MSG_IGNORE` with `data_len` zero bytes of data, framed.
pub fn msg_ignore(data_len: usize) -> Vec<u8> {
    let mut payload = Vec::with_capacity(1 + data_len);
    payload.push(MSG_IGNORE);
    payload.resize(1 + data_len, 0);
    binary_packet(&payload)
}

fn put_name_list(out: &mut Vec<u8>, names: &str) {
    out.extend_from_slice(&(names.len() as u32).to_be_bytes());
    out.extend_from_slice(names.as_bytes());
}

/// A fixed KEXINIT: plausible OpenSSH-ish algorithm lists behind a
/// constant cookie. The exchange never advances past it.
fn kexinit_payload() -> Vec<u8> {
    let mut payload = vec![MSG_KEXINIT];
    payload.extend_from_slice(&[
        0x6b, 0x3d, 0x9f, 0x11, 0x2e, 0x84, 0x50, 0xc7, 0x0a, 0xf2, 0x66, 0x48, 0xd1, 0x3b, 0x95,
        0x7c,
    ]);
    put_name_list(
        &mut payload,
        "curve25519-sha256,curve25519-sha256@libssh.org,diffie-hellman-group14-sha256",
    );
    put_name_list(&mut payload, "ssh-ed25519,rsa-sha2-512,rsa-sha2-256");
    put_name_list(
        &mut payload,
        "chacha20-poly1305@openssh.com,aes128-ctr,aes256-ctr",
    );
    put_name_list(
        &mut payload,
        "chacha20-poly1305@openssh.com,aes128-ctr,aes256-ctr",
    );
    put_name_list(&mut payload, "hmac-sha2-256,hmac-sha2-512");
    put_name_list(&mut payload, "hmac-sha2-256,hmac-sha2-512");
    put_name_list(&mut payload, "none");
    put_name_list(&mut payload, "none");
    put_name_list(&mut payload, "");
    put_name_list(&mut payload, "");
    // first_kex_packet_follows + reserved
    payload.push(0);
    payload.extend_from_slice(&0u32.to_be_bytes());
    payload
}

/// Identification line, replayed KEXINIT, then `SSH_MSG_IGNORE` packets
/// forever. A real client sits in key exchange until it gives up.
pub struct TransHold {
    validator: ValidatorConfig,
    kexinit: Vec<u8>,
}

impl TransHold {
    pub fn new() -> Self {
        Self {
            validator: ValidatorConfig::for_prefixes(&[b"SSH-"], 4)
                .with_empty_probe_banner(IDENT),
            kexinit: binary_packet(&kexinit_payload()),
        }
    }
}

impl Default for TransHold {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolPattern for TransHold {
    fn name(&self) -> &'static str {
        "ssh_trans_hold"
    }

    fn defaults(&self) -> PatternDefaults {
        PatternDefaults::baseline()
    }

    fn validator(&self) -> Option<&ValidatorConfig> {
        Some(&self.validator)
    }

    async fn serve(&self, _reader: &mut OwnedReadHalf, writer: &mut ConnWriter) -> io::Result<()> {
        writer.write(IDENT).await?;
        writer.write(&self.kexinit).await?;
        loop {
            writer.write(&msg_ignore(16)).await?;
        }
    }
}

/// The endless random-hex-line stream, gated behind an `SSH-` prefix
/// check so only clients that speak first get stuck in it.
pub struct EndlessBanner {
    validator: ValidatorConfig,
}

impl EndlessBanner {
    pub fn new() -> Self {
        Self {
            validator: ValidatorConfig::for_prefixes(&[b"SSH-"], 4),
        }
    }
}

impl Default for EndlessBanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolPattern for EndlessBanner {
    fn name(&self) -> &'static str {
        "ssh_endless_banner"
    }

    fn defaults(&self) -> PatternDefaults {
        PatternDefaults::baseline()
    }

    fn validator(&self) -> Option<&ValidatorConfig> {
        Some(&self.validator)
    }

    async fn serve(&self, _reader: &mut OwnedReadHalf, writer: &mut ConnWriter) -> io::Result<()> {
        loop {
            let line = format!("{:x}\r\n", rand::random::<u32>());
            writer.write(line.as_bytes()).await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_invariant_holds_for_all_payload_sizes() {
        for len in 0..=256 {
            let payload = vec![0xabu8; len];
            let packet = binary_packet(&payload);

            let packet_length =
                u32::from_be_bytes([packet[0], packet[1], packet[2], packet[3]]) as usize;
            let padding = packet[4] as usize;

            assert_eq!(packet.len(), 4 + packet_length);
            assert_eq!(packet_length, 1 + len + padding);
            assert_eq!((1 + len + padding) % 8, 0, "len={}", len);
            assert!((4..=11).contains(&padding), "len={} padding={}", len, padding);
        }
    }

    #[test]
    fn packet_carries_payload_then_zero_padding() {
        let packet = binary_packet(b"hello");
        let padding = packet[4] as usize;
        assert_eq!(&packet[5..10], b"hello");
        assert!(packet[10..10 + padding].iter().all(|&b| b == 0));
    }

    #[test]
    fn msg_ignore_is_type_two_and_zeros() {
        let packet = msg_ignore(16);
        assert_eq!(packet[5], MSG_IGNORE);
        assert!(packet[6..6 + 16].iter().all(|&b| b == 0));
    }

    #[test]
    fn kexinit_starts_with_message_type_and_cookie() {
        let payload = kexinit_payload();
        assert_eq!(payload[0], MSG_KEXINIT);
        // cookie + at least the first name-list length
        assert!(payload.len() > 1 + 16 + 4);
        let first_list_len =
            u32::from_be_bytes([payload[17], payload[18], payload[19], payload[20]]) as usize;
        let first_list = &payload[21..21 + first_list_len];
        assert!(first_list.starts_with(b"curve25519-sha256"));
    }
}
