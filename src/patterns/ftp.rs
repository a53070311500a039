//! FTP tarpit: a login reply that never finishes.
//!
//! `230-` continuation lines are valid multi-line reply syntax; the
//! terminating `230 ` line never comes, so a conforming client keeps
//! collecting the message of the day forever.

use std::io;

use async_trait::async_trait;
use tokio::net::tcp::OwnedReadHalf;

use super::{ConnWriter, PatternDefaults, ProtocolPattern};
use crate::net::validator::ValidatorConfig;

const GREETING: &[u8] = b"220 (vsFTPd 3.0.5)\r\n";

pub struct EndlessMotd {
    validator: ValidatorConfig,
}

impl EndlessMotd {
    pub fn new() -> Self {
        Self {
            validator: ValidatorConfig::for_prefixes(&[b"USER"], 4).with_pre_banner(GREETING),
        }
    }
}

impl Default for EndlessMotd {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolPattern for EndlessMotd {
    fn name(&self) -> &'static str {
        "ftp_endless_motd"
    }

    fn defaults(&self) -> PatternDefaults {
        PatternDefaults::baseline()
    }

    fn validator(&self) -> Option<&ValidatorConfig> {
        Some(&self.validator)
    }

    async fn serve(&self, _reader: &mut OwnedReadHalf, writer: &mut ConnWriter) -> io::Result<()> {
        let mut seq: u64 = 0;
        loop {
            let line = format!("230-{:04x} {:x}\r\n", seq, rand::random::<u32>());
            writer.write(line.as_bytes()).await?;
            seq = seq.wrapping_add(1);
        }
    }
}
