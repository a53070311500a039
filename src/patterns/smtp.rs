//! SMTP tarpit: an EHLO response that keeps advertising capabilities.

use std::io;

use async_trait::async_trait;
use tokio::net::tcp::OwnedReadHalf;

use super::{ConnWriter, PatternDefaults, ProtocolPattern};
use crate::net::validator::ValidatorConfig;

const GREETING: &[u8] = b"220 mail ESMTP Postfix\r\n";

pub struct EndlessEhlo {
    validator: ValidatorConfig,
}

impl EndlessEhlo {
    pub fn new() -> Self {
        Self {
            validator: ValidatorConfig::for_prefixes(&[b"EHLO", b"HELO"], 4)
                .with_pre_banner(GREETING),
        }
    }
}

impl Default for EndlessEhlo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolPattern for EndlessEhlo {
    fn name(&self) -> &'static str {
        "smtp_endless_ehlo"
    }

    fn defaults(&self) -> PatternDefaults {
        PatternDefaults::baseline()
    }

    fn validator(&self) -> Option<&ValidatorConfig> {
        Some(&self.validator)
    }

    async fn serve(&self, _reader: &mut OwnedReadHalf, writer: &mut ConnWriter) -> io::Result<()> {
        loop {
            let line = format!("250-{:x}\r\n", rand::random::<u32>());
            writer.write(line.as_bytes()).await?;
        }
    }
}
