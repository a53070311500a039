//! HTTP tarpits: an endless header stream and three bounded one-shot
//! responses built around precomputed payloads.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::tcp::OwnedReadHalf;

use super::content::{self, BombEncoding, GeneratedContent};
use super::{ConnWriter, PatternDefaults, ProtocolPattern, RegistryError};
use crate::net::validator::ValidatorConfig;

const STATUS_200: &[u8] = b"HTTP/1.1 200 OK\r\n";

fn http_validator(prefixes: &[&[u8]]) -> ValidatorConfig {
    ValidatorConfig::for_prefixes(prefixes, 4)
}

/// A 200 status line and then `Set-Cookie` headers forever. The response
/// body never starts, so a compliant client never stops reading headers.
pub struct EndlessHeader {
    validator: ValidatorConfig,
}

impl EndlessHeader {
    pub fn new() -> Self {
        Self {
            validator: http_validator(&[b"GET", b"HEAD", b"POST"]),
        }
    }
}

impl Default for EndlessHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolPattern for EndlessHeader {
    fn name(&self) -> &'static str {
        "http_endless_header"
    }

    fn defaults(&self) -> PatternDefaults {
        PatternDefaults::baseline()
    }

    fn validator(&self) -> Option<&ValidatorConfig> {
        Some(&self.validator)
    }

    async fn serve(&self, _reader: &mut OwnedReadHalf, writer: &mut ConnWriter) -> io::Result<()> {
        writer.write(STATUS_200).await?;
        loop {
            writer.write(b"Set-Cookie: ").await?;
            let cookie = format!("{:x}={:x}\r\n", rand::random::<u32>(), rand::random::<u32>());
            writer.write(cookie.as_bytes()).await?;
        }
    }
}

/// One complete HTTP response from a precomputed payload, then close:
/// the two decompression bombs and the bad-site page.
pub struct BoundedResponse {
    key: &'static str,
    content: Arc<GeneratedContent>,
    validator: ValidatorConfig,
    rate_limit: i64,
}

impl BoundedResponse {
    pub fn size_bomb() -> Result<Self, RegistryError> {
        Ok(Self {
            key: "http_deflate_size_bomb",
            content: Arc::new(content::deflate_size_bomb()?),
            validator: http_validator(&[b"GET", b"HEAD"]),
            rate_limit: 1024,
        })
    }

    pub fn html_bomb(encoding: BombEncoding) -> Result<Self, RegistryError> {
        Ok(Self {
            key: "http_deflate_html_bomb",
            content: Arc::new(content::deflate_html_bomb(encoding)?),
            validator: http_validator(&[b"GET", b"HEAD"]),
            rate_limit: 1024,
        })
    }

    pub fn bad_site() -> Self {
        Self {
            key: "http_bad_site",
            content: Arc::new(content::bad_site_document()),
            validator: http_validator(&[b"GET", b"HEAD"]),
            rate_limit: 0,
        }
    }
}

#[async_trait]
impl ProtocolPattern for BoundedResponse {
    fn name(&self) -> &'static str {
        self.key
    }

    fn defaults(&self) -> PatternDefaults {
        PatternDefaults {
            rate_limit: self.rate_limit,
            ..PatternDefaults::baseline()
        }
    }

    fn validator(&self) -> Option<&ValidatorConfig> {
        Some(&self.validator)
    }

    async fn serve(&self, _reader: &mut OwnedReadHalf, writer: &mut ConnWriter) -> io::Result<()> {
        writer.write(STATUS_200).await?;
        let mut headers = format!("Content-Type: {}\r\n", self.content.content_type);
        if let Some(encoding) = self.content.content_encoding {
            headers.push_str(&format!("Content-Encoding: {}\r\n", encoding));
        }
        headers.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            self.content.body.len()
        ));
        writer.write(headers.as_bytes()).await?;
        writer.write(&self.content.body).await?;
        Ok(())
    }
}
