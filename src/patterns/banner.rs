//! Plain banner tarpits: no protocol pretense, just an endless stream
//! of lines for whoever connects.

use std::io;

use async_trait::async_trait;
use rand::Rng;
use tokio::net::tcp::OwnedReadHalf;

use super::{ConnWriter, PatternDefaults, ProtocolPattern};

/// Endless random hex lines. The classic ssh-ish tarpit shape, minus
/// any validation: every connection gets the stream.
pub struct EndlessBanner;

impl EndlessBanner {
    pub fn new() -> Self {
        Self
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
        "endless_banner"
    }

    fn defaults(&self) -> PatternDefaults {
        PatternDefaults {
            client_validation: false,
            ..PatternDefaults::baseline()
        }
    }

    async fn serve(&self, _reader: &mut OwnedReadHalf, writer: &mut ConnWriter) -> io::Result<()> {
        loop {
            let line = format!("{:x}\r\n", rand::random::<u32>());
            writer.write(line.as_bytes()).await?;
        }
    }
}

const PHRASES: &[&str] = &[
    "egsh aminoas",
    "aminoas",
    "aminoas aminoas aminoas",
    "sehgilautamoc",
    "hwasia sigeduce",
    "anemi aminoas",
];

/// Endless lines drawn from a small fixed phrase set.
pub struct EgshAminoas;

impl EgshAminoas {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EgshAminoas {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolPattern for EgshAminoas {
    fn name(&self) -> &'static str {
        "egsh_aminoas"
    }

    fn defaults(&self) -> PatternDefaults {
        PatternDefaults {
            client_validation: false,
            ..PatternDefaults::baseline()
        }
    }

    async fn serve(&self, _reader: &mut OwnedReadHalf, writer: &mut ConnWriter) -> io::Result<()> {
        loop {
            let phrase = PHRASES[rand::thread_rng().gen_range(0..PHRASES.len())];
            writer.write(phrase.as_bytes()).await?;
            writer.write(b"\r\n").await?;
        }
    }
}
