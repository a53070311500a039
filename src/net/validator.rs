//! Client validation: telling protocol speakers apart from empty probes.
//!
//! # Responsibilities
//! - Read a bounded prefix from the connection under one deadline
//! - Classify it against the pattern's expected-prefix set
//! - Speak first (banner) or answer rejection where the pattern asks for it
//!
//! A validation timeout is not an error: it simply ends the read with
//! however many bytes arrived, possibly zero. Zero bytes is its own
//! classified outcome, because port scanners that hold a socket open
//! without sending anything are exactly what some patterns want to bait.

use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::time::{timeout_at, Instant};

use crate::net::pacing::PacedWriter;

/// How a pattern wants its clients examined. Owned by the pattern,
/// shared read-only across all of its connections.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Accept when any of these is a prefix of the collected bytes.
    pub expected_prefixes: Vec<Vec<u8>>,
    /// Overall deadline for the prefix read.
    pub read_timeout: Duration,
    /// How many bytes to collect before classifying.
    pub prefix_length: usize,
    /// Written before reading anything. For protocols where the server
    /// speaks first and silence would itself look suspicious.
    pub pre_validation_banner: Option<Vec<u8>>,
    /// Written when the read yields zero bytes: bait for probers that
    /// hold the socket open waiting for a server banner.
    pub empty_probe_banner: Option<Vec<u8>>,
    /// Written on a prefix mismatch, if non-empty.
    pub rejection_response: Option<Vec<u8>>,
}

impl ValidatorConfig {
    /// Standard shape: match the given prefixes, nothing else.
    pub fn for_prefixes(prefixes: &[&[u8]], prefix_length: usize) -> Self {
        Self {
            expected_prefixes: prefixes.iter().map(|p| p.to_vec()).collect(),
            read_timeout: Duration::from_secs(5),
            prefix_length,
            pre_validation_banner: None,
            empty_probe_banner: None,
            rejection_response: None,
        }
    }

    pub fn with_pre_banner(mut self, banner: &[u8]) -> Self {
        self.pre_validation_banner = Some(banner.to_vec());
        self
    }

    pub fn with_empty_probe_banner(mut self, banner: &[u8]) -> Self {
        self.empty_probe_banner = Some(banner.to_vec());
        self
    }
}

/// Outcome of examining one connection. Consumed by the supervisor
/// immediately, then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub accepted: bool,
    pub observed_prefix: Vec<u8>,
    pub note: Option<&'static str>,
}

impl ValidationResult {
    /// The no-op validator's verdict: everything passes, nothing observed.
    fn pass() -> Self {
        Self {
            accepted: true,
            observed_prefix: Vec::new(),
            note: None,
        }
    }
}

/// Examine a connection against `cfg`.
///
/// `None` is the disabled validator: every client is accepted without
/// touching the socket. I/O errors bubble up so the supervisor can take
/// its connection-fault edge; timeout and mismatch do not.
pub async fn classify<R, W>(
    cfg: Option<&ValidatorConfig>,
    reader: &mut R,
    writer: &mut PacedWriter<W>,
) -> io::Result<ValidationResult>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let Some(cfg) = cfg else {
        return Ok(ValidationResult::pass());
    };

    if let Some(banner) = &cfg.pre_validation_banner {
        writer.write(banner).await?;
    }

    let observed = read_prefix(reader, cfg.prefix_length, cfg.read_timeout).await?;

    if observed.is_empty() {
        if let Some(banner) = &cfg.empty_probe_banner {
            writer.write(banner).await?;
            return Ok(ValidationResult {
                accepted: false,
                observed_prefix: observed,
                note: Some("empty probe, banner pushed"),
            });
        }
    }

    if cfg
        .expected_prefixes
        .iter()
        .any(|expected| observed.starts_with(expected))
    {
        return Ok(ValidationResult {
            accepted: true,
            observed_prefix: observed,
            note: None,
        });
    }

    if let Some(response) = &cfg.rejection_response {
        if !response.is_empty() {
            writer.write(response).await?;
        }
    }
    Ok(ValidationResult {
        accepted: false,
        observed_prefix: observed,
        note: None,
    })
}

/// Accumulate up to `want` bytes until the deadline elapses or the peer
/// closes. Returns whatever arrived.
async fn read_prefix<R: AsyncRead + Unpin>(
    reader: &mut R,
    want: usize,
    window: Duration,
) -> io::Result<Vec<u8>> {
    let deadline = Instant::now() + window;
    let mut observed = Vec::with_capacity(want);
    let mut buf = [0u8; 64];

    while observed.len() < want {
        let remaining = want - observed.len();
        let slot = &mut buf[..remaining.min(64)];
        match timeout_at(deadline, reader.read(slot)).await {
            // Deadline: classify whatever we have.
            Err(_) => break,
            // Peer closed its half.
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => observed.extend_from_slice(&slot[..n]),
            Ok(Err(e)) => return Err(e),
        }
    }
    Ok(observed)
}
