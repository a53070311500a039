//! Byte-paced writes to a connection.
//!
//! # Responsibilities
//! - Deliver every buffer in full, honoring the configured rate
//! - Flush after every underlying write (no internal buffering)
//! - Propagate connection errors to the supervisor unmodified

use std::io;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::sleep;

/// Pacing policy for a connection's outbound bytes.
///
/// Built from the signed rate integer in configuration: `0` means no pacing,
/// a positive value caps throughput at that many bytes per second, and a
/// negative value sends one byte every `|rate|` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSpec {
    /// Single write + flush, no delay.
    Unlimited,
    /// At most this many bytes per second.
    BytesPerSec(u64),
    /// One byte every this many seconds.
    SecsPerByte(u64),
}

impl RateSpec {
    /// Interpret the raw config integer.
    pub fn from_raw(rate: i64) -> Self {
        if rate == 0 {
            RateSpec::Unlimited
        } else if rate > 0 {
            RateSpec::BytesPerSec(rate as u64)
        } else {
            RateSpec::SecsPerByte(rate.unsigned_abs())
        }
    }
}

/// A write half wrapped with a pacing policy.
///
/// The policy is selected once per rate change, never mid-buffer. The
/// supervisor starts every connection at [`RateSpec::Unlimited`] for the
/// validation phase and swaps in the service rate after acceptance.
pub struct PacedWriter<W> {
    sink: W,
    rate: RateSpec,
}

impl<W: AsyncWrite + Unpin> PacedWriter<W> {
    pub fn new(rate: RateSpec, sink: W) -> Self {
        Self { sink, rate }
    }

    pub fn rate(&self) -> RateSpec {
        self.rate
    }

    /// Swap the pacing policy. Takes effect on the next `write` call.
    pub fn change_rate(&mut self, rate: RateSpec) {
        self.rate = rate;
    }

    /// Hand the whole buffer to the sink under the active policy.
    ///
    /// Connection errors abort immediately; no partial retry.
    pub async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        match self.rate {
            RateSpec::Unlimited => {
                self.sink.write_all(data).await?;
                self.sink.flush().await
            }
            RateSpec::SecsPerByte(secs) => {
                for byte in data {
                    sleep(Duration::from_secs(secs)).await;
                    self.sink.write_all(std::slice::from_ref(byte)).await?;
                    self.sink.flush().await?;
                }
                Ok(())
            }
            RateSpec::BytesPerSec(limit) => {
                // Full chunks each wait out their second; the tail rides
                // on the last chunk's budget.
                let mut chunks = data.chunks_exact(limit as usize);
                for chunk in chunks.by_ref() {
                    sleep(Duration::from_secs(1)).await;
                    self.sink.write_all(chunk).await?;
                    self.sink.flush().await?;
                }
                let tail = chunks.remainder();
                if !tail.is_empty() {
                    self.sink.write_all(tail).await?;
                    self.sink.flush().await?;
                }
                Ok(())
            }
        }
    }

    pub async fn flush(&mut self) -> io::Result<()> {
        self.sink.flush().await
    }
}
