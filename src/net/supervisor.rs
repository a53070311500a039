//! Connection lifecycle supervision.
//!
//! # Data Flow
//! ```text
//! accept (permit held)
//!     → OPEN        trace open, split socket, probe-rate writer
//!     → VALIDATING  classify() against the pattern's validator
//!     → ACCEPTED    service rate applied, pattern serves
//!         → SERVING → DRAINING → CLOSED      (bounded payload)
//!         → SERVING → CLOSED                 (infinite loop, error exit)
//!     → REJECTED → PUNITIVE_DELAY → CLOSED
//! ```
//! Every path, including shutdown cancellation and unexpected faults,
//! converges on a single close-trace emission. One bad connection never
//! takes down the listener.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

use crate::lifecycle::Shutdown;
use crate::net::listener::{BoundListener, ConnectionPermit};
use crate::net::pacing::{PacedWriter, RateSpec};
use crate::net::trace::{printable, ConnectionContext, TraceEvent, TraceSink};
use crate::net::validator::classify;
use crate::patterns::{PatternConfig, ProtocolPattern};

/// Rejected clients wait this long before the socket closes: long enough
/// to tie up a scanner's connection slot, randomized so the delay cannot
/// be fingerprinted and subtracted out.
const PUNITIVE_DELAY_SECS: std::ops::Range<f64> = 16.0..32.0;

/// Post-payload linger: a few short reads looking for the client's EOF
/// so a bounded response is not cut off by our close.
const LINGER_ROUNDS: u32 = 3;
const LINGER_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Faults are split in two: peer disconnects are routine, anything else
/// is a bug worth a loud log.
#[derive(Debug, Error)]
enum ServeError {
    #[error("peer disconnected: {0}")]
    Disconnect(#[source] io::Error),
    #[error("unexpected connection fault: {0}")]
    Unexpected(#[source] io::Error),
}

impl From<io::Error> for ServeError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => ServeError::Disconnect(e),
            _ => ServeError::Unexpected(e),
        }
    }
}

enum Outcome {
    Served,
    Rejected,
}

/// Drives all connections of one `(instance, bind)` listener.
pub struct Supervisor {
    pattern: Arc<dyn ProtocolPattern>,
    config: Arc<PatternConfig>,
    tracer: TraceSink,
}

impl Supervisor {
    pub fn new(
        pattern: Arc<dyn ProtocolPattern>,
        config: Arc<PatternConfig>,
        tracer: TraceSink,
    ) -> Arc<Self> {
        Arc::new(Self {
            pattern,
            config,
            tracer,
        })
    }

    /// Accept loop. Runs until shutdown fires; each connection gets its
    /// own task and its own shutdown subscription.
    pub async fn run(self: Arc<Self>, listener: BoundListener, shutdown: Shutdown) {
        let mut stop = shutdown.subscribe();
        loop {
            tokio::select! {
                _ = stop.recv() => {
                    tracing::info!(
                        local = %listener.local_addr(),
                        name = %self.config.name,
                        "listener stopping"
                    );
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, _peer, permit)) => {
                        let supervisor = Arc::clone(&self);
                        let stop = shutdown.subscribe();
                        tokio::spawn(async move {
                            supervisor.handle_connection(stream, permit, stop).await;
                        });
                    }
                    Err(e) => {
                        tracing::error!(
                            local = %listener.local_addr(),
                            error = %e,
                            "accept failed"
                        );
                        sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        }
    }

    /// One pass of the per-connection state machine. The close trace is
    /// emitted exactly once, here, whatever path the connection took.
    async fn handle_connection(
        &self,
        stream: TcpStream,
        permit: ConnectionPermit,
        mut stop: tokio::sync::broadcast::Receiver<()>,
    ) {
        let remote_addr = match stream.peer_addr() {
            Ok(addr) => addr,
            Err(e) => {
                // Peer vanished between accept and here.
                tracing::debug!(error = %e, "connection gone before open");
                return;
            }
        };
        let local_addr = match stream.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                tracing::debug!(error = %e, "connection gone before open");
                return;
            }
        };
        let ctx = ConnectionContext {
            remote_addr,
            local_addr,
            name: self.config.name.clone(),
            pattern: self.pattern.name(),
        };

        tracing::info!(
            remote = %ctx.remote_addr,
            local = %ctx.local_addr,
            pattern = ctx.pattern,
            "connection open"
        );
        self.tracer.emit(ctx.record(TraceEvent::Open, None));

        let close_comment = tokio::select! {
            result = self.drive(stream, &ctx) => match result {
                Ok(Outcome::Served) => {
                    tracing::info!(remote = %ctx.remote_addr, "payload served");
                    None
                }
                Ok(Outcome::Rejected) => Some("rejected".to_string()),
                Err(ServeError::Disconnect(e)) => {
                    tracing::info!(remote = %ctx.remote_addr, error = %e, "peer disconnected");
                    self.tracer
                        .emit(ctx.record(TraceEvent::ConnError, Some(e.to_string())));
                    Some(e.to_string())
                }
                Err(ServeError::Unexpected(e)) => {
                    tracing::error!(
                        remote = %ctx.remote_addr,
                        pattern = ctx.pattern,
                        error = %e,
                        "unexpected fault while serving"
                    );
                    self.tracer
                        .emit(ctx.record(TraceEvent::ConnError, Some(e.to_string())));
                    Some(e.to_string())
                }
            },
            _ = stop.recv() => Some("shutdown".to_string()),
        };

        tracing::info!(remote = %ctx.remote_addr, "connection close");
        self.tracer.emit(ctx.record(TraceEvent::Close, close_comment));
        drop(permit);
    }

    /// OPEN through SERVING/REJECTED. Returns through `?` on the nearest
    /// exit edge for any I/O failure.
    async fn drive(&self, stream: TcpStream, ctx: &ConnectionContext) -> Result<Outcome, ServeError> {
        let (mut reader, write_half) = stream.into_split();
        // Probe rate for the validation exchange; the service rate takes
        // over only once the client is accepted.
        let mut writer = PacedWriter::new(RateSpec::Unlimited, write_half);

        let validator = if self.config.client_validation {
            self.pattern.validator()
        } else {
            None
        };
        let examined = validator.is_some();
        let verdict = classify(validator, &mut reader, &mut writer).await?;

        if examined {
            let comment = match (verdict.accepted, verdict.note) {
                (_, Some(note)) => format!(
                    "prefix \"{}\": {}",
                    printable(&verdict.observed_prefix),
                    note
                ),
                (true, None) => format!("prefix \"{}\" accepted", printable(&verdict.observed_prefix)),
                (false, None) => format!("prefix \"{}\" rejected", printable(&verdict.observed_prefix)),
            };
            self.tracer.emit(ctx.record(TraceEvent::Exam, Some(comment)));
        }

        if !verdict.accepted {
            tracing::info!(
                remote = %ctx.remote_addr,
                observed = %printable(&verdict.observed_prefix),
                "client rejected"
            );
            let delay = rand::thread_rng().gen_range(PUNITIVE_DELAY_SECS);
            sleep(Duration::from_secs_f64(delay)).await;
            return Ok(Outcome::Rejected);
        }

        writer.change_rate(self.config.rate());
        self.pattern.serve(&mut reader, &mut writer).await?;

        // Bounded payload finished: drain, then give the client a moment
        // to read what is still in flight before the socket closes.
        writer.flush().await?;
        linger_for_eof(&mut reader).await;
        Ok(Outcome::Served)
    }
}

/// Best-effort wait for the client to finish reading: a few short-timeout
/// reads, stopping early at EOF. Not a delivery guarantee.
async fn linger_for_eof(reader: &mut OwnedReadHalf) {
    let mut sink = [0u8; 512];
    for _ in 0..LINGER_ROUNDS {
        match timeout(LINGER_READ_TIMEOUT, reader.read(&mut sink)).await {
            Ok(Ok(0)) | Ok(Err(_)) => break,
            // Late bytes from the client are discarded unread.
            Ok(Ok(_)) => continue,
            Err(_) => continue,
        }
    }
}
