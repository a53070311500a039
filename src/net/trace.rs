//! Machine-readable client trace records.
//!
//! One JSON line per connection event, written to a configurable
//! destination. The sink is an explicit handle cloned into each
//! supervisor at construction; there is no process-global trace state.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

/// Where trace lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceDestination {
    Stdout,
    Stderr,
    File(PathBuf),
}

impl TraceDestination {
    pub fn parse(value: &str) -> Self {
        match value {
            "stdout" | "-" => TraceDestination::Stdout,
            "stderr" => TraceDestination::Stderr,
            path => TraceDestination::File(PathBuf::from(path)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceEvent {
    Open,
    Exam,
    ConnError,
    Close,
}

/// Address pair for one connection, formatted `ip:port`.
#[derive(Debug, Clone, Serialize)]
pub struct ConnInfo {
    pub remote: String,
    pub local: String,
}

/// Per-connection identity, created at accept time and never mutated
/// afterwards. Used only for trace emission.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub remote_addr: SocketAddr,
    pub local_addr: SocketAddr,
    /// Instance name from configuration.
    pub name: String,
    /// Registry key of the pattern serving this connection.
    pub pattern: &'static str,
}

impl ConnectionContext {
    pub fn record(&self, event: TraceEvent, comment: Option<String>) -> TraceRecord {
        TraceRecord {
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            event,
            name: self.name.clone(),
            pattern: self.pattern.to_string(),
            conn_info: ConnInfo {
                remote: self.remote_addr.to_string(),
                local: self.local_addr.to_string(),
            },
            comment,
        }
    }
}

/// One trace line.
#[derive(Debug, Clone, Serialize)]
pub struct TraceRecord {
    pub time: String,
    pub event: TraceEvent,
    pub name: String,
    pub pattern: String,
    pub conn_info: ConnInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Render raw bytes as a printable escape for use in `comment` fields.
pub fn printable(bytes: &[u8]) -> String {
    bytes.escape_ascii().to_string()
}

/// Handle for emitting trace records. Cheap to clone; a disabled sink
/// drops records without queuing.
#[derive(Debug, Clone)]
pub struct TraceSink {
    tx: Option<mpsc::UnboundedSender<TraceRecord>>,
}

impl TraceSink {
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Open the destination and spawn the writer task that drains
    /// queued records to it.
    pub async fn open(dest: &TraceDestination) -> io::Result<Self> {
        let mut out: Box<dyn tokio::io::AsyncWrite + Send + Unpin> = match dest {
            TraceDestination::Stdout => Box::new(tokio::io::stdout()),
            TraceDestination::Stderr => Box::new(tokio::io::stderr()),
            TraceDestination::File(path) => Box::new(
                tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await?,
            ),
        };

        let (tx, mut rx) = mpsc::unbounded_channel::<TraceRecord>();
        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                let mut line = match serde_json::to_string(&record) {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::error!(error = %e, "trace record serialization failed");
                        continue;
                    }
                };
                line.push('\n');
                if let Err(e) = out.write_all(line.as_bytes()).await {
                    tracing::error!(error = %e, "trace sink write failed");
                    break;
                }
                let _ = out.flush().await;
            }
        });

        Ok(Self { tx: Some(tx) })
    }

    pub fn emit(&self, record: TraceRecord) {
        if let Some(tx) = &self.tx {
            // Writer task gone means shutdown is in progress; drop the line.
            let _ = tx.send(record);
        }
    }
}
