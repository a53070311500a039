//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::Semaphore;

use tarpitd::lifecycle::Shutdown;
use tarpitd::net::listener::BoundListener;
use tarpitd::net::supervisor::Supervisor;
use tarpitd::net::trace::TraceSink;
use tarpitd::patterns::{self, PatternConfig, PatternOverrides};

/// Start one pattern on an ephemeral loopback port and return its
/// address plus the shutdown handle that stops it.
pub async fn start_pattern(key: &str, overrides: PatternOverrides) -> (SocketAddr, Shutdown) {
    let pattern = patterns::build(key, &overrides).expect("pattern should build");
    let config = Arc::new(PatternConfig::resolve(key, pattern.defaults(), &overrides));
    let client_limit = Arc::new(Semaphore::new(config.max_clients));
    let listener = BoundListener::bind("127.0.0.1:0", client_limit)
        .await
        .expect("loopback bind");
    let addr = listener.local_addr();

    let shutdown = Shutdown::new();
    let supervisor = Supervisor::new(pattern, config, TraceSink::disabled());
    tokio::spawn(supervisor.run(listener, shutdown.clone()));

    (addr, shutdown)
}

/// Overrides that turn pacing off so assertions run at full speed.
pub fn unpaced() -> PatternOverrides {
    PatternOverrides {
        rate_limit: Some(0),
        ..Default::default()
    }
}

/// Read one `\n`-terminated line.
#[allow(dead_code)]
pub async fn read_line(stream: &mut TcpStream) -> String {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = stream.read(&mut byte).await.expect("line read");
        assert!(n > 0, "connection closed mid-line: {:?}", line);
        line.push(byte[0]);
        if byte[0] == b'\n' {
            break;
        }
    }
    String::from_utf8_lossy(&line).into_owned()
}
