//! Daemon startup: turn validated configuration into running listeners.
//!
//! Every bind entry is attempted independently. A pattern that fails to
//! construct, or an address that fails to bind, is logged and skipped;
//! the rest of the daemon comes up regardless.

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::config::TarpitdConfig;
use crate::lifecycle::Shutdown;
use crate::net::listener::BoundListener;
use crate::net::supervisor::Supervisor;
use crate::net::trace::TraceSink;
use crate::patterns::{self, PatternConfig};

/// Spawn a supervisor per `(instance, bind)`. Returns how many
/// listeners actually started.
pub async fn start_instances(
    config: &TarpitdConfig,
    tracer: &TraceSink,
    shutdown: &Shutdown,
) -> usize {
    let mut started = 0;

    for entry in &config.tarpit {
        let name = entry.instance_name();
        let overrides = entry.overrides();

        let pattern = match patterns::build(&entry.pattern, &overrides) {
            Ok(pattern) => pattern,
            Err(e) => {
                tracing::error!(name, pattern = %entry.pattern, error = %e, "skipping instance");
                continue;
            }
        };

        let pattern_config = Arc::new(PatternConfig::resolve(
            name,
            pattern.defaults(),
            &overrides,
        ));
        // One permit pool per instance: max_clients spans all its binds.
        let client_limit = Arc::new(Semaphore::new(pattern_config.max_clients));
        let sink = if pattern_config.client_trace {
            tracer.clone()
        } else {
            TraceSink::disabled()
        };

        for bind in &entry.binds {
            let addr = bind.addr();
            match BoundListener::bind(&addr, Arc::clone(&client_limit)).await {
                Ok(listener) => {
                    tracing::info!(
                        name,
                        pattern = pattern.name(),
                        local = %listener.local_addr(),
                        rate_limit = pattern_config.rate_limit,
                        max_clients = pattern_config.max_clients,
                        "tarpit listening"
                    );
                    let supervisor = Supervisor::new(
                        Arc::clone(&pattern),
                        Arc::clone(&pattern_config),
                        sink.clone(),
                    );
                    tokio::spawn(supervisor.run(listener, shutdown.clone()));
                    started += 1;
                }
                Err(e) => {
                    tracing::error!(name, %addr, error = %e, "bind failed, skipping listener");
                }
            }
        }
    }

    started
}
