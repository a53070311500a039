//! tarpitd binary: argument parsing, logging setup, and startup.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tarpitd::config::{load_config, TarpitEntry, TarpitdConfig};
use tarpitd::lifecycle::{start_instances, Shutdown};
use tarpitd::net::trace::{TraceDestination, TraceSink};

#[derive(Parser)]
#[command(name = "tarpitd")]
#[command(about = "A daemon making ports into tarpits", long_about = None)]
#[command(version)]
struct Cli {
    /// Load a configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run ad-hoc services alongside (or instead of) the config file.
    #[arg(short = 's', long = "serve", value_name = "PATTERN:HOST:PORT", num_args = 1..)]
    serve: Vec<String>,

    /// Rate limit applied to the --serve directives.
    #[arg(short, long, allow_negative_numbers = true)]
    rate: Option<i64>,

    /// Client-trace destination: "stdout", "stderr", or a file path.
    #[arg(long, value_name = "DEST")]
    trace: Option<String>,

    /// Turn client validation off for every instance.
    #[arg(long)]
    disable_validation: bool,

    /// Increase log verbosity.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Split a `PATTERN:HOST:PORT` serve directive.
fn parse_serve_directive(directive: &str, rate: Option<i64>) -> Result<TarpitEntry, String> {
    let mut parts = directive.splitn(3, ':');
    let (Some(pattern), Some(host), Some(port)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!(
            "malformed serve directive \"{}\", expected PATTERN:HOST:PORT",
            directive
        ));
    };
    let port: u16 = port
        .parse()
        .map_err(|_| format!("bad port in serve directive \"{}\"", directive))?;
    Ok(TarpitEntry::ad_hoc(pattern, host, port, rate))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "tarpitd=info",
        _ => "tarpitd=debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tarpitd starting");

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => TarpitdConfig::default(),
    };

    for directive in &cli.serve {
        config.tarpit.push(parse_serve_directive(directive, cli.rate)?);
    }
    if let Some(dest) = &cli.trace {
        config.trace.destination = dest.clone();
    }
    if cli.disable_validation {
        for entry in &mut config.tarpit {
            entry.client_validation = Some(false);
        }
    }

    if config.tarpit.is_empty() {
        return Err("no tarpits configured; use --config or --serve".into());
    }

    let tracer = TraceSink::open(&TraceDestination::parse(&config.trace.destination)).await?;
    let shutdown = Shutdown::new();

    let started = start_instances(&config, &tracer, &shutdown).await;
    if started == 0 {
        return Err("no listeners could be started".into());
    }
    tracing::info!(listeners = started, "startup complete");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    shutdown.trigger();
    // Let connection tasks run their close paths and the trace sink drain.
    tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    tracing::info!("shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_directive_parses() {
        let entry = parse_serve_directive("http_endless_header:0.0.0.0:8080", Some(-2)).unwrap();
        assert_eq!(entry.pattern, "http_endless_header");
        assert_eq!(entry.binds[0].addr(), "0.0.0.0:8080");
        assert_eq!(entry.rate_limit, Some(-2));
    }

    #[test]
    fn malformed_serve_directive_is_rejected() {
        assert!(parse_serve_directive("http_endless_header", None).is_err());
        assert!(parse_serve_directive("x:y:not-a-port", None).is_err());
    }
}
