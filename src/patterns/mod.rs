//! Protocol pattern library.
//!
//! # Data Flow
//! ```text
//! config name ──▶ build() ──▶ pattern instance (content generated once)
//!                                 │ defaults()   merged with overrides
//!                                 │ validator()  used by the supervisor
//!                                 ▼
//!                              serve(reader, paced writer)
//! ```
//!
//! Each pattern is an independent type implementing the flat
//! [`ProtocolPattern`] capability surface; the registry is the explicit
//! `match` in [`build`], nothing is discovered at runtime.

pub mod banner;
pub mod content;
pub mod ftp;
pub mod http;
pub mod smtp;
pub mod ssh;
pub mod tls;

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::net::pacing::{PacedWriter, RateSpec};
use crate::net::validator::ValidatorConfig;
use self::content::BombEncoding;

/// The paced write half every handler writes through.
pub type ConnWriter = PacedWriter<OwnedWriteHalf>;

/// Settings a pattern ships with, before any caller overrides.
#[derive(Debug, Clone, Copy)]
pub struct PatternDefaults {
    pub rate_limit: i64,
    pub max_clients: usize,
    pub client_validation: bool,
}

impl PatternDefaults {
    /// The library-wide baseline; patterns adjust what differs.
    pub fn baseline() -> Self {
        Self {
            rate_limit: -2,
            max_clients: 32,
            client_validation: true,
        }
    }
}

/// Caller-supplied settings. `None` fields leave the pattern default
/// in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternOverrides {
    pub rate_limit: Option<i64>,
    pub max_clients: Option<usize>,
    pub client_validation: Option<bool>,
    pub client_trace: Option<bool>,
    /// html bomb only: container format.
    pub compression: Option<BombEncoding>,
    /// tls_slow_hello only: re-send the record forever or serve it once.
    pub repeat: Option<bool>,
}

/// Resolved per-instance settings. Immutable after the merge.
#[derive(Debug, Clone)]
pub struct PatternConfig {
    pub name: String,
    pub rate_limit: i64,
    pub max_clients: usize,
    pub client_validation: bool,
    pub client_trace: bool,
}

impl PatternConfig {
    /// Ordered field merge: pattern defaults overlaid by caller
    /// overrides; absent overrides are ignored.
    pub fn resolve(name: &str, defaults: PatternDefaults, overrides: &PatternOverrides) -> Self {
        Self {
            name: name.to_string(),
            rate_limit: overrides.rate_limit.unwrap_or(defaults.rate_limit),
            max_clients: overrides.max_clients.unwrap_or(defaults.max_clients),
            client_validation: overrides
                .client_validation
                .unwrap_or(defaults.client_validation),
            client_trace: overrides.client_trace.unwrap_or(false),
        }
    }

    pub fn rate(&self) -> RateSpec {
        RateSpec::from_raw(self.rate_limit)
    }
}

/// One tarpit strategy: default settings, an optional client validator,
/// and the per-connection write behavior.
///
/// Handlers with bounded payloads return `Ok(())` and let the supervisor
/// drain and close; endless handlers only ever return through an error.
#[async_trait]
pub trait ProtocolPattern: Send + Sync {
    /// Registry key this instance was built under.
    fn name(&self) -> &'static str;

    fn defaults(&self) -> PatternDefaults;

    fn validator(&self) -> Option<&ValidatorConfig> {
        None
    }

    async fn serve(&self, reader: &mut OwnedReadHalf, writer: &mut ConnWriter) -> io::Result<()>;
}

/// Error type for pattern construction.
#[derive(Debug)]
pub enum RegistryError {
    UnknownPattern(String),
    ContentGeneration(io::Error),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::UnknownPattern(name) => write!(f, "unknown pattern: {}", name),
            RegistryError::ContentGeneration(e) => write!(f, "content generation failed: {}", e),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<io::Error> for RegistryError {
    fn from(e: io::Error) -> Self {
        RegistryError::ContentGeneration(e)
    }
}

/// Construct a pattern by its case-insensitive registry key.
///
/// Precomputed payloads are generated here, once, before any connection
/// is accepted.
pub fn build(
    key: &str,
    overrides: &PatternOverrides,
) -> Result<Arc<dyn ProtocolPattern>, RegistryError> {
    let pattern: Arc<dyn ProtocolPattern> = match key.to_ascii_lowercase().as_str() {
        "endless_banner" | "endlessh" => Arc::new(banner::EndlessBanner::new()),
        "egsh_aminoas" => Arc::new(banner::EgshAminoas::new()),
        "http_endless_header" | "http_endless_cookie" => Arc::new(http::EndlessHeader::new()),
        "http_deflate_size_bomb" => Arc::new(http::BoundedResponse::size_bomb()?),
        "http_deflate_html_bomb" => Arc::new(http::BoundedResponse::html_bomb(
            overrides.compression.unwrap_or(BombEncoding::Deflate),
        )?),
        "http_bad_site" => Arc::new(http::BoundedResponse::bad_site()),
        "ssh_trans_hold" => Arc::new(ssh::TransHold::new()),
        "ssh_endless_banner" => Arc::new(ssh::EndlessBanner::new()),
        "tls_endless_hello_request" => Arc::new(tls::EndlessHelloRequest::new()),
        "tls_slow_hello" => Arc::new(tls::SlowHello::new(overrides.repeat.unwrap_or(true))),
        "ftp_endless_motd" => Arc::new(ftp::EndlessMotd::new()),
        "smtp_endless_ehlo" => Arc::new(smtp::EndlessEhlo::new()),
        _ => return Err(RegistryError::UnknownPattern(key.to_string())),
    };
    Ok(pattern)
}

/// Whether `key` names a registered pattern (used by config validation
/// before anything expensive is constructed).
pub fn known(key: &str) -> bool {
    matches!(
        key.to_ascii_lowercase().as_str(),
        "endless_banner"
            | "endlessh"
            | "egsh_aminoas"
            | "http_endless_header"
            | "http_endless_cookie"
            | "http_deflate_size_bomb"
            | "http_deflate_html_bomb"
            | "http_bad_site"
            | "ssh_trans_hold"
            | "ssh_endless_banner"
            | "tls_endless_hello_request"
            | "tls_slow_hello"
            | "ftp_endless_motd"
            | "smtp_endless_ehlo"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win_over_defaults() {
        let defaults = PatternDefaults {
            rate_limit: -2,
            max_clients: 32,
            client_validation: true,
        };
        let overrides = PatternOverrides {
            rate_limit: Some(1024),
            client_validation: Some(false),
            ..Default::default()
        };
        let config = PatternConfig::resolve("pit", defaults, &overrides);
        assert_eq!(config.rate_limit, 1024);
        assert_eq!(config.max_clients, 32);
        assert!(!config.client_validation);
        assert!(!config.client_trace);
        assert_eq!(config.rate(), RateSpec::BytesPerSec(1024));
    }

    #[test]
    fn absent_overrides_are_ignored() {
        let config = PatternConfig::resolve(
            "pit",
            PatternDefaults::baseline(),
            &PatternOverrides::default(),
        );
        assert_eq!(config.rate_limit, -2);
        assert_eq!(config.max_clients, 32);
        assert!(config.client_validation);
    }

    #[test]
    fn registry_is_case_insensitive_and_total() {
        assert!(known("HTTP_ENDLESS_HEADER"));
        assert!(known("EndLessH"));
        assert!(!known("gopher_endless_menu"));

        let err = build("gopher_endless_menu", &PatternOverrides::default());
        assert!(matches!(err, Err(RegistryError::UnknownPattern(_))));
    }

    #[test]
    fn cheap_patterns_construct() {
        for key in [
            "endless_banner",
            "egsh_aminoas",
            "http_endless_header",
            "http_bad_site",
            "ssh_trans_hold",
            "ssh_endless_banner",
            "tls_endless_hello_request",
            "tls_slow_hello",
            "ftp_endless_motd",
            "smtp_endless_ehlo",
        ] {
            let pattern = build(key, &PatternOverrides::default()).unwrap();
            assert_eq!(pattern.name(), key);
        }
    }
}
