//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the TOML
//! config file. Per-instance settings are optional throughout: absent
//! fields defer to the selected pattern's built-in defaults.

use serde::{Deserialize, Serialize};

use crate::patterns::content::BombEncoding;
use crate::patterns::PatternOverrides;

/// Root configuration for the daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TarpitdConfig {
    /// Where client-trace records are written.
    pub trace: TraceConfig,

    /// One entry per tarpit instance.
    pub tarpit: Vec<TarpitEntry>,
}

/// Client-trace output section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TraceConfig {
    /// "stdout", "stderr", or a file path.
    pub destination: String,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            destination: "stderr".to_string(),
        }
    }
}

/// One configured tarpit: a pattern, its overrides, and where to bind.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TarpitEntry {
    /// Instance name for logs and traces; defaults to the pattern key.
    pub name: Option<String>,

    /// Registry key, matched case-insensitively.
    pub pattern: String,

    /// See `RateSpec`: 0 unlimited, >0 bytes/second, <0 seconds/byte.
    pub rate_limit: Option<i64>,

    /// Concurrent-connection cap across all binds of this instance.
    pub max_clients: Option<usize>,

    pub client_validation: Option<bool>,

    pub client_trace: Option<bool>,

    /// html bomb only: "deflate" or "gzip".
    pub compression: Option<BombEncoding>,

    /// tls_slow_hello only: keep re-sending the record.
    pub repeat: Option<bool>,

    /// Addresses to listen on.
    #[serde(default)]
    pub binds: Vec<BindEntry>,
}

impl TarpitEntry {
    /// A bare instance as produced by a `-s PATTERN:HOST:PORT` directive.
    pub fn ad_hoc(pattern: &str, host: &str, port: u16, rate_limit: Option<i64>) -> Self {
        Self {
            name: None,
            pattern: pattern.to_string(),
            rate_limit,
            max_clients: None,
            client_validation: None,
            client_trace: None,
            compression: None,
            repeat: None,
            binds: vec![BindEntry {
                host: host.to_string(),
                port,
            }],
        }
    }

    pub fn instance_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.pattern)
    }

    pub fn overrides(&self) -> PatternOverrides {
        PatternOverrides {
            rate_limit: self.rate_limit,
            max_clients: self.max_clients,
            client_validation: self.client_validation,
            client_trace: self.client_trace,
            compression: self.compression,
            repeat: self.repeat,
        }
    }
}

/// A single listen address.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BindEntry {
    pub host: String,
    pub port: u16,
}

impl BindEntry {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ad_hoc_entry_carries_single_bind() {
        let entry = TarpitEntry::ad_hoc("ssh_trans_hold", "0.0.0.0", 2222, Some(-4));
        assert_eq!(entry.instance_name(), "ssh_trans_hold");
        assert_eq!(entry.binds.len(), 1);
        assert_eq!(entry.binds[0].addr(), "0.0.0.0:2222");
        assert_eq!(entry.overrides().rate_limit, Some(-4));
    }

    #[test]
    fn defaults_leave_overrides_empty() {
        let entry = TarpitEntry::ad_hoc("endless_banner", "127.0.0.1", 7, None);
        let overrides = entry.overrides();
        assert!(overrides.rate_limit.is_none());
        assert!(overrides.max_clients.is_none());
        assert!(overrides.client_validation.is_none());
    }
}
