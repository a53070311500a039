//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::TarpitdConfig;
use crate::patterns;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "io error: {}", e),
            ConfigError::Parse(e) => write!(f, "parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<TarpitdConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<TarpitdConfig, ConfigError> {
    let config: TarpitdConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Semantic checks (serde handles the syntactic ones). All problems are
/// collected, not just the first.
fn validate(config: &TarpitdConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    for (i, entry) in config.tarpit.iter().enumerate() {
        let label = entry.name.as_deref().unwrap_or(&entry.pattern);
        if entry.pattern.is_empty() {
            errors.push(format!("tarpit[{}]: pattern must not be empty", i));
        } else if !patterns::known(&entry.pattern) {
            errors.push(format!(
                "tarpit[{}] ({}): unknown pattern \"{}\"",
                i, label, entry.pattern
            ));
        }
        if entry.binds.is_empty() {
            errors.push(format!("tarpit[{}] ({}): no binds configured", i, label));
        }
        for bind in &entry.binds {
            if bind.host.is_empty() {
                errors.push(format!("tarpit[{}] ({}): bind host is empty", i, label));
            }
        }
        if entry.max_clients == Some(0) {
            errors.push(format!("tarpit[{}] ({}): max_clients must be > 0", i, label));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [trace]
        destination = "stdout"

        [[tarpit]]
        name = "front-door"
        pattern = "http_endless_header"
        rate_limit = -2
        max_clients = 64
        client_trace = true
        binds = [
            { host = "0.0.0.0", port = 8080 },
            { host = "0.0.0.0", port = 8088 },
        ]

        [[tarpit]]
        pattern = "ssh_trans_hold"
        binds = [{ host = "127.0.0.1", port = 2222 }]
    "#;

    #[test]
    fn sample_config_parses() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.trace.destination, "stdout");
        assert_eq!(config.tarpit.len(), 2);

        let front = &config.tarpit[0];
        assert_eq!(front.instance_name(), "front-door");
        assert_eq!(front.rate_limit, Some(-2));
        assert_eq!(front.binds.len(), 2);

        let ssh = &config.tarpit[1];
        assert_eq!(ssh.instance_name(), "ssh_trans_hold");
        assert!(ssh.rate_limit.is_none());
    }

    #[test]
    fn empty_config_defaults_to_stderr_trace() {
        let config = parse_config("").unwrap();
        assert_eq!(config.trace.destination, "stderr");
        assert!(config.tarpit.is_empty());
    }

    #[test]
    fn unknown_pattern_and_missing_binds_both_reported() {
        let bad = r#"
            [[tarpit]]
            pattern = "gopher_endless_menu"

            [[tarpit]]
            pattern = "ftp_endless_motd"
            max_clients = 0
            binds = [{ host = "0.0.0.0", port = 21 }]
        "#;
        let err = parse_config(bad).unwrap_err();
        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors.len(), 3);
                assert!(errors[0].contains("unknown pattern"));
                assert!(errors[1].contains("no binds"));
                assert!(errors[2].contains("max_clients"));
            }
            other => panic!("expected validation failure, got {}", other),
        }
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            parse_config("not toml at all ["),
            Err(ConfigError::Parse(_))
        ));
    }
}
