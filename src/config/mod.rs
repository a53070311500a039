//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, semantic validation)
//!     → TarpitdConfig (validated, immutable)
//!     → per-entry pattern overrides → PatternConfig merge
//! ```
//! `-s PATTERN:HOST:PORT` directives from the CLI become additional
//! `TarpitEntry` values alongside the file's own.

pub mod loader;
pub mod schema;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{BindEntry, TarpitEntry, TarpitdConfig, TraceConfig};
