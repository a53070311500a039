//! tarpitd — a daemon that turns TCP ports into protocol tarpits.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────┐
//!                 │                    TARPITD                       │
//!                 │                                                  │
//!   Connection    │  ┌──────────┐   ┌────────────┐   ┌────────────┐  │
//!   ──────────────┼─▶│   net    │──▶│    net     │──▶│    net     │  │
//!                 │  │ listener │   │ supervisor │   │ validator  │  │
//!                 │  └──────────┘   └─────┬──────┘   └────────────┘  │
//!                 │                       │ accepted                 │
//!                 │                       ▼                          │
//!   Paced bytes   │  ┌──────────┐   ┌────────────┐                   │
//!   ◀─────────────┼──│   net    │◀──│  patterns  │                   │
//!                 │  │  pacing  │   │  handler   │                   │
//!                 │  └──────────┘   └────────────┘                   │
//!                 │                                                  │
//!                 │  ┌────────────────────────────────────────────┐  │
//!                 │  │           Cross-Cutting Concerns           │  │
//!                 │  │  ┌────────┐ ┌───────┐ ┌─────────────────┐  │  │
//!                 │  │  │ config │ │ trace │ │    lifecycle    │  │  │
//!                 │  │  │        │ │ sink  │ │ startup/shutdown│  │  │
//!                 │  │  └────────┘ └───────┘ └─────────────────┘  │  │
//!                 │  └────────────────────────────────────────────┘  │
//!                 └──────────────────────────────────────────────────┘
//! ```
//!
//! A pattern is constructed once per configured instance (precomputing
//! any bomb payloads), then each accepted connection is examined,
//! wrapped in a paced writer, and fed to the pattern's handler until
//! the client gives up.

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod patterns;

pub use config::TarpitdConfig;
pub use lifecycle::Shutdown;
pub use net::pacing::{PacedWriter, RateSpec};
