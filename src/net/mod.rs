//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (permit-gated accept, per-instance caps)
//!     → supervisor.rs (lifecycle state machine, trace events)
//!     → validator.rs (prefix examination, accept/reject)
//!     → pacing.rs (rate-limited writes for the pattern handler)
//!
//! Connection states:
//!     Open → Validating → Serving → Draining → Closed
//!                       ↘ Rejected → PunitiveDelay → Closed
//! ```

pub mod listener;
pub mod pacing;
pub mod supervisor;
pub mod trace;
pub mod validator;
