//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     validated config → build patterns → bind listeners → spawn supervisors
//!     (each bind independent; failures skip, never abort)
//!
//! Shutdown (shutdown.rs):
//!     ctrl-c → broadcast signal → listeners stop accepting,
//!     connection tasks cancel and emit their close traces
//! ```

pub mod shutdown;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::start_instances;
