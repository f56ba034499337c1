//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields (stage, chain, tx_hash, ...)
//!     → logging.rs (EnvFilter + pretty or JSON formatter on stderr)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Secrets never appear in fields; key types redact their Debug output

pub mod logging;

pub use logging::init;
