//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a node:
//!     → timeouts.rs (enforce per-chain request timeout)
//!     → On NotFound during lookup: backoff.rs (delay before next attempt)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Only lookups retry; submissions never do
//! - Jittered backoff prevents synchronized polling

pub mod backoff;
pub mod timeouts;

pub use backoff::{calculate_backoff, Backoff};
pub use timeouts::with_timeout;
