//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → CancellationSource::cancel
//!
//! Cancellation (cancellation.rs):
//!     Cancellation token → checked by the poller between attempts
//! ```

pub mod cancellation;
pub mod signals;

pub use cancellation::{Cancellation, CancellationSource};
