//! Cross-chain swap engine for Ethereum and Solana.
//!
//! One secret phrase derives a signing key per chain. A swap is quoted,
//! paid out from the target chain's pool address, and followed until the
//! chain reports an outcome.
//!
//! # Architecture Overview
//!
//! ```text
//!   secret phrase ──▶ keys (derive) ──▶ KeyStore ─────────────┐
//!                                                             ▼
//!   swap request ──▶ quoting ──▶ pipeline::stages ──▶ prepare → sign → submit
//!                                    │                        │
//!                                    ▼                        ▼
//!                              chain adapters ◀──── pipeline::poller
//!                          (ethereum / solana)
//!
//!   Cross-cutting: config, error, observability, resilience, lifecycle
//! ```

// Core subsystems
pub mod chain;
pub mod keys;
pub mod pipeline;
pub mod quoting;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use chain::{Chain, ChainAddress};
pub use config::SwapConfig;
pub use error::{ErrorKind, Stage, SwapError};
pub use pipeline::{SwapExecution, SwapService, SwapStatus};
