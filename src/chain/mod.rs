//! Chain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Configuration (RPC URLs, timeouts, chain id)
//!     → ethereum/ (alloy provider with failover, EIP-155 signing)
//!     → solana/ (JSON-RPC over reqwest, System Program transfers)
//!     → adapter.rs (ChainAdapter trait, AdapterRegistry)
//!     → pipeline (prepare, sign, submit, poll)
//! ```
//!
//! # Design Decisions
//! - One adapter per chain behind a common async trait
//! - Every RPC call is bounded by the chain's configured timeout
//! - Amounts cross the boundary as native integers (`units.rs`)
//! - Node responses are parsed into typed records at the boundary

pub mod adapter;
pub mod ethereum;
pub mod solana;
pub mod types;
pub mod units;

pub use adapter::{AdapterRegistry, ChainAdapter};
pub use types::{
    Balance, Chain, ChainAddress, ChainParams, EthereumTransaction, FeeEstimate, FreshnessToken,
    NativeAmount, SignedTransaction, SolanaTransaction, TransactionIntent, TransactionRecord,
    TxOutcome,
};
