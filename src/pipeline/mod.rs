//! Swap pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! SwapQuote + destination
//!     → stages.rs: prepare (pool address, freshness, fee → TransactionIntent)
//!     → stages.rs: sign (KeyStore → SignedTransaction)
//!     → stages.rs: submit (adapter → SwapExecution Submitted | Failed)
//!     → poller.rs: wait_for_finality (→ Confirmed | Failed)
//!
//! Deposit redemption (service.rs):
//!     tx id → poller.rs wait_for_finality → pool check → transferred amount → swap
//! ```
//!
//! # Design Decisions
//! - `nonce.rs` serializes sends per source address
//! - `pool.rs` is the seam for where payouts come from
//! - `service.rs` builds every collaborator from configuration

pub mod execution;
pub mod nonce;
pub mod poller;
pub mod pool;
pub mod service;
pub mod stages;

pub use execution::{SwapExecution, SwapStatus};
pub use nonce::{NonceAllocator, NonceLease};
pub use poller::{ConfirmationPoller, PollPolicy};
pub use pool::{PoolDirectory, StaticPoolDirectory};
pub use service::{AddressEntry, DepositSwap, SwapService};
pub use stages::{EthereumSettings, TransactionPipeline};
