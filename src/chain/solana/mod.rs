//! Solana support: JSON-RPC adapter and System Program transfer signing.

pub mod adapter;
pub mod pubkey;
pub mod rpc;
pub mod transaction;

pub use adapter::SolanaAdapter;
pub use pubkey::{Blockhash, Pubkey};
pub use transaction::sign_transfer;
