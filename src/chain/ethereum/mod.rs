//! Ethereum support: alloy-backed adapter and legacy transaction signing.

pub mod adapter;
pub mod signer;

pub use adapter::EthereumAdapter;
pub use signer::sign_transfer;
