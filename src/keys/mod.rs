//! Key management subsystem.
//!
//! # Data Flow
//! ```text
//! Environment variable (secret phrase)
//!     → deriver.rs (BIP-39 validation, per-chain derivation)
//!     → store.rs (KeyStore: Chain → KeyPair, immutable)
//!     → shared via Arc with the signing stage
//! ```
//!
//! # Security Constraints
//! - Secret phrase ONLY from the environment
//! - Never log phrases or private keys

pub mod deriver;
pub mod store;

pub use deriver::{derive, SecretPhrase, ETHEREUM_DERIVATION_PATH};
pub use store::{KeyPair, KeyStore};
