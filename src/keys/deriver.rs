//! Deterministic key derivation from a BIP-39 secret phrase.
//!
//! # Derivation
//! ```text
//! phrase ──(BIP-39 checksum, PBKDF2, empty passphrase)──▶ 64-byte seed
//!   seed ──(BIP-32 m/44'/60'/0'/0/0, secp256k1)──▶ Ethereum key
//!   seed ──(sha512, first 32 bytes, ed25519)──▶ Solana key
//! ```
//!
//! Derivation either produces every keypair or fails; there is no partial
//! result.

use alloy::signers::local::PrivateKeySigner;
use bip39::{Language, Mnemonic};
use coins_bip32::path::DerivationPath;
use coins_bip32::prelude::XPriv;
use sha2::{Digest, Sha512};
use std::fmt;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{ChainResult, ErrorKind};
use crate::keys::store::{KeyPair, KeyStore};

/// BIP-44 path of the first Ethereum account.
pub const ETHEREUM_DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

/// A mnemonic secret phrase. Zeroised on drop, never printed.
pub struct SecretPhrase(String);

impl SecretPhrase {
    pub fn new(phrase: impl Into<String>) -> Self {
        Self(phrase.into())
    }

    /// Read the phrase from the environment variable `var`.
    pub fn from_env(var: &str) -> ChainResult<Self> {
        std::env::var(var).map(Self).map_err(|_| {
            tracing::error!(env_var = %var, "Secret phrase environment variable not set");
            ErrorKind::InvalidSecret
        })
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl Drop for SecretPhrase {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for SecretPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretPhrase(<redacted>)")
    }
}

/// Derive the keypair of every supported chain from `secret`.
pub fn derive(secret: &SecretPhrase) -> ChainResult<KeyStore> {
    let normalized = secret.expose().split_whitespace().collect::<Vec<_>>().join(" ");
    let normalized = Zeroizing::new(normalized);

    let mnemonic =
        Mnemonic::parse_in(Language::English, normalized.as_str()).map_err(|_| ErrorKind::InvalidSecret)?;
    let seed = Zeroizing::new(mnemonic.to_seed(""));

    let ethereum = derive_ethereum(seed.as_slice())?;
    let solana = derive_solana(seed.as_slice());

    tracing::info!(
        ethereum = %ethereum.address(),
        solana = %solana.address(),
        "Derived chain keys"
    );

    Ok(KeyStore::from_pairs([ethereum, solana]))
}

fn derive_ethereum(seed: &[u8]) -> ChainResult<KeyPair> {
    let root = XPriv::root_from_seed(seed, None).map_err(|e| {
        tracing::error!(error = %e, "BIP-32 master key derivation failed");
        ErrorKind::InvalidSecret
    })?;
    let path = ETHEREUM_DERIVATION_PATH
        .parse::<DerivationPath>()
        .map_err(|e| {
            tracing::error!(error = %e, "Invalid derivation path");
            ErrorKind::InvalidSecret
        })?;
    let child = root.derive_path(&path).map_err(|e| {
        tracing::error!(error = %e, "BIP-32 child derivation failed");
        ErrorKind::InvalidSecret
    })?;

    let key: &k256::ecdsa::SigningKey = child.as_ref();
    let mut scalar = key.to_bytes();
    let result = PrivateKeySigner::from_slice(scalar.as_slice());
    scalar.as_mut_slice().zeroize();
    let signer = result.map_err(|e| {
        tracing::error!(error = %e, "Derived scalar rejected by signer");
        ErrorKind::InvalidSecret
    })?;

    Ok(KeyPair::ethereum(signer))
}

fn derive_solana(seed: &[u8]) -> KeyPair {
    let mut digest = Sha512::digest(seed);
    let mut secret = Zeroizing::new([0u8; 32]);
    secret.copy_from_slice(&digest[..32]);
    digest.as_mut_slice().zeroize();
    KeyPair::solana(ed25519_dalek::SigningKey::from_bytes(&secret))
}
