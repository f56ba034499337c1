//! Derived key material, one keypair per chain.
//!
//! # Security
//! - Private keys never appear in `Debug` output or logs
//! - Raw secret bytes are only handed out wrapped in `Zeroizing`

use alloy::hex;
use alloy::signers::local::PrivateKeySigner;
use std::collections::BTreeMap;
use std::fmt;
use zeroize::{Zeroize, Zeroizing};

use crate::chain::{Chain, ChainAddress};
use crate::error::{ChainResult, ErrorKind};

/// Chain-specific signing material.
#[derive(Clone)]
pub(crate) enum SigningMaterial {
    Ethereum(PrivateKeySigner),
    Solana(ed25519_dalek::SigningKey),
}

/// A keypair for one chain together with the address it controls.
#[derive(Clone)]
pub struct KeyPair {
    address: ChainAddress,
    material: SigningMaterial,
}

impl KeyPair {
    pub(crate) fn ethereum(signer: PrivateKeySigner) -> Self {
        Self {
            address: ChainAddress::Ethereum(signer.address()),
            material: SigningMaterial::Ethereum(signer),
        }
    }

    pub(crate) fn solana(key: ed25519_dalek::SigningKey) -> Self {
        let public = key.verifying_key().to_bytes();
        Self {
            address: ChainAddress::Solana(crate::chain::solana::Pubkey::new(public)),
            material: SigningMaterial::Solana(key),
        }
    }

    pub fn chain(&self) -> Chain {
        self.address.chain()
    }

    pub fn address(&self) -> &ChainAddress {
        &self.address
    }

    /// Public key in the chain's customary text form.
    ///
    /// Ethereum: hex of the 64-byte uncompressed point (no `04` prefix).
    /// Solana: base58 of the 32-byte ed25519 key.
    pub fn public_key(&self) -> String {
        match &self.material {
            SigningMaterial::Ethereum(signer) => {
                let point = signer.credential().verifying_key().to_encoded_point(false);
                hex::encode(&point.as_bytes()[1..])
            }
            SigningMaterial::Solana(key) => bs58::encode(key.verifying_key().to_bytes()).into_string(),
        }
    }

    /// 32 secret bytes: the secp256k1 scalar or the ed25519 seed.
    pub fn private_key(&self) -> Zeroizing<[u8; 32]> {
        match &self.material {
            SigningMaterial::Ethereum(signer) => {
                let mut scalar = signer.credential().to_bytes();
                let mut out = Zeroizing::new([0u8; 32]);
                out.copy_from_slice(scalar.as_slice());
                scalar.as_mut_slice().zeroize();
                out
            }
            SigningMaterial::Solana(key) => Zeroizing::new(key.to_bytes()),
        }
    }

    pub(crate) fn material(&self) -> &SigningMaterial {
        &self.material
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("chain", &self.chain())
            .field("address", &self.address.to_string())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Read-only map from chain to its derived keypair.
///
/// Built once by [`crate::keys::derive`] and shared behind an `Arc`.
#[derive(Clone, Debug, Default)]
pub struct KeyStore {
    pairs: BTreeMap<Chain, KeyPair>,
}

impl KeyStore {
    pub(crate) fn from_pairs(pairs: impl IntoIterator<Item = KeyPair>) -> Self {
        Self {
            pairs: pairs.into_iter().map(|p| (p.chain(), p)).collect(),
        }
    }

    pub fn get(&self, chain: Chain) -> Option<&KeyPair> {
        self.pairs.get(&chain)
    }

    /// The keypair allowed to sign for `address` on its chain.
    pub fn signer_for(&self, address: &ChainAddress) -> ChainResult<&KeyPair> {
        let chain = address.chain();
        match self.pairs.get(&chain) {
            Some(pair) if pair.address() == address => Ok(pair),
            Some(_) => Err(ErrorKind::SigningKeyMissing(format!(
                "no {} key controls {}",
                chain, address
            ))),
            None => Err(ErrorKind::SigningKeyMissing(format!("no {} key derived", chain))),
        }
    }

    pub fn address(&self, chain: Chain) -> ChainResult<ChainAddress> {
        self.pairs
            .get(&chain)
            .map(|p| *p.address())
            .ok_or_else(|| ErrorKind::SigningKeyMissing(format!("no {} key derived", chain)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyPair> {
        self.pairs.values()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
