//! EIP-155 legacy transaction signing.
//!
//! Signing is pure: the intent already carries nonce, gas price and gas
//! limit, so nothing here touches the network.

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Bytes, TxKind};

use crate::chain::types::{Chain, ChainAddress, ChainParams, NativeAmount, SignedTransaction, TransactionIntent};
use crate::error::{ChainResult, ErrorKind};
use crate::keys::store::{KeyPair, SigningMaterial};

/// Sign a plain value transfer for `chain_id`.
pub fn sign_transfer(
    intent: &TransactionIntent,
    key: &KeyPair,
    chain_id: u64,
) -> ChainResult<SignedTransaction> {
    let (gas_price, gas_limit, nonce) = match intent.params() {
        ChainParams::Ethereum {
            gas_price,
            gas_limit,
            nonce,
        } => (*gas_price, *gas_limit, *nonce),
        other => {
            return Err(ErrorKind::UnsupportedChain(format!(
                "{} parameters given to the Ethereum signer",
                other.chain()
            )))
        }
    };
    let to = match intent.to_address() {
        ChainAddress::Ethereum(addr) => *addr,
        other => {
            return Err(ErrorKind::AddressParse {
                address: other.to_string(),
                reason: "not an Ethereum address".to_string(),
            })
        }
    };
    let NativeAmount::Wei(value) = intent.native_amount() else {
        return Err(ErrorKind::InvalidAmount("expected an amount in wei".to_string()));
    };
    let SigningMaterial::Ethereum(signer) = key.material() else {
        return Err(ErrorKind::SigningKeyMissing(format!(
            "{} key cannot sign Ethereum transactions",
            key.chain()
        )));
    };
    if key.address() != intent.from_address() {
        return Err(ErrorKind::SigningKeyMissing(format!(
            "key for {} cannot sign for {}",
            key.address(),
            intent.from_address()
        )));
    }

    let mut tx = TxLegacy {
        chain_id: Some(chain_id),
        nonce,
        gas_price,
        gas_limit,
        to: TxKind::Call(to),
        value,
        input: Bytes::new(),
    };

    let signature = signer
        .sign_transaction_sync(&mut tx)
        .map_err(|e| ErrorKind::SigningKeyMissing(format!("signing failed: {}", e)))?;
    let signed = tx.into_signed(signature);
    let tx_hash = *signed.hash();
    let encoded = TxEnvelope::from(signed).encoded_2718();

    tracing::debug!(
        chain = %Chain::Ethereum,
        tx_hash = %tx_hash,
        nonce,
        gas_price,
        "Signed Ethereum transfer"
    );

    Ok(SignedTransaction {
        chain: Chain::Ethereum,
        encoded: alloy::hex::encode_prefixed(encoded),
        tx_hash: tx_hash.to_string(),
    })
}
