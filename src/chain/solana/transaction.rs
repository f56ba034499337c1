//! Legacy Solana transaction encoding for a single System Program transfer.
//!
//! # Wire Layout
//! ```text
//! transaction = compact_u16(1) ‖ signature[64] ‖ message
//! message     = header[3] ‖ compact_u16(n) ‖ keys[n][32] ‖ blockhash[32]
//!             ‖ compact_u16(1) ‖ instruction
//! instruction = program_idx ‖ compact_u16(k) ‖ account_idx[k]
//!             ‖ compact_u16(12) ‖ u32le(2) ‖ u64le(lamports)
//! ```

use ed25519_dalek::Signer;

use crate::chain::solana::pubkey::{Blockhash, Pubkey};
use crate::chain::types::{Chain, ChainAddress, ChainParams, SignedTransaction, TransactionIntent};
use crate::error::{ChainResult, ErrorKind};
use crate::keys::store::{KeyPair, SigningMaterial};

/// Index of `Transfer` in the System Program instruction enum.
const SYSTEM_TRANSFER: u32 = 2;

/// Append `value` in Solana's compact-u16 (shortvec) encoding.
pub fn encode_compact_u16(out: &mut Vec<u8>, value: u16) {
    let mut rem = value;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(byte);
            break;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

/// Serialize the message of a transfer of `lamports` from `from` to `to`.
pub fn transfer_message(from: &Pubkey, to: &Pubkey, lamports: u64, blockhash: &Blockhash) -> Vec<u8> {
    // Fee payer signs and is writable; destination writable; program read-only.
    let mut keys = vec![*from];
    if to != from {
        keys.push(*to);
    }
    keys.push(Pubkey::SYSTEM_PROGRAM);
    let to_index = if to == from { 0u8 } else { 1u8 };
    let program_index = (keys.len() - 1) as u8;

    let mut msg = Vec::with_capacity(160);
    msg.extend_from_slice(&[1, 0, 1]);
    encode_compact_u16(&mut msg, keys.len() as u16);
    for key in &keys {
        msg.extend_from_slice(key.as_bytes());
    }
    msg.extend_from_slice(blockhash.as_bytes());

    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&SYSTEM_TRANSFER.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());

    encode_compact_u16(&mut msg, 1);
    msg.push(program_index);
    encode_compact_u16(&mut msg, 2);
    msg.extend_from_slice(&[0, to_index]);
    encode_compact_u16(&mut msg, data.len() as u16);
    msg.extend_from_slice(&data);
    msg
}

/// Sign `intent` with `key`, producing a base58 wire transaction.
pub fn sign_transfer(intent: &TransactionIntent, key: &KeyPair) -> ChainResult<SignedTransaction> {
    let (blockhash, lamports) = match intent.params() {
        ChainParams::Solana {
            recent_blockhash,
            lamports,
        } => (*recent_blockhash, *lamports),
        other => {
            return Err(ErrorKind::UnsupportedChain(format!(
                "{} parameters given to the Solana signer",
                other.chain()
            )))
        }
    };
    let (ChainAddress::Solana(from), ChainAddress::Solana(to)) =
        (intent.from_address(), intent.to_address())
    else {
        return Err(ErrorKind::AddressParse {
            address: intent.to_address().to_string(),
            reason: "not a Solana address".to_string(),
        });
    };
    let SigningMaterial::Solana(signing_key) = key.material() else {
        return Err(ErrorKind::SigningKeyMissing(format!(
            "{} key cannot sign Solana transactions",
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

    let message = transfer_message(from, to, lamports, &blockhash);
    let signature = signing_key.sign(&message).to_bytes();

    let mut wire = Vec::with_capacity(1 + 64 + message.len());
    encode_compact_u16(&mut wire, 1);
    wire.extend_from_slice(&signature);
    wire.extend_from_slice(&message);

    let tx_hash = bs58::encode(signature).into_string();
    tracing::debug!(chain = %Chain::Solana, signature = %tx_hash, lamports, "Signed Solana transfer");

    Ok(SignedTransaction {
        chain: Chain::Solana,
        encoded: bs58::encode(wire).into_string(),
        tx_hash,
    })
}
