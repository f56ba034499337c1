//! End-to-end swaps through `SwapService` against mock nodes.

use alloy::consensus::TxEnvelope;
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{keccak256, Address, TxKind, U256};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use multichain_swap::chain::Chain;
use multichain_swap::config::parse_config;
use multichain_swap::error::{ErrorKind, Stage};
use multichain_swap::keys::{derive, SecretPhrase};
use multichain_swap::lifecycle::Cancellation;
use multichain_swap::{SwapService, SwapStatus};
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

mod common;
use common::{
    ethereum_dev_node, start_rpc_node, Reply, BLOCKHASH, ETH_DEST, SOL_DEST, SOL_POOL,
};

const POLLER: &str = r#"
[poller]
strategy = "fixed"
max_attempts = 5
base_delay_ms = 10
max_delay_ms = 10
"#;

async fn service(toml: &str) -> SwapService {
    let config = parse_config(toml).unwrap();
    let keys = derive(&SecretPhrase::new(common::PHRASE)).unwrap();
    SwapService::from_config(&config, keys).await.unwrap()
}

fn solana_only(url: &str) -> String {
    format!(
        r#"
[ethereum]
enabled = false

[solana]
rpc_url = "{url}"
rpc_timeout_secs = 2
{POLLER}
[[pricing.rates]]
from = "ETH"
to = "SOL"
rate = "150"
"#
    )
}

fn latest_blockhash() -> Reply {
    Reply::Result(json!({
        "context": { "slot": 1 },
        "value": { "blockhash": BLOCKHASH, "lastValidBlockHeight": 150 }
    }))
}

/// Signature of a base58 wire transaction.
fn first_signature(encoded: &str) -> String {
    let wire = bs58::decode(encoded).into_vec().unwrap_or_default();
    bs58::encode(&wire[1..65]).into_string()
}

#[tokio::test]
async fn test_eth_to_sol_swap_confirms() {
    let lookups = Arc::new(AtomicU32::new(0));
    let seen = lookups.clone();
    let node = start_rpc_node(move |method, params| match method {
        "getLatestBlockhash" => latest_blockhash(),
        "sendTransaction" => Reply::Result(json!(first_signature(params[0].as_str().unwrap()))),
        "getTransaction" => {
            // Unknown on the first lookup.
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                return Reply::Result(json!(null));
            }
            Reply::Result(json!({
                "slot": 99,
                "blockTime": null,
                "meta": {
                    "err": null,
                    "fee": 5000,
                    "preBalances": [200000005000u64, 0, 1],
                    "postBalances": [50000000000u64, 150000000000u64, 1]
                },
                "transaction": {
                    "signatures": [params[0]],
                    "message": { "accountKeys": [SOL_POOL, SOL_DEST, "11111111111111111111111111111111"] }
                }
            }))
        }
        _ => Reply::Error { code: -32601, message: "Method not found".into() },
    })
    .await;

    let service = service(&solana_only(&node.url)).await;
    let execution = service
        .swap("ETH", "SOL", Decimal::ONE, SOL_DEST, true, &Cancellation::never())
        .await
        .unwrap();

    assert_eq!(execution.status(), SwapStatus::Confirmed);
    assert_eq!(lookups.load(Ordering::SeqCst), 2);

    let raw = execution.raw_signed_tx().unwrap();
    assert_eq!(execution.tx_hash(), Some(first_signature(raw).as_str()));

    let wire = bs58::decode(raw).into_vec().unwrap();
    assert_eq!(wire[0], 1);
    let signature = Signature::from_bytes(wire[1..65].try_into().unwrap());
    let message = &wire[65..];

    // Header, three account keys, blockhash, one transfer instruction.
    assert_eq!(&message[..4], &[1, 0, 1, 3]);
    let from: [u8; 32] = message[4..36].try_into().unwrap();
    assert_eq!(bs58::encode(from).into_string(), SOL_POOL);
    assert_eq!(bs58::encode(&message[36..68]).into_string(), SOL_DEST);
    assert_eq!(&message[100..132], &[7u8; 32]);

    let data = &message[message.len() - 12..];
    assert_eq!(&data[..4], &2u32.to_le_bytes());
    assert_eq!(&data[4..], &150_000_000_000u64.to_le_bytes());

    VerifyingKey::from_bytes(&from)
        .unwrap()
        .verify(message, &signature)
        .unwrap();

    let json = serde_json::to_value(&execution).unwrap();
    assert_eq!(json["status"], "confirmed");
    assert_eq!(json["quote"]["to_token"], "SOL");
}

#[tokio::test]
async fn test_rejected_submission_fails_execution() {
    let node = start_rpc_node(|method, _| match method {
        "getLatestBlockhash" => latest_blockhash(),
        "sendTransaction" => Reply::Error {
            code: -32002,
            message: "Transaction simulation failed: Attempt to debit an account but found no record of a prior credit.".into(),
        },
        _ => Reply::Result(json!(null)),
    })
    .await;

    let service = service(&solana_only(&node.url)).await;
    let execution = service
        .swap("ETH", "SOL", Decimal::ONE, SOL_DEST, true, &Cancellation::never())
        .await
        .unwrap();

    assert_eq!(execution.status(), SwapStatus::Failed);
    assert!(execution.raw_signed_tx().is_none());
    let failure = execution.failure().unwrap();
    assert_eq!(failure.stage, Stage::Submit);
    assert!(matches!(
        &failure.kind,
        ErrorKind::SubmissionRejected(msg) if msg.contains("no record of a prior credit")
    ));
    assert_eq!(node.count("getTransaction"), 0);
}

#[tokio::test]
async fn test_lookup_gives_up_after_max_attempts() {
    let node = start_rpc_node(|_, _| Reply::Result(json!(null))).await;
    let service = service(&solana_only(&node.url)).await;

    let err = service
        .lookup(Chain::Solana, "5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnb", &Cancellation::never())
        .await
        .unwrap_err();
    assert_eq!(err.stage, Stage::Lookup);
    assert_eq!(err.kind, ErrorKind::LookupExhausted { attempts: 5 });
    assert_eq!(node.count("getTransaction"), 5);
}

#[tokio::test]
async fn test_redeem_solana_deposit_pays_ether() {
    let solana = start_rpc_node(|method, params| match method {
        "getTransaction" => Reply::Result(json!({
            "slot": 12,
            "blockTime": 1700000000,
            "meta": {
                "err": null,
                "fee": 5000,
                "preBalances": [5000005000u64, 1000000000u64, 1],
                "postBalances": [3000000000u64, 3000000000u64, 1]
            },
            "transaction": {
                "signatures": [params[0]],
                "message": { "accountKeys": [SOL_DEST, SOL_POOL, "11111111111111111111111111111111"] }
            }
        })),
        _ => Reply::Result(json!(null)),
    })
    .await;
    let ethereum = start_rpc_node(ethereum_dev_node).await;

    let toml = format!(
        r#"
[ethereum]
rpc_url = "{eth}"
rpc_timeout_secs = 2

[solana]
rpc_url = "{sol}"
rpc_timeout_secs = 2
{POLLER}
[[pricing.rates]]
from = "SOL"
to = "ETH"
rate = "0.01"
"#,
        eth = ethereum.url,
        sol = solana.url
    );
    let service = service(&toml).await;

    let result = service
        .swap_from_deposit(Chain::Solana, "deposit-sig", "ETH", ETH_DEST, false, &Cancellation::never())
        .await
        .unwrap();

    assert_eq!(result.amount, Decimal::from(2));
    let execution = &result.execution;
    assert_eq!(execution.status(), SwapStatus::Submitted);
    assert_eq!(execution.quote().to_amount(), Decimal::from_str("0.02").unwrap());

    let raw = alloy::hex::decode(execution.raw_signed_tx().unwrap()).unwrap();
    assert_eq!(execution.tx_hash(), Some(keccak256(&raw).to_string().as_str()));

    let envelope = TxEnvelope::decode_2718(&mut raw.as_slice()).unwrap();
    let tx = envelope.as_legacy().unwrap().tx();
    assert_eq!(tx.chain_id, Some(1337));
    assert_eq!(tx.nonce, 5);
    assert_eq!(tx.gas_price, 20_000_000_000);
    assert_eq!(tx.gas_limit, 21_000);
    assert_eq!(tx.value, U256::from(20_000_000_000_000_000u128));
    assert_eq!(tx.to, TxKind::Call(Address::from_str(ETH_DEST).unwrap()));
}
