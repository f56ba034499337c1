//! Solana adapter over the node's JSON-RPC API.
//!
//! # Responsibilities
//! - Fetch the latest blockhash used as the replay-protection token
//! - Read balances and transactions at the configured commitment
//! - Broadcast base58 wire transactions and faucet airdrops

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use crate::chain::adapter::ChainAdapter;
use crate::chain::solana::pubkey::{Blockhash, Pubkey};
use crate::chain::solana::rpc::{
    CallError, ConfirmedTransaction, LatestBlockhash, RpcClient, WithContext, INVALID_PARAMS,
};
use crate::chain::types::{
    Balance, Chain, ChainAddress, FeeEstimate, FreshnessToken, NativeAmount, SignedTransaction,
    SolanaTransaction, TransactionRecord,
};
use crate::chain::units;
use crate::config::schema::SolanaConfig;
use crate::error::{ChainResult, ErrorKind};

/// Solana adapter for one RPC endpoint.
#[derive(Clone, Debug)]
pub struct SolanaAdapter {
    rpc: RpcClient,
    config: SolanaConfig,
}

impl SolanaAdapter {
    pub fn new(config: SolanaConfig) -> ChainResult<Self> {
        url::Url::parse(&config.rpc_url).map_err(|e| {
            ErrorKind::RpcUnavailable(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        let rpc = RpcClient::new(config.rpc_url.clone(), Duration::from_secs(config.rpc_timeout_secs))?;

        tracing::info!(
            rpc_url = %config.rpc_url,
            commitment = %config.commitment,
            "Solana adapter initialized"
        );
        Ok(Self { rpc, config })
    }

    /// Commitment for `getTransaction`, which does not accept `processed`.
    fn lookup_commitment(&self) -> &str {
        match self.config.commitment.as_str() {
            "processed" => "confirmed",
            other => other,
        }
    }
}

fn solana_pubkey(address: &ChainAddress) -> ChainResult<Pubkey> {
    match address {
        ChainAddress::Solana(key) => Ok(*key),
        other => Err(ErrorKind::AddressParse {
            address: other.to_string(),
            reason: "not a Solana address".to_string(),
        }),
    }
}

fn into_record(tx_id: &str, tx: ConfirmedTransaction) -> ChainResult<TransactionRecord> {
    let meta = tx
        .meta
        .ok_or_else(|| ErrorKind::MalformedResponse(format!("transaction {} has no meta", tx_id)))?;
    let signature = tx
        .transaction
        .signatures
        .into_iter()
        .next()
        .unwrap_or_else(|| tx_id.to_string());

    Ok(TransactionRecord::Solana(SolanaTransaction {
        signature,
        slot: tx.slot,
        block_time: tx.block_time,
        fee: meta.fee,
        account_keys: tx.transaction.message.account_keys,
        pre_balances: meta.pre_balances,
        post_balances: meta.post_balances,
        error: meta.err.map(|e| e.to_string()),
    }))
}

#[async_trait]
impl ChainAdapter for SolanaAdapter {
    fn chain(&self) -> Chain {
        Chain::Solana
    }

    async fn get_transaction(&self, tx_id: &str) -> ChainResult<TransactionRecord> {
        let params = json!([
            tx_id,
            {
                "encoding": "json",
                "commitment": self.lookup_commitment(),
                "maxSupportedTransactionVersion": 0
            }
        ]);
        match self.rpc.call::<ConfirmedTransaction>("getTransaction", params).await {
            Ok(Some(tx)) => into_record(tx_id, tx),
            Ok(None) => Err(ErrorKind::NotFound(tx_id.to_string())),
            Err(CallError::Node(e)) if e.code == INVALID_PARAMS => Err(ErrorKind::NotFound(format!(
                "'{}' is not a transaction signature: {}",
                tx_id, e.message
            ))),
            Err(e) => Err(e.into_kind("getTransaction")),
        }
    }

    async fn freshness(&self, _address: &ChainAddress) -> ChainResult<FreshnessToken> {
        let latest: WithContext<LatestBlockhash> = self
            .rpc
            .call_required(
                "getLatestBlockhash",
                json!([{ "commitment": self.config.commitment }]),
            )
            .await?;
        let blockhash: Blockhash = latest.value.blockhash.parse()?;
        tracing::debug!(
            blockhash = %blockhash,
            last_valid_block_height = latest.value.last_valid_block_height,
            "Fetched latest blockhash"
        );
        Ok(FreshnessToken::Blockhash(blockhash))
    }

    async fn estimate_fee(&self) -> ChainResult<FeeEstimate> {
        Ok(FeeEstimate::PerSignature {
            lamports: self.config.lamports_per_signature,
        })
    }

    async fn submit(&self, signed: &SignedTransaction) -> ChainResult<String> {
        let params = json!([signed.encoded, { "encoding": "base58" }]);
        match self.rpc.call::<String>("sendTransaction", params).await {
            Ok(Some(signature)) => {
                tracing::info!(signature = %signature, "Solana transaction broadcast");
                Ok(signature)
            }
            Ok(None) => Err(ErrorKind::MalformedResponse(
                "sendTransaction returned null".to_string(),
            )),
            Err(CallError::Node(e)) => Err(ErrorKind::SubmissionRejected(e.message)),
            Err(CallError::Unavailable(kind)) => Err(kind),
        }
    }

    async fn get_balance(&self, address: &ChainAddress) -> ChainResult<Balance> {
        let key = solana_pubkey(address)?;
        let balance: WithContext<u64> = self
            .rpc
            .call_required(
                "getBalance",
                json!([key.to_string(), { "commitment": self.config.commitment }]),
            )
            .await?;
        Ok(Balance {
            address: key.to_string(),
            amount: units::lamports_to_sol(balance.value),
            symbol: Chain::Solana.native_symbol().to_string(),
            native: balance.value.to_string(),
        })
    }

    async fn request_airdrop(
        &self,
        address: &ChainAddress,
        amount: NativeAmount,
    ) -> ChainResult<String> {
        let key = solana_pubkey(address)?;
        let NativeAmount::Lamports(lamports) = amount else {
            return Err(ErrorKind::InvalidAmount("expected an amount in lamports".to_string()));
        };
        match self
            .rpc
            .call::<String>("requestAirdrop", json!([key.to_string(), lamports]))
            .await
        {
            Ok(Some(signature)) => {
                tracing::info!(address = %key, lamports, signature = %signature, "Airdrop requested");
                Ok(signature)
            }
            Ok(None) => Err(ErrorKind::MalformedResponse(
                "requestAirdrop returned null".to_string(),
            )),
            Err(CallError::Node(e)) => Err(ErrorKind::SubmissionRejected(e.message)),
            Err(CallError::Unavailable(kind)) => Err(kind),
        }
    }
}
