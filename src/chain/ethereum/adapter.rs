//! Ethereum JSON-RPC adapter with timeout and failover.
//!
//! # Responsibilities
//! - Connect to the primary endpoint and any failover endpoints
//! - Query chain state (nonce, gas price, balances, transactions)
//! - Broadcast signed transactions, surfacing node refusals verbatim
//! - Treat timeouts and transport errors as "try the next provider"

use alloy::consensus::Transaction as _;
use alloy::primitives::{Address, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::transports::TransportError;
use async_trait::async_trait;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::chain::adapter::ChainAdapter;
use crate::chain::types::{
    Balance, Chain, ChainAddress, EthereumTransaction, FeeEstimate, FreshnessToken,
    SignedTransaction, TransactionRecord,
};
use crate::chain::units;
use crate::config::schema::EthereumConfig;
use crate::error::{ChainResult, ErrorKind};

type DynProvider = Arc<dyn Provider + Send + Sync>;

/// Ethereum adapter over one or more HTTP providers.
#[derive(Clone)]
pub struct EthereumAdapter {
    /// Primary provider first, then failovers in configured order.
    providers: Vec<DynProvider>,
    config: EthereumConfig,
    timeout_duration: Duration,
}

impl EthereumAdapter {
    /// Connect to every configured endpoint and check the signing chain id.
    ///
    /// An unreachable node or chain id mismatch is logged, not fatal; the
    /// first real call reports it.
    pub async fn new(config: EthereumConfig) -> ChainResult<Self> {
        let providers = connect(&config)?;
        let adapter = Self {
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
            providers,
            config,
        };

        if let Err(e) = adapter.verify_chain_id().await {
            tracing::warn!(chain = %Chain::Ethereum, error = %e, "Signing chain id not confirmed by node");
        }
        tracing::info!(
            chain = %Chain::Ethereum,
            rpc_url = %adapter.config.rpc_url,
            providers = adapter.providers.len(),
            chain_id = adapter.config.chain_id,
            "Ethereum adapter ready"
        );
        Ok(adapter)
    }

    /// Verify the connected chain id matches the signing chain id.
    pub async fn verify_chain_id(&self) -> ChainResult<()> {
        let actual = self
            .with_failover("eth_chainId", |p| async move { p.get_chain_id().await }, no_final_error)
            .await?;
        if actual != self.config.chain_id {
            return Err(ErrorKind::UnsupportedChain(format!(
                "chain id mismatch: expected {}, node reports {}",
                self.config.chain_id, actual
            )));
        }
        Ok(())
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    pub fn config(&self) -> &EthereumConfig {
        &self.config
    }

    /// Run `call` against each provider in turn until one answers.
    ///
    /// `final_error` inspects a provider error; `Some` stops the failover and
    /// is returned as is.
    async fn with_failover<T, F, Fut, C>(
        &self,
        operation: &'static str,
        call: F,
        final_error: C,
    ) -> ChainResult<T>
    where
        T: Send,
        F: Fn(DynProvider) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, TransportError>> + Send,
        C: Fn(&TransportError) -> Option<ErrorKind> + Send + Sync,
    {
        let mut last_error = String::from("no providers configured");
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, call(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    if let Some(kind) = final_error(&e) {
                        return Err(kind);
                    }
                    tracing::warn!(provider_idx = i, operation, error = %e, "RPC error, trying next provider");
                    last_error = e.to_string();
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, operation, "RPC timeout, trying next provider");
                    last_error = format!("timed out after {:?}", self.timeout_duration);
                }
            }
        }
        Err(ErrorKind::RpcUnavailable(format!(
            "all providers failed {}: {}",
            operation, last_error
        )))
    }
}

fn no_final_error(_: &TransportError) -> Option<ErrorKind> {
    None
}

fn rejected_by_node(e: &TransportError) -> Option<ErrorKind> {
    e.as_error_resp()
        .map(|payload| ErrorKind::SubmissionRejected(payload.message.to_string()))
}

fn ethereum_address(address: &ChainAddress) -> ChainResult<Address> {
    match address {
        ChainAddress::Ethereum(addr) => Ok(*addr),
        other => Err(ErrorKind::AddressParse {
            address: other.to_string(),
            reason: "not an Ethereum address".to_string(),
        }),
    }
}

fn parse_tx_hash(tx_id: &str) -> ChainResult<TxHash> {
    TxHash::from_str(tx_id.trim()).map_err(|e| {
        ErrorKind::NotFound(format!("'{}' is not a transaction hash: {}", tx_id, e))
    })
}

#[async_trait]
impl ChainAdapter for EthereumAdapter {
    fn chain(&self) -> Chain {
        Chain::Ethereum
    }

    async fn get_transaction(&self, tx_id: &str) -> ChainResult<TransactionRecord> {
        let hash = parse_tx_hash(tx_id)?;

        let tx = self
            .with_failover(
                "eth_getTransactionByHash",
                |p| async move { p.get_transaction_by_hash(hash).await },
                no_final_error,
            )
            .await?
            .ok_or_else(|| ErrorKind::NotFound(tx_id.to_string()))?;

        let succeeded = if tx.block_number.is_some() {
            self.with_failover(
                "eth_getTransactionReceipt",
                |p| async move { p.get_transaction_receipt(hash).await },
                no_final_error,
            )
            .await?
            .map(|receipt| receipt.status())
        } else {
            None
        };

        Ok(TransactionRecord::Ethereum(EthereumTransaction {
            hash: hash.to_string(),
            from: tx.inner.signer().to_checksum(None),
            to: tx.to().map(|a| a.to_checksum(None)),
            value: tx.value(),
            gas_limit: tx.gas_limit(),
            gas_price: tx.gas_price(),
            nonce: tx.nonce(),
            block_number: tx.block_number,
            succeeded,
        }))
    }

    async fn freshness(&self, address: &ChainAddress) -> ChainResult<FreshnessToken> {
        let address = ethereum_address(address)?;
        let nonce = self
            .with_failover(
                "eth_getTransactionCount",
                |p| async move { p.get_transaction_count(address).pending().await },
                no_final_error,
            )
            .await?;
        Ok(FreshnessToken::Nonce(nonce))
    }

    async fn estimate_fee(&self) -> ChainResult<FeeEstimate> {
        let gas_price = self
            .with_failover("eth_gasPrice", |p| async move { p.get_gas_price().await }, no_final_error)
            .await?;
        Ok(FeeEstimate::GasPrice(gas_price))
    }

    async fn submit(&self, signed: &SignedTransaction) -> ChainResult<String> {
        let raw = alloy::hex::decode(&signed.encoded).map_err(|e| {
            ErrorKind::SubmissionRejected(format!("transaction is not valid hex: {}", e))
        })?;
        let raw = Arc::new(raw);

        let tx_hash = self
            .with_failover(
                "eth_sendRawTransaction",
                |p| {
                    let raw = raw.clone();
                    async move {
                        let pending = p.send_raw_transaction(&raw).await?;
                        Ok(*pending.tx_hash())
                    }
                },
                rejected_by_node,
            )
            .await?;

        tracing::info!(tx_hash = %tx_hash, "Ethereum transaction broadcast");
        Ok(tx_hash.to_string())
    }

    async fn get_balance(&self, address: &ChainAddress) -> ChainResult<Balance> {
        let addr = ethereum_address(address)?;
        let wei = self
            .with_failover("eth_getBalance", |p| async move { p.get_balance(addr).await }, no_final_error)
            .await?;
        Ok(Balance {
            address: address.to_string(),
            amount: units::wei_to_ether(wei)?,
            symbol: Chain::Ethereum.native_symbol().to_string(),
            native: wei.to_string(),
        })
    }
}

/// Primary endpoint first, then failovers in configured order.
///
/// An invalid primary URL is an error; invalid failover URLs are skipped.
fn connect(config: &EthereumConfig) -> ChainResult<Vec<DynProvider>> {
    let http = |url: url::Url| Arc::new(ProviderBuilder::new().connect_http(url)) as DynProvider;

    let primary = url::Url::parse(&config.rpc_url).map_err(|e| {
        ErrorKind::RpcUnavailable(format!("invalid RPC URL '{}': {}", config.rpc_url, e))
    })?;
    let failovers = config
        .failover_urls
        .iter()
        .filter_map(|raw| match url::Url::parse(raw) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(url = %raw, error = %e, "Skipping invalid failover RPC URL");
                None
            }
        });

    Ok(std::iter::once(primary).chain(failovers).map(http).collect())
}

impl std::fmt::Debug for EthereumAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EthereumAdapter")
            .field("rpc_url", &self.config.rpc_url)
            .field("providers", &self.providers.len())
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> EthereumConfig {
        EthereumConfig {
            // Reserved TEST-NET address; nothing answers there.
            rpc_url: "http://192.0.2.1:8545".to_string(),
            rpc_timeout_secs: 1,
            ..EthereumConfig::default()
        }
    }

    #[tokio::test]
    async fn test_adapter_creation_tolerates_dead_node() {
        let adapter = EthereumAdapter::new(test_config()).await;
        assert!(adapter.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_primary_url_rejected() {
        let config = EthereumConfig {
            rpc_url: "not a url".to_string(),
            ..test_config()
        };
        assert!(matches!(
            EthereumAdapter::new(config).await,
            Err(ErrorKind::RpcUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_skips_bad_failovers() {
        let mut config = test_config();
        config.failover_urls = vec![
            "::garbage::".to_string(),
            "http://192.0.2.2:8545".to_string(),
            "also not a url".to_string(),
        ];
        assert_eq!(connect(&config).unwrap().len(), 2);

        config.rpc_url = "::garbage::".to_string();
        assert!(matches!(connect(&config), Err(ErrorKind::RpcUnavailable(_))));
    }

    #[tokio::test]
    async fn test_rpc_failover_exhausts_all_providers() {
        let mut config = test_config();
        config.failover_urls.push("http://192.0.2.2:8545".to_string());
        config.failover_urls.push("::garbage::".to_string());

        let adapter = EthereumAdapter::new(config).await.unwrap();
        assert_eq!(adapter.providers.len(), 2);

        let err = adapter.estimate_fee().await.unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("all providers failed eth_gasPrice"));
    }

    #[tokio::test]
    async fn test_rejects_foreign_address() {
        let adapter = EthereumAdapter::new(test_config()).await.unwrap();
        let sol = ChainAddress::parse(Chain::Solana, "9HM9gySNkt5z2te9wgJ4s777jciQb451Pp4nbQ1Gnf45")
            .unwrap();
        assert!(matches!(
            adapter.freshness(&sol).await,
            Err(ErrorKind::AddressParse { .. })
        ));
    }
}
