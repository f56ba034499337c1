//! The capability set every supported chain exposes to the pipeline.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::chain::types::{
    Balance, Chain, ChainAddress, FeeEstimate, FreshnessToken, NativeAmount, SignedTransaction,
    TransactionRecord,
};
use crate::error::{ChainResult, ErrorKind};

/// Network access for one chain.
///
/// Implementations bound every call by their configured RPC timeout and map
/// transport failures to [`ErrorKind::RpcUnavailable`].
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    fn chain(&self) -> Chain;

    /// Look up a transaction by id; [`ErrorKind::NotFound`] if the node does
    /// not know it yet.
    async fn get_transaction(&self, tx_id: &str) -> ChainResult<TransactionRecord>;

    /// Replay-protection token for a transaction sent from `address`.
    async fn freshness(&self, address: &ChainAddress) -> ChainResult<FreshnessToken>;

    async fn estimate_fee(&self) -> ChainResult<FeeEstimate>;

    /// Broadcast a signed transaction and return the id the node assigned.
    ///
    /// A node refusal is [`ErrorKind::SubmissionRejected`] carrying the node's
    /// own message.
    async fn submit(&self, signed: &SignedTransaction) -> ChainResult<String>;

    async fn get_balance(&self, address: &ChainAddress) -> ChainResult<Balance>;

    /// Ask the network faucet for funds. Only test networks support this.
    async fn request_airdrop(
        &self,
        _address: &ChainAddress,
        _amount: NativeAmount,
    ) -> ChainResult<String> {
        Err(ErrorKind::UnsupportedChain(format!(
            "{} has no faucet endpoint",
            self.chain()
        )))
    }
}

/// Adapters keyed by chain.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<Chain, Arc<dyn ChainAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `adapter` under its own chain, replacing any previous one.
    pub fn register(&mut self, adapter: Arc<dyn ChainAdapter>) {
        self.adapters.insert(adapter.chain(), adapter);
    }

    pub fn with(mut self, adapter: Arc<dyn ChainAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, chain: Chain) -> ChainResult<Arc<dyn ChainAdapter>> {
        self.adapters
            .get(&chain)
            .cloned()
            .ok_or_else(|| ErrorKind::UnsupportedChain(format!("no adapter configured for {}", chain)))
    }

    pub fn chains(&self) -> impl Iterator<Item = Chain> + '_ {
        self.adapters.keys().copied()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("chains", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}
