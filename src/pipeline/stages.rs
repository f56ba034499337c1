//! Prepare → Sign → Submit.
//!
//! # Responsibilities
//! - Turn a quote into a chain-specific [`TransactionIntent`]
//! - Sign it with the one KeyPair allowed to spend from the source address
//! - Broadcast it and record the outcome on a [`SwapExecution`]
//!
//! # Design Decisions
//! - Stages run in order and are never retried as a unit
//! - `execute` holds the source address's nonce lease across all three
//!   stages, so concurrent swaps from one pool never reuse a nonce
//! - Gas price cap is checked against the node estimate, then the
//!   multiplier is applied

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::chain::{
    ethereum, solana, AdapterRegistry, Chain, ChainAdapter, ChainAddress, ChainParams, FeeEstimate,
    FreshnessToken, NativeAmount, SignedTransaction, TransactionIntent,
};
use crate::config::EthereumConfig;
use crate::error::{ErrorKind, Stage, StageExt, SwapResult};
use crate::keys::KeyStore;
use crate::pipeline::execution::SwapExecution;
use crate::pipeline::nonce::{NonceAllocator, NonceLease};
use crate::pipeline::pool::PoolDirectory;
use crate::quoting::SwapQuote;

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Ethereum transaction shaping knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct EthereumSettings {
    pub chain_id: u64,
    pub gas_limit: u64,
    /// 1.0 = node estimate, 1.2 = 20% buffer.
    pub gas_price_multiplier: f64,
    pub max_gas_price_gwei: u64,
}

impl Default for EthereumSettings {
    fn default() -> Self {
        Self {
            chain_id: 1337,
            gas_limit: 21_000,
            gas_price_multiplier: 1.0,
            max_gas_price_gwei: 500,
        }
    }
}

impl From<&EthereumConfig> for EthereumSettings {
    fn from(config: &EthereumConfig) -> Self {
        Self {
            chain_id: config.chain_id,
            gas_limit: config.gas_limit,
            gas_price_multiplier: config.gas_price_multiplier,
            max_gas_price_gwei: config.max_gas_price_gwei,
        }
    }
}

/// Builds, signs and broadcasts transfers.
pub struct TransactionPipeline {
    adapters: AdapterRegistry,
    keys: Arc<KeyStore>,
    pools: Arc<dyn PoolDirectory>,
    nonces: NonceAllocator,
    ethereum: EthereumSettings,
}

impl TransactionPipeline {
    pub fn new(
        adapters: AdapterRegistry,
        keys: Arc<KeyStore>,
        pools: Arc<dyn PoolDirectory>,
        ethereum: EthereumSettings,
    ) -> Self {
        Self {
            adapters,
            keys,
            pools,
            nonces: NonceAllocator::new(),
            ethereum,
        }
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }

    pub fn pools(&self) -> &dyn PoolDirectory {
        self.pools.as_ref()
    }

    /// Build the intent paying `quote.to_amount` from `chain`'s pool to
    /// `destination`.
    pub async fn prepare(
        &self,
        chain: Chain,
        quote: &SwapQuote,
        destination: &str,
    ) -> SwapResult<TransactionIntent> {
        let (adapter, from, to) = self.resolve(chain, quote, destination)?;
        self.build_intent(adapter.as_ref(), None, from, to, quote.to_amount())
            .await
    }

    /// Sign `intent` with the KeyPair owning its source address.
    pub fn sign(&self, intent: &TransactionIntent) -> SwapResult<SignedTransaction> {
        let chain = intent.chain();
        let key = self
            .keys
            .signer_for(intent.from_address())
            .at(Stage::Sign, chain)?;

        let signed = match chain {
            Chain::Ethereum => ethereum::sign_transfer(intent, key, self.ethereum.chain_id),
            Chain::Solana => solana::sign_transfer(intent, key),
        }
        .at(Stage::Sign, chain)?;

        tracing::debug!(chain = %chain, tx_hash = %signed.tx_hash, "Transaction signed");
        Ok(signed)
    }

    /// Broadcast `signed` and record the result on `execution`.
    ///
    /// A refusal moves the execution to Failed and is also returned.
    pub async fn submit(
        &self,
        execution: &mut SwapExecution,
        signed: SignedTransaction,
    ) -> SwapResult<()> {
        let chain = execution.intent().chain();
        if signed.chain != chain {
            return Err(ErrorKind::UnsupportedChain(format!(
                "{} transaction submitted for a {} execution",
                signed.chain, chain
            ))
            .at(Stage::Submit, Some(chain)));
        }
        let adapter = self.adapters.get(chain).at(Stage::Submit, chain)?;

        match adapter.submit(&signed).await {
            Ok(tx_hash) => {
                tracing::info!(
                    execution_id = %execution.id(),
                    chain = %chain,
                    tx_hash = %tx_hash,
                    "Transaction submitted"
                );
                execution
                    .mark_submitted(signed.encoded, tx_hash)
                    .at(Stage::Submit, chain)
            }
            Err(kind) => {
                let error = kind.at(Stage::Submit, Some(chain));
                tracing::warn!(
                    execution_id = %execution.id(),
                    chain = %chain,
                    error = %error,
                    "Transaction submission failed"
                );
                execution
                    .mark_failed(error.clone())
                    .at(Stage::Submit, chain)?;
                Err(error)
            }
        }
    }

    /// Run all three stages for `quote`, paying out on the quote's target chain.
    ///
    /// Errors before submission are returned as-is. A submission failure is
    /// reported through the returned execution's Failed status.
    pub async fn execute(&self, quote: &SwapQuote, destination: &str) -> SwapResult<SwapExecution> {
        let chain = Chain::for_token(quote.to_token()).map_err(|e| e.at(Stage::Prepare, None))?;
        let (adapter, from, to) = self.resolve(chain, quote, destination)?;

        let mut lease = self.nonces.lease(from).await;
        let intent = self
            .build_intent(adapter.as_ref(), Some(&mut lease), from, to, quote.to_amount())
            .await?;
        let signed = self.sign_leased(&intent, &mut lease)?;

        let mut execution = SwapExecution::new(quote.clone(), intent);
        let accepted = self.submit(&mut execution, signed).await.is_ok();
        settle_nonce(&mut lease, execution.intent(), accepted);

        tracing::info!(
            execution_id = %execution.id(),
            from_token = %quote.from_token(),
            to_token = %quote.to_token(),
            amount = %quote.to_amount(),
            status = %execution.status(),
            "Swap executed"
        );
        Ok(execution)
    }

    /// Send a plain transfer of `amount` whole coins from a derived address.
    ///
    /// Returns the id the node assigned.
    pub async fn transfer(
        &self,
        chain: Chain,
        from: ChainAddress,
        to: ChainAddress,
        amount: Decimal,
    ) -> SwapResult<String> {
        let adapter = self.adapters.get(chain).at(Stage::Prepare, chain)?;
        let mut lease = self.nonces.lease(from).await;
        let intent = self
            .build_intent(adapter.as_ref(), Some(&mut lease), from, to, amount)
            .await?;
        let signed = self.sign_leased(&intent, &mut lease)?;

        match adapter.submit(&signed).await {
            Ok(tx_id) => {
                settle_nonce(&mut lease, &intent, true);
                tracing::info!(chain = %chain, to = %to, amount = %amount, tx_id = %tx_id, "Transfer submitted");
                Ok(tx_id)
            }
            Err(kind) => {
                settle_nonce(&mut lease, &intent, false);
                Err(kind.at(Stage::Submit, Some(chain)))
            }
        }
    }

    /// Sign while holding `lease`; a failure drops its cached nonce.
    fn sign_leased(
        &self,
        intent: &TransactionIntent,
        lease: &mut NonceLease,
    ) -> SwapResult<SignedTransaction> {
        self.sign(intent).inspect_err(|_| lease.invalidate())
    }

    fn resolve(
        &self,
        chain: Chain,
        quote: &SwapQuote,
        destination: &str,
    ) -> SwapResult<(Arc<dyn ChainAdapter>, ChainAddress, ChainAddress)> {
        let target = Chain::for_token(quote.to_token()).at(Stage::Prepare, chain)?;
        if target != chain {
            return Err(ErrorKind::UnsupportedChain(format!(
                "quote pays out {} but {} was requested",
                quote.to_token(),
                chain
            ))
            .at(Stage::Prepare, Some(chain)));
        }

        let adapter = self.adapters.get(chain).at(Stage::Prepare, chain)?;
        let from = self.pools.pool_address(chain).at(Stage::Prepare, chain)?;
        let to = ChainAddress::parse(chain, destination).at(Stage::Prepare, chain)?;
        Ok((adapter, from, to))
    }

    async fn build_intent(
        &self,
        adapter: &dyn ChainAdapter,
        lease: Option<&mut NonceLease>,
        from: ChainAddress,
        to: ChainAddress,
        amount: Decimal,
    ) -> SwapResult<TransactionIntent> {
        let chain = adapter.chain();
        let native = NativeAmount::from_human(chain, amount).at(Stage::Prepare, chain)?;

        // Replay protection and fee come from the node
        let freshness = adapter.freshness(&from).await.at(Stage::Prepare, chain)?;
        let fee = adapter.estimate_fee().await.at(Stage::Prepare, chain)?;

        let params = match (freshness, fee, native) {
            (FreshnessToken::Nonce(node_nonce), FeeEstimate::GasPrice(gas_price), _) => {
                let nonce = match lease {
                    Some(lease) => lease.reconcile(node_nonce),
                    None => node_nonce,
                };
                ChainParams::Ethereum {
                    gas_price: self.gas_price(gas_price).at(Stage::Prepare, chain)?,
                    gas_limit: self.ethereum.gas_limit,
                    nonce,
                }
            }
            (
                FreshnessToken::Blockhash(recent_blockhash),
                FeeEstimate::PerSignature { .. },
                NativeAmount::Lamports(lamports),
            ) => ChainParams::Solana {
                recent_blockhash,
                lamports,
            },
            _ => {
                return Err(ErrorKind::MalformedResponse(format!(
                    "{} adapter returned parameters for another chain",
                    chain
                ))
                .at(Stage::Prepare, Some(chain)))
            }
        };

        let intent =
            TransactionIntent::new(from, to, amount, native, params).at(Stage::Prepare, chain)?;
        tracing::debug!(
            chain = %chain,
            from = %from,
            to = %to,
            native_amount = %native,
            "Transaction prepared"
        );
        Ok(intent)
    }

    fn gas_price(&self, estimate: u128) -> Result<u128, ErrorKind> {
        // Check against max gas price
        let estimate_gwei = estimate / WEI_PER_GWEI;
        if estimate_gwei > u128::from(self.ethereum.max_gas_price_gwei) {
            return Err(ErrorKind::FeeCapExceeded {
                current_gwei: estimate_gwei,
                max_gwei: self.ethereum.max_gas_price_gwei,
            });
        }

        // Apply multiplier for safety margin
        Ok((estimate as f64 * self.ethereum.gas_price_multiplier) as u128)
    }
}

impl std::fmt::Debug for TransactionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionPipeline")
            .field("adapters", &self.adapters)
            .field("keys", &self.keys)
            .field("ethereum", &self.ethereum)
            .finish_non_exhaustive()
    }
}

fn settle_nonce(lease: &mut NonceLease, intent: &TransactionIntent, accepted: bool) {
    if let ChainParams::Ethereum { nonce, .. } = intent.params() {
        if accepted {
            lease.commit(*nonce);
        } else {
            lease.invalidate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::adapter::mock::MockAdapter;
    use crate::keys::{derive, SecretPhrase};
    use crate::pipeline::execution::SwapStatus;
    use crate::pipeline::pool::StaticPoolDirectory;
    use alloy::primitives::U256;
    use std::collections::BTreeMap;
    use std::str::FromStr;

    const PHRASE: &str = "indoor dish desk flag debris potato excuse depart ticket judge file exit";
    const ETH_DEST: &str = "0x9858EfFD232B4033E47d90003D41EC34EcaEda94";
    const SOL_DEST: &str = "DvWFKfpfYkBupFCG1eKLkfhmij4UgdcsRHPvLTVy9Krr";

    struct Harness {
        pipeline: TransactionPipeline,
        eth: Arc<MockAdapter>,
        sol: Arc<MockAdapter>,
    }

    fn harness_with(eth: MockAdapter, settings: EthereumSettings) -> Harness {
        let keys = Arc::new(derive(&SecretPhrase::new(PHRASE)).unwrap());
        let pools = StaticPoolDirectory::from_config(&BTreeMap::new(), &keys).unwrap();
        let eth = Arc::new(eth);
        let sol = Arc::new(MockAdapter::new(Chain::Solana));
        let adapters = AdapterRegistry::new().with(eth.clone()).with(sol.clone());
        Harness {
            pipeline: TransactionPipeline::new(adapters, keys, Arc::new(pools), settings),
            eth,
            sol,
        }
    }

    fn harness() -> Harness {
        harness_with(MockAdapter::new(Chain::Ethereum), EthereumSettings::default())
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn sol_to_eth() -> SwapQuote {
        SwapQuote::new("SOL", "ETH", dec("100"), dec("0.01")).unwrap()
    }

    fn eth_to_sol() -> SwapQuote {
        SwapQuote::new("ETH", "SOL", dec("1"), dec("1")).unwrap()
    }

    #[tokio::test]
    async fn test_prepare_one_ether() {
        let h = harness();
        let intent = h
            .pipeline
            .prepare(Chain::Ethereum, &sol_to_eth(), ETH_DEST)
            .await
            .unwrap();

        assert_eq!(intent.chain(), Chain::Ethereum);
        assert_eq!(
            intent.native_amount(),
            NativeAmount::Wei(U256::from(1_000_000_000_000_000_000u128))
        );
        assert_eq!(
            intent.params(),
            &ChainParams::Ethereum {
                gas_price: 20_000_000_000,
                gas_limit: 21_000,
                nonce: 0,
            }
        );
        assert_eq!(
            intent.from_address().to_string(),
            "0x3f1Eae7D46d88F08fc2F8ed27FCb2AB183EB2d0E"
        );
    }

    #[tokio::test]
    async fn test_prepare_one_sol() {
        let h = harness();
        let intent = h
            .pipeline
            .prepare(Chain::Solana, &eth_to_sol(), SOL_DEST)
            .await
            .unwrap();

        assert_eq!(intent.native_amount(), NativeAmount::Lamports(1_000_000_000));
        assert_eq!(
            intent.params(),
            &ChainParams::Solana {
                recent_blockhash: MockAdapter::blockhash(),
                lamports: 1_000_000_000,
            }
        );
    }

    #[tokio::test]
    async fn test_prepare_rejects_bad_destination() {
        let h = harness();
        let err = h
            .pipeline
            .prepare(Chain::Solana, &eth_to_sol(), "0xabc")
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::Prepare);
        assert!(matches!(err.kind, ErrorKind::AddressParse { .. }));
    }

    #[tokio::test]
    async fn test_prepare_rejects_chain_mismatch() {
        let h = harness();
        let err = h
            .pipeline
            .prepare(Chain::Ethereum, &eth_to_sol(), ETH_DEST)
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnsupportedChain(_)));
    }

    #[tokio::test]
    async fn test_gas_cap_checked_before_multiplier() {
        let settings = EthereumSettings {
            gas_price_multiplier: 1.5,
            max_gas_price_gwei: 25,
            ..EthereumSettings::default()
        };
        // 20 gwei estimate passes the cap, multiplier lifts it to 30.
        let h = harness_with(MockAdapter::new(Chain::Ethereum), settings.clone());
        let intent = h
            .pipeline
            .prepare(Chain::Ethereum, &sol_to_eth(), ETH_DEST)
            .await
            .unwrap();
        assert!(matches!(
            intent.params(),
            ChainParams::Ethereum { gas_price: 30_000_000_000, .. }
        ));

        let expensive =
            MockAdapter::new(Chain::Ethereum).with_fee(FeeEstimate::GasPrice(26 * WEI_PER_GWEI));
        let h = harness_with(expensive, settings);
        let err = h
            .pipeline
            .prepare(Chain::Ethereum, &sol_to_eth(), ETH_DEST)
            .await
            .unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::FeeCapExceeded {
                current_gwei: 26,
                max_gwei: 25
            }
        );
    }

    #[tokio::test]
    async fn test_sign_requires_matching_key() {
        let h = harness();
        let stranger = ChainAddress::parse(Chain::Solana, SOL_DEST).unwrap();
        let intent = TransactionIntent::new(
            stranger,
            stranger,
            Decimal::ONE,
            NativeAmount::Lamports(1_000_000_000),
            ChainParams::Solana {
                recent_blockhash: MockAdapter::blockhash(),
                lamports: 1_000_000_000,
            },
        )
        .unwrap();

        let err = h.pipeline.sign(&intent).unwrap_err();
        assert_eq!(err.stage, Stage::Sign);
        assert!(matches!(err.kind, ErrorKind::SigningKeyMissing(_)));
    }

    #[tokio::test]
    async fn test_execute_submits_solana_transfer() {
        let h = harness();
        let execution = h.pipeline.execute(&eth_to_sol(), SOL_DEST).await.unwrap();

        assert_eq!(execution.status(), SwapStatus::Submitted);
        let submitted = h.sol.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(execution.raw_signed_tx(), Some(submitted[0].encoded.as_str()));
        assert_eq!(execution.tx_hash(), Some(submitted[0].tx_hash.as_str()));
        assert!(h.eth.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_execute_records_rejection() {
        let h = harness();
        h.eth.reject_next_submit("nonce too low");

        let execution = h.pipeline.execute(&sol_to_eth(), ETH_DEST).await.unwrap();
        assert_eq!(execution.status(), SwapStatus::Failed);
        assert!(execution.raw_signed_tx().is_none());
        let failure = execution.failure().unwrap();
        assert_eq!(failure.stage, Stage::Submit);
        assert_eq!(failure.chain, Some(Chain::Ethereum));
        assert_eq!(
            failure.kind,
            ErrorKind::SubmissionRejected("nonce too low".into())
        );
    }

    #[tokio::test]
    async fn test_concurrent_swaps_use_distinct_nonces() {
        let h = Arc::new(harness());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let h = h.clone();
            handles.push(tokio::spawn(async move {
                h.pipeline.execute(&sol_to_eth(), ETH_DEST).await.unwrap()
            }));
        }

        let mut nonces = Vec::new();
        for handle in handles {
            let execution = handle.await.unwrap();
            assert_eq!(execution.status(), SwapStatus::Submitted);
            match execution.intent().params() {
                ChainParams::Ethereum { nonce, .. } => nonces.push(*nonce),
                other => panic!("unexpected params {:?}", other),
            }
        }
        nonces.sort_unstable();
        assert_eq!(nonces, (0..8).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_transfer_from_derived_key() {
        let h = harness();
        let from = h.pipeline.keys().address(Chain::Ethereum).unwrap();
        let to = ChainAddress::parse(Chain::Ethereum, ETH_DEST).unwrap();

        let tx_id = h
            .pipeline
            .transfer(Chain::Ethereum, from, to, dec("0.5"))
            .await
            .unwrap();
        let submitted = h.eth.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(tx_id, submitted[0].tx_hash);
        assert!(submitted[0].encoded.starts_with("0x"));
    }

    #[tokio::test]
    async fn test_transfer_sign_failure_drops_cached_nonce() {
        let h = harness();
        *h.eth.nonce.lock().unwrap() = 3;
        let foreign = ChainAddress::parse(Chain::Ethereum, ETH_DEST).unwrap();
        {
            let mut lease = h.pipeline.nonces.lease(foreign).await;
            lease.commit(7);
        }

        let err = h
            .pipeline
            .transfer(Chain::Ethereum, foreign, foreign, dec("0.1"))
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::Sign);
        assert!(matches!(err.kind, ErrorKind::SigningKeyMissing(_)));
        assert!(h.eth.submitted().is_empty());

        let mut lease = h.pipeline.nonces.lease(foreign).await;
        assert_eq!(lease.reconcile(3), 3);
    }
}
