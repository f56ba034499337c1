//! Application context wiring adapters, keys, pricing and the poller.
//!
//! # Responsibilities
//! - Build every collaborator once from a validated [`SwapConfig`]
//! - Expose the user-facing operations (quote, swap, redeem a deposit,
//!   lookup, balance, fund, addresses)
//! - Tag every failure with the stage and chain it came from
//!
//! # Design Decisions
//! - Immutable after construction; shared by reference
//! - A lookup that gives up after submission leaves the execution in
//!   Submitted, since the transaction may still land

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

use crate::chain::{
    AdapterRegistry, Balance, Chain, ChainAdapter, ChainAddress, NativeAmount, TransactionRecord,
    TxOutcome,
};
use crate::chain::ethereum::EthereumAdapter;
use crate::chain::solana::SolanaAdapter;
use crate::config::{PricingSource, SwapConfig};
use crate::error::{ChainResult, ErrorKind, Stage, StageExt, SwapResult};
use crate::keys::KeyStore;
use crate::lifecycle::Cancellation;
use crate::pipeline::execution::{SwapExecution, SwapStatus};
use crate::pipeline::poller::{ConfirmationPoller, PollPolicy};
use crate::pipeline::pool::StaticPoolDirectory;
use crate::pipeline::stages::{EthereumSettings, TransactionPipeline};
use crate::quoting::{FixedRates, PriceFeed, RateSource, SwapQuote, SwapQuoteEngine};

/// Derived key and pool for one chain.
#[derive(Debug, Clone, Serialize)]
pub struct AddressEntry {
    pub chain: Chain,
    pub address: ChainAddress,
    pub public_key: String,
    pub pool: Option<ChainAddress>,
}

/// A redeemed deposit and the payout it produced.
#[derive(Debug, Clone, Serialize)]
pub struct DepositSwap {
    pub deposit: TransactionRecord,
    pub amount: Decimal,
    pub execution: SwapExecution,
}

pub struct SwapService {
    pipeline: TransactionPipeline,
    quotes: SwapQuoteEngine,
    poller: ConfirmationPoller,
}

impl SwapService {
    pub fn new(
        pipeline: TransactionPipeline,
        quotes: SwapQuoteEngine,
        poller: ConfirmationPoller,
    ) -> Self {
        Self {
            pipeline,
            quotes,
            poller,
        }
    }

    /// Build adapters for every enabled chain plus pricing and pools.
    ///
    /// Fails with [`ErrorKind::SigningKeyMissing`] when a configured pool is
    /// not controlled by any key in `keys`.
    pub async fn from_config(config: &SwapConfig, keys: KeyStore) -> ChainResult<Self> {
        let pools = StaticPoolDirectory::from_config(&config.pools, &keys)?;

        let mut adapters = AdapterRegistry::new();
        if config.ethereum.enabled {
            let adapter = EthereumAdapter::new(config.ethereum.clone()).await?;
            adapters.register(Arc::new(adapter));
        }
        if config.solana.enabled {
            let adapter = SolanaAdapter::new(config.solana.clone())?;
            adapters.register(Arc::new(adapter));
        }

        let source: Arc<dyn RateSource> = match config.pricing.source {
            PricingSource::Fixed => Arc::new(FixedRates::from_entries(&config.pricing.rates)),
            PricingSource::Feed => Arc::new(PriceFeed::from_config(&config.pricing)?),
        };

        tracing::info!(
            chains = ?adapters.chains().collect::<Vec<_>>(),
            pricing = source.name(),
            "Swap service ready"
        );

        Ok(Self::new(
            TransactionPipeline::new(
                adapters,
                Arc::new(keys),
                Arc::new(pools),
                EthereumSettings::from(&config.ethereum),
            ),
            SwapQuoteEngine::new(source),
            ConfirmationPoller::new(PollPolicy::from_config(&config.poller)),
        ))
    }

    pub fn pipeline(&self) -> &TransactionPipeline {
        &self.pipeline
    }

    fn adapter(&self, chain: Chain, stage: Stage) -> SwapResult<Arc<dyn ChainAdapter>> {
        self.pipeline.adapters().get(chain).at(stage, chain)
    }

    pub async fn quote(
        &self,
        from_token: &str,
        to_token: &str,
        amount: Decimal,
    ) -> SwapResult<SwapQuote> {
        self.quotes
            .quote(from_token, to_token, amount)
            .await
            .map_err(|e| e.at(Stage::Quote, None))
    }

    /// Quote, then pay `destination` on the target chain.
    ///
    /// With `wait`, also follow the payout until the chain reports a final
    /// outcome.
    pub async fn swap(
        &self,
        from_token: &str,
        to_token: &str,
        amount: Decimal,
        destination: &str,
        wait: bool,
        cancel: &Cancellation,
    ) -> SwapResult<SwapExecution> {
        let quote = self.quote(from_token, to_token, amount).await?;
        let mut execution = self.pipeline.execute(&quote, destination).await?;
        if wait && execution.status() == SwapStatus::Submitted {
            self.confirm(&mut execution, cancel).await?;
        }
        Ok(execution)
    }

    async fn confirm(&self, execution: &mut SwapExecution, cancel: &Cancellation) -> SwapResult<()> {
        let chain = execution.intent().chain();
        let tx_hash = match execution.tx_hash() {
            Some(hash) => hash.to_string(),
            None => return Ok(()),
        };
        let adapter = self.adapter(chain, Stage::Lookup)?;

        let record = match self
            .poller
            .wait_for_finality(adapter.as_ref(), &tx_hash, cancel)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    execution_id = %execution.id(),
                    tx_hash = %tx_hash,
                    error = %e,
                    "Payout not confirmed, leaving execution submitted"
                );
                return Ok(());
            }
        };

        match record.outcome() {
            TxOutcome::Failed(reason) => {
                let error = ErrorKind::SubmissionRejected(format!("execution failed: {}", reason))
                    .at(Stage::Lookup, Some(chain));
                execution.mark_failed(error).at(Stage::Lookup, chain)
            }
            _ => {
                tracing::info!(execution_id = %execution.id(), tx_hash = %tx_hash, "Payout confirmed");
                execution.mark_confirmed().at(Stage::Lookup, chain)
            }
        }
    }

    /// Redeem a deposit made to `chain`'s pool: pay out its value in `to_token`.
    pub async fn swap_from_deposit(
        &self,
        chain: Chain,
        tx_id: &str,
        to_token: &str,
        destination: &str,
        wait: bool,
        cancel: &Cancellation,
    ) -> SwapResult<DepositSwap> {
        let adapter = self.adapter(chain, Stage::Lookup)?;
        let deposit = self
            .poller
            .wait_for_finality(adapter.as_ref(), tx_id, cancel)
            .await
            .at(Stage::Lookup, chain)?;

        if let TxOutcome::Failed(reason) = deposit.outcome() {
            return Err(ErrorKind::InvalidAmount(format!(
                "deposit {} failed on chain: {}",
                tx_id, reason
            ))
            .at(Stage::Lookup, Some(chain)));
        }

        // Only what the pool's own account gained counts toward the payout.
        let pool = self.pipeline.pools().pool_address(chain).at(Stage::Lookup, chain)?;
        let amount = deposit.received_by(&pool).at(Stage::Lookup, chain)?;
        if amount.is_zero() {
            return Err(ErrorKind::InvalidAmount(format!(
                "deposit {} credited nothing to pool {}",
                tx_id, pool
            ))
            .at(Stage::Lookup, Some(chain)));
        }
        tracing::info!(chain = %chain, tx_id = %tx_id, amount = %amount, "Deposit verified");

        let execution = self
            .swap(chain.native_symbol(), to_token, amount, destination, wait, cancel)
            .await?;
        Ok(DepositSwap {
            deposit,
            amount,
            execution,
        })
    }

    /// Look up a transaction, retrying while the node does not know it.
    pub async fn lookup(
        &self,
        chain: Chain,
        tx_id: &str,
        cancel: &Cancellation,
    ) -> SwapResult<TransactionRecord> {
        let adapter = self.adapter(chain, Stage::Lookup)?;
        self.poller
            .fetch(adapter.as_ref(), tx_id, cancel)
            .await
            .at(Stage::Lookup, chain)
    }

    /// [`lookup`](Self::lookup) with a one-off retry policy.
    pub async fn lookup_with(
        &self,
        chain: Chain,
        tx_id: &str,
        policy: &PollPolicy,
        cancel: &Cancellation,
    ) -> SwapResult<TransactionRecord> {
        let adapter = self.adapter(chain, Stage::Lookup)?;
        self.poller
            .fetch_with(policy, adapter.as_ref(), tx_id, cancel)
            .await
            .at(Stage::Lookup, chain)
    }

    /// Native balance of `address`, or of the chain's pool when omitted.
    pub async fn balance(&self, chain: Chain, address: Option<&str>) -> SwapResult<Balance> {
        let adapter = self.adapter(chain, Stage::Balance)?;
        let address = match address {
            Some(a) => ChainAddress::parse(chain, a),
            None => self.pipeline.pools().pool_address(chain),
        }
        .at(Stage::Balance, chain)?;
        adapter.get_balance(&address).await.at(Stage::Balance, chain)
    }

    /// Send test funds to `address`: the faucet where the chain has one,
    /// otherwise a transfer from the derived key.
    pub async fn fund(
        &self,
        chain: Chain,
        address: &str,
        amount: Option<Decimal>,
    ) -> SwapResult<String> {
        let adapter = self.adapter(chain, Stage::Fund)?;
        let amount = amount.unwrap_or(Decimal::ONE);
        let to = ChainAddress::parse(chain, address).at(Stage::Fund, chain)?;
        let native = NativeAmount::from_human(chain, amount).at(Stage::Fund, chain)?;

        match adapter.request_airdrop(&to, native).await {
            Ok(tx_id) => {
                tracing::info!(chain = %chain, to = %to, amount = %amount, tx_id = %tx_id, "Faucet request accepted");
                Ok(tx_id)
            }
            Err(ErrorKind::UnsupportedChain(reason)) => {
                tracing::debug!(chain = %chain, reason = %reason, "No faucet, funding from derived key");
                let from = self.pipeline.keys().address(chain).at(Stage::Fund, chain)?;
                self.pipeline.transfer(chain, from, to, amount).await
            }
            Err(e) => Err(e.at(Stage::Fund, Some(chain))),
        }
    }

    /// Derived addresses and pools for every chain with a key.
    pub fn addresses(&self) -> Vec<AddressEntry> {
        self.pipeline
            .keys()
            .iter()
            .map(|pair| AddressEntry {
                chain: pair.chain(),
                address: *pair.address(),
                public_key: pair.public_key(),
                pool: self.pipeline.pools().pool_address(pair.chain()).ok(),
            })
            .collect()
    }
}

impl std::fmt::Debug for SwapService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwapService")
            .field("pipeline", &self.pipeline)
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}
