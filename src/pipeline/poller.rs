//! Retrying transaction lookup.
//!
//! # Responsibilities
//! - Ask an adapter for a transaction until the node knows it
//! - Optionally keep asking until the chain reports a final outcome
//!
//! # Design Decisions
//! - Only `NotFound` is retried; any other error ends the lookup at once
//! - At most `max_attempts` adapter calls, never more
//! - Cancellation and the deadline are checked between attempts, never
//!   while a request is in flight

use std::time::Duration;
use tokio::time::Instant;

use crate::chain::{ChainAdapter, TransactionRecord};
use crate::config::{PollStrategy, PollerConfig};
use crate::error::{ChainResult, ErrorKind};
use crate::lifecycle::Cancellation;
use crate::resilience::Backoff;

/// How often and how long to keep looking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
    /// Wall-clock bound across all attempts.
    pub deadline: Option<Duration>,
}

impl PollPolicy {
    pub fn from_config(config: &PollerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff: Backoff::from(config),
            deadline: config.deadline_secs.map(Duration::from_secs),
        }
    }

    /// Ten attempts five seconds apart, no deadline.
    pub fn legacy() -> Self {
        Self::from_config(&PollerConfig {
            strategy: PollStrategy::Fixed,
            max_attempts: 10,
            base_delay_ms: 5_000,
            max_delay_ms: 5_000,
            deadline_secs: None,
        })
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&PollerConfig::default())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfirmationPoller {
    policy: PollPolicy,
}

impl ConfirmationPoller {
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Return the record as soon as the node knows `tx_id`.
    pub async fn fetch(
        &self,
        adapter: &dyn ChainAdapter,
        tx_id: &str,
        cancel: &Cancellation,
    ) -> ChainResult<TransactionRecord> {
        self.poll(&self.policy, adapter, tx_id, cancel, |_| true).await
    }

    /// Like [`fetch`](Self::fetch), with a one-off attempt budget and delay
    /// schedule instead of the poller's own.
    pub async fn fetch_with(
        &self,
        policy: &PollPolicy,
        adapter: &dyn ChainAdapter,
        tx_id: &str,
        cancel: &Cancellation,
    ) -> ChainResult<TransactionRecord> {
        self.poll(policy, adapter, tx_id, cancel, |_| true).await
    }

    /// Like [`fetch`](Self::fetch), but a visible record whose outcome is
    /// still pending counts as not found yet.
    pub async fn wait_for_finality(
        &self,
        adapter: &dyn ChainAdapter,
        tx_id: &str,
        cancel: &Cancellation,
    ) -> ChainResult<TransactionRecord> {
        self.poll(&self.policy, adapter, tx_id, cancel, |record| record.outcome().is_final())
            .await
    }

    async fn poll<F>(
        &self,
        policy: &PollPolicy,
        adapter: &dyn ChainAdapter,
        tx_id: &str,
        cancel: &Cancellation,
        accept: F,
    ) -> ChainResult<TransactionRecord>
    where
        F: Fn(&TransactionRecord) -> bool,
    {
        let chain = adapter.chain();
        let deadline = policy.deadline.map(|limit| Instant::now() + limit);
        let mut attempts = 0u32;

        while attempts < policy.max_attempts {
            if cancel.is_cancelled() {
                return Err(ErrorKind::Cancelled);
            }

            attempts += 1;
            match adapter.get_transaction(tx_id).await {
                Ok(record) if accept(&record) => {
                    tracing::info!(chain = %chain, tx_id = %tx_id, attempts, "Transaction found");
                    return Ok(record);
                }
                Ok(_) => {
                    tracing::debug!(chain = %chain, tx_id = %tx_id, attempt = attempts, "Transaction not final yet");
                }
                Err(ErrorKind::NotFound(_)) => {
                    tracing::debug!(chain = %chain, tx_id = %tx_id, attempt = attempts, "Transaction not found yet");
                }
                Err(e) => {
                    tracing::warn!(chain = %chain, tx_id = %tx_id, error = %e, "Lookup failed");
                    return Err(e);
                }
            }

            if attempts == policy.max_attempts {
                break;
            }

            let delay = policy.backoff.delay(attempts);
            if let Some(deadline) = deadline {
                if Instant::now() + delay > deadline {
                    tracing::debug!(chain = %chain, tx_id = %tx_id, "Lookup deadline reached");
                    break;
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return Err(ErrorKind::Cancelled),
            }
        }

        tracing::warn!(chain = %chain, tx_id = %tx_id, attempts, "Lookup exhausted");
        Err(ErrorKind::LookupExhausted { attempts })
    }
}
