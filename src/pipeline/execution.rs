//! Swap execution record and its status state machine.
//!
//! # State Transitions
//! ```text
//! Pending → Submitted → Confirmed
//!    │          │
//!    └──────────┴──→ Failed
//! ```
//! Confirmed and Failed are terminal. A raw signed transaction is recorded
//! exactly when the execution reaches Submitted and is kept if it later fails.

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::chain::TransactionIntent;
use crate::error::{ChainResult, ErrorKind, SwapError};
use crate::quoting::SwapQuote;

/// Lifecycle status of a swap execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapStatus {
    Pending,
    Submitted,
    Confirmed,
    Failed,
}

impl SwapStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SwapStatus::Confirmed | SwapStatus::Failed)
    }

    fn can_move_to(self, next: SwapStatus) -> bool {
        matches!(
            (self, next),
            (SwapStatus::Pending, SwapStatus::Submitted)
                | (SwapStatus::Submitted, SwapStatus::Confirmed)
                | (SwapStatus::Pending, SwapStatus::Failed)
                | (SwapStatus::Submitted, SwapStatus::Failed)
        )
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SwapStatus::Pending => "pending",
            SwapStatus::Submitted => "submitted",
            SwapStatus::Confirmed => "confirmed",
            SwapStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One swap's progress through prepare, sign, submit and confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct SwapExecution {
    id: Uuid,
    quote: SwapQuote,
    intent: TransactionIntent,
    raw_signed_tx: Option<String>,
    tx_hash: Option<String>,
    status: SwapStatus,
    failure: Option<SwapError>,
}

impl SwapExecution {
    pub fn new(quote: SwapQuote, intent: TransactionIntent) -> Self {
        Self {
            id: Uuid::new_v4(),
            quote,
            intent,
            raw_signed_tx: None,
            tx_hash: None,
            status: SwapStatus::Pending,
            failure: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn quote(&self) -> &SwapQuote {
        &self.quote
    }

    pub fn intent(&self) -> &TransactionIntent {
        &self.intent
    }

    pub fn raw_signed_tx(&self) -> Option<&str> {
        self.raw_signed_tx.as_deref()
    }

    pub fn tx_hash(&self) -> Option<&str> {
        self.tx_hash.as_deref()
    }

    pub fn status(&self) -> SwapStatus {
        self.status
    }

    pub fn failure(&self) -> Option<&SwapError> {
        self.failure.as_ref()
    }

    fn advance(&mut self, next: SwapStatus) -> ChainResult<()> {
        if !self.status.can_move_to(next) {
            return Err(ErrorKind::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!(execution_id = %self.id, from = %self.status, to = %next, "Execution status change");
        self.status = next;
        Ok(())
    }

    /// Record a broadcast transaction. Only valid from Pending.
    pub fn mark_submitted(&mut self, raw_signed_tx: String, tx_hash: String) -> ChainResult<()> {
        self.advance(SwapStatus::Submitted)?;
        self.raw_signed_tx = Some(raw_signed_tx);
        self.tx_hash = Some(tx_hash);
        Ok(())
    }

    /// Record on-chain success. Only valid from Submitted.
    pub fn mark_confirmed(&mut self) -> ChainResult<()> {
        self.advance(SwapStatus::Confirmed)
    }

    /// Record a failure. Valid from any non-terminal status.
    pub fn mark_failed(&mut self, error: SwapError) -> ChainResult<()> {
        self.advance(SwapStatus::Failed)?;
        self.failure = Some(error);
        Ok(())
    }
}
