//! Error taxonomy shared by every stage of the swap pipeline.
//!
//! Adapters and helpers return a bare [`ErrorKind`]; the pipeline tags it with
//! the [`Stage`] and [`Chain`] it happened in, producing a [`SwapError`]. The
//! tag is what lets a caller tell "re-run the stage" apart from "fix the
//! inputs".

use serde::Serialize;
use thiserror::Error;

use crate::chain::Chain;

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Derive,
    Quote,
    Prepare,
    Sign,
    Submit,
    Lookup,
    Balance,
    Fund,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Derive => "derive",
            Stage::Quote => "quote",
            Stage::Prepare => "prepare",
            Stage::Sign => "sign",
            Stage::Submit => "submit",
            Stage::Lookup => "lookup",
            Stage::Balance => "balance",
            Stage::Fund => "fund",
        };
        f.write_str(name)
    }
}

/// What went wrong, independent of where.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ErrorKind {
    /// Secret phrase is not a valid checksummed mnemonic.
    #[error("invalid secret phrase")]
    InvalidSecret,

    /// No adapter or key material exists for the named chain.
    #[error("unsupported chain: {0}")]
    UnsupportedChain(String),

    /// Address string is malformed for the target chain.
    #[error("invalid address '{address}': {reason}")]
    AddressParse { address: String, reason: String },

    /// Node could not be reached (transport failure or timeout).
    #[error("RPC unavailable: {0}")]
    RpcUnavailable(String),

    /// Node answered but does not know the transaction (yet).
    #[error("transaction not found: {0}")]
    NotFound(String),

    /// No derived keypair can sign for the requested chain/address.
    #[error("signing key missing: {0}")]
    SigningKeyMissing(String),

    /// Node explicitly refused the transaction; message is the node's own.
    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    /// Poller gave up without seeing the transaction.
    #[error("lookup exhausted after {attempts} attempts")]
    LookupExhausted { attempts: u32 },

    /// Unit conversion left the representable range.
    #[error("amount out of range: {0}")]
    AmountOverflow(String),

    /// Amount is negative or otherwise unusable.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Estimated fee exceeds the configured ceiling.
    #[error("gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    FeeCapExceeded { current_gwei: u128, max_gwei: u64 },

    /// The pricing collaborator could not produce a rate.
    #[error("pricing unavailable: {0}")]
    PricingUnavailable(String),

    /// A status change would move an execution backwards or out of a terminal state.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Caller cancelled the operation between attempts.
    #[error("operation cancelled")]
    Cancelled,

    /// Node response did not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ErrorKind {
    /// Whether re-running the whole affected stage may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::RpcUnavailable(_) | ErrorKind::LookupExhausted { .. }
        )
    }

    /// Tag this error with the stage and chain it occurred in.
    pub fn at(self, stage: Stage, chain: Option<Chain>) -> SwapError {
        SwapError {
            stage,
            chain,
            kind: self,
        }
    }
}

/// An [`ErrorKind`] tagged with where it happened.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{stage} failed{}: {kind}", .chain.map(|c| format!(" on {}", c)).unwrap_or_default())]
pub struct SwapError {
    pub stage: Stage,
    pub chain: Option<Chain>,
    #[source]
    pub kind: ErrorKind,
}

impl SwapError {
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Result of an adapter or helper call.
pub type ChainResult<T> = Result<T, ErrorKind>;

/// Result of a pipeline operation.
pub type SwapResult<T> = Result<T, SwapError>;

/// Attach stage/chain tags to a [`ChainResult`].
pub trait StageExt<T> {
    fn at(self, stage: Stage, chain: Chain) -> SwapResult<T>;
}

impl<T> StageExt<T> for ChainResult<T> {
    fn at(self, stage: Stage, chain: Chain) -> SwapResult<T> {
        self.map_err(|kind| kind.at(stage, Some(chain)))
    }
}
