//! Minimal typed JSON-RPC 2.0 client for a Solana node.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::error::{ChainResult, ErrorKind};
use crate::resilience::with_timeout;

/// JSON-RPC error code for malformed parameters.
pub const INVALID_PARAMS: i64 = -32602;

#[derive(Serialize)]
struct Request<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct Response<T> {
    #[serde(default = "Option::default")]
    result: Option<T>,
    #[serde(default)]
    error: Option<NodeError>,
}

/// Error object returned by the node.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NodeError {
    pub code: i64,
    pub message: String,
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Why a call produced no result.
#[derive(Debug)]
pub enum CallError {
    /// The node answered with an error object.
    Node(NodeError),
    /// Transport failure, timeout or unparseable body.
    Unavailable(ErrorKind),
}

impl CallError {
    /// Map to an [`ErrorKind`], treating node errors as unavailability.
    pub fn into_kind(self, method: &str) -> ErrorKind {
        match self {
            CallError::Node(e) => ErrorKind::RpcUnavailable(format!("{} failed: {}", method, e)),
            CallError::Unavailable(kind) => kind,
        }
    }
}

/// A JSON-RPC endpoint with a per-call timeout.
#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl RpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> ChainResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ErrorKind::RpcUnavailable(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            http,
            url: url.into(),
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call `method`; `Ok(None)` when the node returns a `null` result.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, CallError> {
        let request = Request {
            jsonrpc: "2.0",
            id: fastrand::u64(..),
            method,
            params,
        };

        let response = with_timeout(self.timeout, method, async {
            let resp = self
                .http
                .post(&self.url)
                .json(&request)
                .send()
                .await
                .map_err(|e| ErrorKind::RpcUnavailable(format!("{}: {}", method, e)))?;
            let status = resp.status();
            let body = resp
                .text()
                .await
                .map_err(|e| ErrorKind::RpcUnavailable(format!("{}: {}", method, e)))?;
            if !status.is_success() && body.trim().is_empty() {
                return Err(ErrorKind::RpcUnavailable(format!("{}: HTTP {}", method, status)));
            }
            serde_json::from_str::<Response<T>>(&body).map_err(|e| {
                if status.is_success() {
                    ErrorKind::MalformedResponse(format!("{}: {}", method, e))
                } else {
                    ErrorKind::RpcUnavailable(format!("{}: HTTP {}", method, status))
                }
            })
        })
        .await
        .map_err(CallError::Unavailable)?;

        if let Some(error) = response.error {
            tracing::debug!(method, code = error.code, message = %error.message, "Node returned error");
            return Err(CallError::Node(error));
        }
        Ok(response.result)
    }

    /// Call `method` where a `null` result is a protocol violation.
    pub async fn call_required<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> ChainResult<T> {
        self.call(method, params)
            .await
            .map_err(|e| e.into_kind(method))?
            .ok_or_else(|| ErrorKind::MalformedResponse(format!("{} returned null", method)))
    }
}

impl fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcClient")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// `{ context, value }` wrapper used by most Solana read methods.
#[derive(Debug, Deserialize)]
pub struct WithContext<T> {
    pub value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestBlockhash {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    #[serde(default)]
    pub err: Option<Value>,
    pub fee: u64,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiMessage {
    pub account_keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UiTransaction {
    pub signatures: Vec<String>,
    pub message: UiMessage,
}

/// `getTransaction` result with `"encoding": "json"`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedTransaction {
    pub slot: u64,
    #[serde(default)]
    pub block_time: Option<i64>,
    pub meta: Option<TransactionMeta>,
    pub transaction: UiTransaction,
}
