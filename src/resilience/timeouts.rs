//! Timeout enforcement for outbound RPC calls.
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - An elapsed deadline is reported as `RpcUnavailable`, same as a dead node

use std::future::Future;
use std::time::Duration;

use crate::error::{ChainResult, ErrorKind};

/// Run `fut` with a deadline of `limit`.
pub async fn with_timeout<T, F>(limit: Duration, operation: &str, fut: F) -> ChainResult<T>
where
    F: Future<Output = ChainResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                operation = operation,
                timeout_ms = limit.as_millis() as u64,
                "RPC timeout"
            );
            Err(ErrorKind::RpcUnavailable(format!(
                "{} timed out after {:?}",
                operation, limit
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_elapsed_maps_to_rpc_unavailable() {
        let result: ChainResult<()> = with_timeout(Duration::from_millis(10), "getSlot", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        let err = result.unwrap_err();
        assert!(matches!(err, ErrorKind::RpcUnavailable(_)));
        assert!(err.to_string().contains("getSlot"));
    }

    #[tokio::test]
    async fn test_inner_result_passes_through() {
        let ok = with_timeout(Duration::from_secs(1), "op", async { Ok(7u8) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: ChainResult<u8> = with_timeout(Duration::from_secs(1), "op", async {
            Err(ErrorKind::NotFound("tx".into()))
        })
        .await;
        assert!(matches!(err, Err(ErrorKind::NotFound(_))));
    }
}
