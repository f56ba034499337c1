//! Shared utilities for integration tests: a scriptable JSON-RPC node.

#![allow(dead_code)]

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// Reply from a scripted node: a `result` or a JSON-RPC `error` object.
pub enum Reply {
    Result(Value),
    Error { code: i64, message: String },
}

type Handler = dyn Fn(&str, &Value) -> Reply + Send + Sync;

#[derive(Clone)]
struct NodeState {
    handler: Arc<Handler>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

/// A running mock node.
pub struct MockNode {
    pub url: String,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl MockNode {
    /// Every `(method, params)` received, in order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls().iter().filter(|(m, _)| m == method).count()
    }
}

/// Start a JSON-RPC 2.0 node on an ephemeral port.
///
/// `handler` sees the method name and params of each request; the id is
/// echoed back.
pub async fn start_rpc_node<F>(handler: F) -> MockNode
where
    F: Fn(&str, &Value) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let state = NodeState {
        handler: Arc::new(handler),
        calls: calls.clone(),
    };

    let app = Router::new().route("/", post(rpc)).with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockNode {
        url: format!("http://{}", addr),
        calls,
    }
}

async fn rpc(State(state): State<NodeState>, Json(request): Json<Value>) -> Json<Value> {
    let method = request["method"].as_str().unwrap_or_default().to_string();
    let params = request.get("params").cloned().unwrap_or(Value::Null);
    state
        .calls
        .lock()
        .unwrap()
        .push((method.clone(), params.clone()));

    let id = request.get("id").cloned().unwrap_or(json!(1));
    let body = match (state.handler)(&method, &params) {
        Reply::Result(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Reply::Error { code, message } => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": code, "message": message }
        }),
    };
    Json(body)
}

pub const PHRASE: &str = "indoor dish desk flag debris potato excuse depart ticket judge file exit";
pub const ETH_POOL: &str = "0x3f1Eae7D46d88F08fc2F8ed27FCb2AB183EB2d0E";
pub const SOL_POOL: &str = "9HM9gySNkt5z2te9wgJ4s777jciQb451Pp4nbQ1Gnf45";
pub const ETH_DEST: &str = "0x9858EfFD232B4033E47d90003D41EC34EcaEda94";
pub const SOL_DEST: &str = "DvWFKfpfYkBupFCG1eKLkfhmij4UgdcsRHPvLTVy9Krr";
/// base58 of 32 bytes of 0x07.
pub const BLOCKHASH: &str = "US517G5965aydkZ46HS38QLi7UQiSojurfbQfKCELFx";

/// A well-behaved Ethereum dev node on chain 1337 with pending nonce 5.
pub fn ethereum_dev_node(method: &str, params: &Value) -> Reply {
    match method {
        "eth_chainId" => Reply::Result(json!("0x539")),
        "eth_getTransactionCount" => Reply::Result(json!("0x5")),
        "eth_gasPrice" => Reply::Result(json!("0x4a817c800")),
        "eth_getBalance" => Reply::Result(json!("0xde0b6b3a7640000")),
        "eth_getTransactionByHash" => Reply::Result(Value::Null),
        "eth_sendRawTransaction" => {
            let raw = alloy::hex::decode(params[0].as_str().unwrap_or_default()).unwrap_or_default();
            Reply::Result(json!(alloy::primitives::keccak256(&raw).to_string()))
        }
        _ => Reply::Error {
            code: -32601,
            message: "method not found".into(),
        },
    }
}
