// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

// Async JSON-RPC client for the ledger fullnode, over plain HTTP POST.

use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use base64ct::{Base64, Encoding};
use droplet_json_rpc_types::{
    Balance, DevInspectResults, EventFilter, EventID, EventOrder, EventPage, ObjectDataOptions,
    ObjectResponse,
};
use droplet_types::transaction::TransactionKind;
use droplet_types::ObjectAddress;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::droplet_client::DropletClientInner;

// Resending stops once this much time has passed since the first attempt
const TRANSPORT_RETRY_BUDGET: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum JsonRpcClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP error: {status} - {body}")]
    Http { status: u16, body: String },
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to encode request: {0}")]
    Encode(String),
}

#[derive(Clone, Debug)]
pub struct DropletJsonRpcClient {
    http_client: reqwest::Client,
    rpc_url: String,
    request_id: Arc<AtomicU64>,
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Vec<Value>,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

fn shared_http_client() -> reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT
        .get_or_init(|| {
            reqwest::Client::builder()
                .pool_max_idle_per_host(64)
                .tcp_keepalive(Some(Duration::from_secs(30)))
                .connect_timeout(Duration::from_secs(2))
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|e| {
                    tracing::warn!("[RPC] falling back to default HTTP client: {}", e);
                    reqwest::Client::new()
                })
        })
        .clone()
}

fn transport_backoff() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(50))
        .with_randomization_factor(0.1)
        .with_multiplier(2.0)
        .with_max_interval(Duration::from_millis(400))
        .with_max_elapsed_time(Some(TRANSPORT_RETRY_BUDGET))
        .build()
}

const TRANSIENT_MESSAGES: [&str; 5] = [
    "connection closed",
    "connection reset",
    "broken pipe",
    "unexpected eof",
    "incomplete",
];

fn is_transient_transport_error(err: &reqwest::Error) -> bool {
    if err.is_connect() || err.is_timeout() {
        return true;
    }
    // The underlying hyper or io error carries the useful message
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        let msg = e.to_string().to_lowercase();
        if TRANSIENT_MESSAGES.iter().any(|m| msg.contains(m)) {
            return true;
        }
        source = e.source();
    }
    false
}

pub(crate) fn query_events_params(
    filter: &EventFilter,
    cursor: Option<&EventID>,
    limit: u32,
    order: EventOrder,
) -> Result<Vec<Value>, serde_json::Error> {
    Ok(vec![
        serde_json::to_value(filter)?,
        serde_json::to_value(cursor)?,
        json!(limit),
        json!(order.is_descending()),
    ])
}

pub(crate) fn dev_inspect_params(
    sender: ObjectAddress,
    kind: &TransactionKind,
) -> Result<Vec<Value>, JsonRpcClientError> {
    let bytes = kind
        .to_bcs_bytes()
        .map_err(|e| JsonRpcClientError::Encode(e.to_string()))?;
    Ok(vec![
        json!(sender.to_string()),
        json!(Base64::encode_string(&bytes)),
        Value::Null,
        Value::Null,
    ])
}

impl DropletJsonRpcClient {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            http_client: shared_http_client(),
            rpc_url: rpc_url.into(),
            request_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    async fn call_typed<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, JsonRpcClientError> {
        let value = self.call(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Send one request. Dropped connections and timeouts are resent with
    /// a short exponential backoff; every other failure is returned as is.
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, JsonRpcClientError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id,
        };
        tracing::trace!("[RPC] >>> {} #{}", method, id);

        let request = &request;
        backoff::future::retry(transport_backoff(), || async move {
            self.send(request).await.map_err(|e| match e {
                JsonRpcClientError::Transport(ref err) if is_transient_transport_error(err) => {
                    tracing::debug!("[RPC] {} #{} interrupted, resending: {}", method, id, err);
                    backoff::Error::transient(e)
                }
                e => backoff::Error::permanent(e),
            })
        })
        .await
    }

    async fn send(&self, request: &JsonRpcRequest) -> Result<Value, JsonRpcClientError> {
        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("[RPC] <<< HTTP {} for {}", status, request.method);
            return Err(JsonRpcClientError::Http { status, body });
        }

        let rpc_response: JsonRpcResponse = serde_json::from_str(&response.text().await?)?;
        match rpc_response.error {
            Some(error) => {
                tracing::debug!(
                    "[RPC] <<< {} failed with {}: {}",
                    request.method,
                    error.code,
                    error.message
                );
                Err(JsonRpcClientError::Rpc {
                    code: error.code,
                    message: error.message,
                })
            }
            None => Ok(rpc_response.result.unwrap_or(Value::Null)),
        }
    }
}

#[async_trait]
impl DropletClientInner for DropletJsonRpcClient {
    type Error = JsonRpcClientError;

    async fn query_events(
        &self,
        filter: EventFilter,
        cursor: Option<EventID>,
        limit: u32,
        order: EventOrder,
    ) -> Result<EventPage, Self::Error> {
        let params = query_events_params(&filter, cursor.as_ref(), limit, order)?;
        self.call_typed("suix_queryEvents", params).await
    }

    async fn dev_inspect_transaction(
        &self,
        sender: ObjectAddress,
        kind: TransactionKind,
    ) -> Result<DevInspectResults, Self::Error> {
        let params = dev_inspect_params(sender, &kind)?;
        self.call_typed("sui_devInspectTransactionBlock", params)
            .await
    }

    async fn get_object(
        &self,
        id: ObjectAddress,
        options: ObjectDataOptions,
    ) -> Result<ObjectResponse, Self::Error> {
        let params = vec![json!(id.to_string()), serde_json::to_value(options)?];
        self.call_typed("sui_getObject", params).await
    }

    async fn get_all_balances(&self, owner: ObjectAddress) -> Result<Vec<Balance>, Self::Error> {
        self.call_typed("suix_getAllBalances", vec![json!(owner.to_string())])
            .await
    }
}
