// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use droplet_json_rpc_types::{
    Balance, DevInspectResults, EventFilter, EventID, EventOrder, EventPage, ObjectData,
    ObjectDataOptions, ObjectResponse,
};
use droplet_types::transaction::{ProgrammableTransactionBuilder, TransactionKind};
use droplet_types::{
    DropletId, ObjectAddress, TypeTag, CLOCK_INITIAL_SHARED_VERSION, CLOCK_OBJECT_ID,
};
use std::collections::HashMap;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::DropletClientConfig;
use crate::error::{DropletError, DropletResult};
use crate::jsonrpc_client::DropletJsonRpcClient;
use crate::metrics::DropletMetrics;
use crate::retry_with_max_elapsed_time;
use crate::transaction_builder::{
    build_find_droplet_tx, build_user_activity_summary_tx, MoveCallTx, TxArg,
};

const METHOD_QUERY_EVENTS: &str = "suix_queryEvents";
const METHOD_DEV_INSPECT: &str = "sui_devInspectTransactionBlock";
const METHOD_GET_OBJECT: &str = "sui_getObject";
const METHOD_GET_ALL_BALANCES: &str = "suix_getAllBalances";

pub struct DropletClient<P> {
    inner: P,
    config: Arc<DropletClientConfig>,
    metrics: Arc<DropletMetrics>,
    // Initial shared versions never change once an object is shared
    shared_versions: Mutex<HashMap<ObjectAddress, u64>>,
}

pub type DropletRpcClient = DropletClient<DropletJsonRpcClient>;

impl DropletRpcClient {
    pub fn new(config: Arc<DropletClientConfig>, metrics: Arc<DropletMetrics>) -> Self {
        let inner = DropletJsonRpcClient::new(config.rpc_url());
        Self::with_inner(inner, config, metrics)
    }
}

impl<P> DropletClient<P>
where
    P: DropletClientInner,
{
    pub fn with_inner(
        inner: P,
        config: Arc<DropletClientConfig>,
        metrics: Arc<DropletMetrics>,
    ) -> Self {
        Self {
            inner,
            config,
            metrics,
            shared_versions: Mutex::new(HashMap::new()),
        }
    }

    pub fn new_for_testing(inner: P) -> Self {
        Self::with_inner(
            inner,
            Arc::new(DropletClientConfig::default()),
            Arc::new(DropletMetrics::new_for_testing()),
        )
    }

    pub fn config(&self) -> &DropletClientConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<DropletMetrics> {
        &self.metrics
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    async fn metered<T, E, F>(&self, method: &'static str, fut: F) -> DropletResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.metrics.rpc_queries.with_label_values(&[method]).inc();
        let timer = self
            .metrics
            .rpc_queries_latency
            .with_label_values(&[method])
            .start_timer();
        let result = fut.await;
        timer.observe_duration();
        result.map_err(|e| {
            self.metrics.rpc_errors.with_label_values(&[method]).inc();
            DropletError::RpcError(format!("{method}: {e}"))
        })
    }

    /// Read one page of droplet module events.
    pub async fn query_events(
        &self,
        cursor: Option<EventID>,
        limit: u32,
        order: EventOrder,
    ) -> DropletResult<EventPage> {
        let filter = EventFilter::move_module(self.config.package_id, self.config.module.clone());
        self.metered(
            METHOD_QUERY_EVENTS,
            self.inner.query_events(filter, cursor, limit, order),
        )
        .await
    }

    pub async fn get_object(&self, id: ObjectAddress) -> DropletResult<ObjectData> {
        let options = ObjectDataOptions::new().with_type().with_owner();
        let response: ObjectResponse = self
            .metered(METHOD_GET_OBJECT, self.inner.get_object(id, options))
            .await?;
        response
            .data
            .ok_or_else(|| DropletError::DropletNotFound(id.to_string()))
    }

    pub async fn get_all_balances(&self, owner: ObjectAddress) -> DropletResult<Vec<Balance>> {
        self.metered(METHOD_GET_ALL_BALANCES, self.inner.get_all_balances(owner))
            .await
    }

    /// Initial shared version of a shared object, looked up once per object
    pub async fn shared_object_version(&self, id: ObjectAddress) -> DropletResult<u64> {
        if id == CLOCK_OBJECT_ID {
            return Ok(CLOCK_INITIAL_SHARED_VERSION);
        }
        if let Some(version) = self.shared_versions.lock().await.get(&id) {
            return Ok(*version);
        }
        let object = self.get_object(id).await?;
        let version = object.initial_shared_version().ok_or_else(|| {
            DropletError::InvalidInput(format!("Object {id} is not a shared object"))
        })?;
        self.shared_versions.lock().await.insert(id, version);
        Ok(version)
    }

    /// Translate a move call into a programmable transaction for read-only
    /// execution. Objects are passed as immutable shared inputs.
    pub async fn to_transaction_kind(&self, tx: &MoveCallTx) -> DropletResult<TransactionKind> {
        let mut builder = ProgrammableTransactionBuilder::new();
        let mut arguments = Vec::with_capacity(tx.arguments.len());
        for arg in &tx.arguments {
            let argument = match arg {
                TxArg::Object(id) => {
                    let version = self.shared_object_version(*id).await?;
                    builder.shared_object(*id, version, false)
                }
                TxArg::Pure(pure) => {
                    let bytes = pure.to_bcs_bytes()?;
                    builder.pure_bytes(bytes)
                }
                TxArg::CoinWithBalance { .. } => {
                    return Err(DropletError::InvalidInput(format!(
                        "{} cannot be executed read-only: coin inputs need a wallet",
                        tx.target()
                    )))
                }
            }
            .map_err(|e| DropletError::InternalError(e.to_string()))?;
            arguments.push(argument);
        }
        let type_arguments = tx
            .type_arguments
            .iter()
            .map(|t| TypeTag::from_str(t))
            .collect::<Result<Vec<_>, _>>()?;
        builder
            .move_call(
                tx.package,
                tx.module.clone(),
                tx.function.clone(),
                type_arguments,
                arguments,
            )
            .map_err(|e| DropletError::InternalError(e.to_string()))?;
        Ok(TransactionKind::ProgrammableTransaction(builder.finish()))
    }

    /// Execute a move call without committing it and return its raw results.
    /// An execution error reported by the node is returned as a transaction error.
    pub async fn dev_inspect(
        &self,
        sender: ObjectAddress,
        tx: &MoveCallTx,
    ) -> DropletResult<DevInspectResults> {
        let kind = self.to_transaction_kind(tx).await?;
        let results = self
            .metered(
                METHOD_DEV_INSPECT,
                self.inner.dev_inspect_transaction(sender, kind),
            )
            .await?;
        if let Some(error) = &results.error {
            debug!("[DropletClient] {} aborted: {}", tx.target(), error);
            return Err(DropletError::from_transaction_error(error.clone()));
        }
        Ok(results)
    }

    /// Raw results of `find_droplet_by_id`; decoding is left to the caller
    pub async fn find_droplet_by_id(&self, droplet_id: &DropletId) -> DropletResult<DevInspectResults> {
        let tx = build_find_droplet_tx(&self.config, droplet_id);
        self.dev_inspect(ObjectAddress::ZERO, &tx).await
    }

    pub async fn get_user_activity_summary(
        &self,
        user: ObjectAddress,
    ) -> DropletResult<DevInspectResults> {
        let tx = build_user_activity_summary_tx(&self.config, user);
        self.dev_inspect(user, &tx).await
    }

    /// Aggregate read retried with backoff for up to `max_elapsed`.
    pub async fn get_user_activity_summary_with_retry(
        &self,
        user: ObjectAddress,
        max_elapsed: Duration,
    ) -> DropletResult<DevInspectResults> {
        match retry_with_max_elapsed_time!(self.get_user_activity_summary(user), max_elapsed) {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    "[DropletClient] activity summary for {} failed after retries: {}",
                    user, e
                );
                Err(e)
            }
        }
    }

    /// Coin type of a droplet, read from the generic parameter of its object type
    pub async fn get_droplet_coin_type(&self, droplet: ObjectAddress) -> DropletResult<String> {
        let object = self.get_object(droplet).await?;
        let type_string = object.type_.ok_or_else(|| {
            DropletError::DecodeError(format!("Object {droplet} was returned without a type"))
        })?;
        droplet_types::type_tag::outer_type_argument(&type_string)
            .map(str::to_string)
            .ok_or_else(|| {
                DropletError::DecodeError(format!(
                    "Object type `{type_string}` has no coin type parameter"
                ))
            })
    }
}

/// Ledger RPC surface used by [`DropletClient`]
#[async_trait]
pub trait DropletClientInner: Send + Sync {
    type Error: Into<anyhow::Error> + Send + Sync + std::error::Error + 'static;

    async fn query_events(
        &self,
        filter: EventFilter,
        cursor: Option<EventID>,
        limit: u32,
        order: EventOrder,
    ) -> Result<EventPage, Self::Error>;

    async fn dev_inspect_transaction(
        &self,
        sender: ObjectAddress,
        kind: TransactionKind,
    ) -> Result<DevInspectResults, Self::Error>;

    async fn get_object(
        &self,
        id: ObjectAddress,
        options: ObjectDataOptions,
    ) -> Result<ObjectResponse, Self::Error>;

    async fn get_all_balances(&self, owner: ObjectAddress) -> Result<Vec<Balance>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_client::DropletMockClient;
    use crate::transaction_builder::{build_claim_tx, FN_FIND_DROPLET_BY_ID};
    use droplet_json_rpc_types::{Owner, Page};
    use droplet_types::transaction::{CallArg, Command, ObjectArg};

    fn shared_registry(mock: &DropletMockClient, version: u64) {
        let config = DropletClientConfig::default();
        mock.add_object(ObjectData {
            object_id: config.registry_id,
            version: 100,
            digest: "d".to_string(),
            type_: Some("0x1::dropnew::Registry".to_string()),
            owner: Some(Owner::Shared {
                initial_shared_version: version,
            }),
        });
    }

    #[tokio::test]
    async fn test_query_events_passes_filter_and_cursor() {
        let mock = DropletMockClient::default();
        let cursor = EventID::new("tx1", 0);
        mock.add_event_page(Some(cursor.clone()), Page::empty());
        let client = DropletClient::new_for_testing(mock.clone());

        let page = client
            .query_events(Some(cursor.clone()), 50, EventOrder::Ascending)
            .await
            .unwrap();
        assert!(page.data.is_empty());
        let calls = mock.event_queries();
        assert_eq!(calls, vec![(Some(cursor), 50, EventOrder::Ascending)]);
    }

    #[tokio::test]
    async fn test_find_droplet_builds_shared_inputs() {
        let mock = DropletMockClient::default();
        shared_registry(&mock, 77);
        let id = DropletId::from_str("A1B2C3").unwrap();
        mock.set_find_result(&id, Ok(DevInspectResults::for_testing(vec![vec![0]])));
        let client = DropletClient::new_for_testing(mock.clone());

        let results = client.find_droplet_by_id(&id).await.unwrap();
        assert_eq!(results.return_value(0), Some(&[0u8][..]));

        let kinds = mock.inspected_transactions();
        assert_eq!(kinds.len(), 1);
        let TransactionKind::ProgrammableTransaction(pt) = &kinds[0];
        assert_eq!(
            pt.inputs[0],
            CallArg::Object(ObjectArg::SharedObject {
                id: client.config().registry_id,
                initial_shared_version: 77,
                mutable: false,
            })
        );
        assert_eq!(pt.inputs[1], CallArg::Pure(bcs::to_bytes("A1B2C3").unwrap()));
        let Command::MoveCall(call) = &pt.commands[0];
        assert_eq!(call.function, FN_FIND_DROPLET_BY_ID);

        // The registry version lookup is cached
        client.find_droplet_by_id(&id).await.unwrap();
        assert_eq!(mock.object_lookups(), 1);
    }

    #[tokio::test]
    async fn test_dev_inspect_error_is_mapped() {
        let mock = DropletMockClient::default();
        shared_registry(&mock, 1);
        let id = DropletId::from_str("ZZZZZZ").unwrap();
        mock.set_find_result(
            &id,
            Ok(DevInspectResults {
                error: Some("MoveAbort ... E_DROPLET_NOT_FOUND".to_string()),
                ..Default::default()
            }),
        );
        let client = DropletClient::new_for_testing(mock);
        let err = client.find_droplet_by_id(&id).await.unwrap_err();
        assert_eq!(err.error_type(), "abort_droplet_not_found");
    }

    #[tokio::test]
    async fn test_rpc_failure_is_counted() {
        let mock = DropletMockClient::default();
        shared_registry(&mock, 1);
        let id = DropletId::from_str("ZZZZZZ").unwrap();
        mock.set_find_result(&id, Err("connection reset".to_string()));
        let client = DropletClient::new_for_testing(mock);
        let err = client.find_droplet_by_id(&id).await.unwrap_err();
        assert!(matches!(err, DropletError::RpcError(_)));
        assert_eq!(
            client
                .metrics()
                .rpc_errors
                .with_label_values(&[METHOD_DEV_INSPECT])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_coin_inputs_rejected_for_read_only() {
        let client = DropletClient::new_for_testing(DropletMockClient::default());
        let tx = crate::transaction_builder::build_create_droplet_tx(
            client.config(),
            "0x2::sui::SUI",
            1,
            1,
            None,
            "",
        );
        let err = client.to_transaction_kind(&tx).await.unwrap_err();
        assert!(matches!(err, DropletError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_owned_object_rejected_for_read_only() {
        let mock = DropletMockClient::default();
        shared_registry(&mock, 1);
        let droplet = ObjectAddress::new([4; 32]);
        mock.add_object(ObjectData {
            object_id: droplet,
            version: 1,
            digest: "d".to_string(),
            type_: None,
            owner: Some(Owner::AddressOwner(ObjectAddress::new([1; 32]))),
        });
        let client = DropletClient::new_for_testing(mock);
        let id = DropletId::from_str("A1B2C3").unwrap();
        let tx = build_claim_tx(client.config(), droplet, &id, "bob", "0x2::sui::SUI");
        assert!(client.to_transaction_kind(&tx).await.is_err());
    }

    #[tokio::test]
    async fn test_droplet_coin_type() {
        let mock = DropletMockClient::default();
        let droplet = ObjectAddress::new([5; 32]);
        mock.add_object(ObjectData {
            object_id: droplet,
            version: 3,
            digest: "d".to_string(),
            type_: Some("0x16c8::dropnew::Droplet<0xabc::usdc::USDC>".to_string()),
            owner: Some(Owner::Shared {
                initial_shared_version: 3,
            }),
        });
        let client = DropletClient::new_for_testing(mock);
        assert_eq!(
            client.get_droplet_coin_type(droplet).await.unwrap(),
            "0xabc::usdc::USDC"
        );
        // Unknown object
        assert!(matches!(
            client
                .get_droplet_coin_type(ObjectAddress::new([6; 32]))
                .await
                .unwrap_err(),
            DropletError::DropletNotFound(_)
        ));
    }
}
