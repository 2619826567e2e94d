// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! A mock implementation of the ledger JSON-RPC client.

use async_trait::async_trait;
use droplet_json_rpc_types::{
    Balance, DevInspectResults, EventFilter, EventID, EventOrder, EventPage, ObjectData,
    ObjectDataOptions, ObjectResponse, Page,
};
use droplet_types::transaction::{CallArg, Command, TransactionKind};
use droplet_types::{DropletId, ObjectAddress};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::droplet_client::DropletClientInner;
use crate::transaction_builder::{FN_FIND_DROPLET_BY_ID, FN_USER_ACTIVITY_SUMMARY};

#[derive(Debug, thiserror::Error)]
#[error("mock rpc error: {0}")]
pub struct MockRpcError(pub String);

type EventQuery = (Option<EventID>, u32, EventOrder);
type InspectResult = Result<DevInspectResults, String>;

// Mock client used in test environments.
#[allow(clippy::type_complexity)]
#[derive(Clone, Debug, Default)]
pub struct DropletMockClient {
    events: Arc<Mutex<HashMap<Option<EventID>, EventPage>>>,
    past_event_queries: Arc<Mutex<Vec<EventQuery>>>,
    // Number of upcoming event queries that fail
    failing_event_queries: Arc<AtomicUsize>,
    // Per-call latency for upcoming event queries, consumed in order
    event_query_delays: Arc<Mutex<VecDeque<Duration>>>,

    find_results: Arc<Mutex<HashMap<String, InspectResult>>>,
    find_calls: Arc<Mutex<HashMap<String, usize>>>,
    activity_results: Arc<Mutex<HashMap<ObjectAddress, InspectResult>>>,
    activity_calls: Arc<AtomicUsize>,
    inspect_delay: Arc<Mutex<Option<Duration>>>,
    inspected: Arc<Mutex<Vec<TransactionKind>>>,

    objects: Arc<Mutex<HashMap<ObjectAddress, ObjectData>>>,
    object_lookups: Arc<AtomicUsize>,
    balances: Arc<Mutex<HashMap<ObjectAddress, Vec<Balance>>>>,
}

impl DropletMockClient {
    /// Page returned when querying from `cursor`; `None` is genesis
    pub fn add_event_page(&self, cursor: Option<EventID>, page: EventPage) {
        self.events.lock().unwrap().insert(cursor, page);
    }

    pub fn fail_next_event_queries(&self, count: usize) {
        self.failing_event_queries.store(count, Ordering::SeqCst);
    }

    pub fn push_event_query_delay(&self, delay: Duration) {
        self.event_query_delays.lock().unwrap().push_back(delay);
    }

    pub fn event_queries(&self) -> Vec<EventQuery> {
        self.past_event_queries.lock().unwrap().clone()
    }

    pub fn set_find_result(&self, droplet_id: &DropletId, result: InspectResult) {
        self.find_results
            .lock()
            .unwrap()
            .insert(droplet_id.to_string(), result);
    }

    pub fn find_calls(&self, droplet_id: &DropletId) -> usize {
        self.find_calls
            .lock()
            .unwrap()
            .get(droplet_id.as_str())
            .copied()
            .unwrap_or(0)
    }

    pub fn total_find_calls(&self) -> usize {
        self.find_calls.lock().unwrap().values().sum()
    }

    pub fn set_activity_result(&self, user: ObjectAddress, result: InspectResult) {
        self.activity_results.lock().unwrap().insert(user, result);
    }

    pub fn activity_calls(&self) -> usize {
        self.activity_calls.load(Ordering::SeqCst)
    }

    pub fn set_inspect_delay(&self, delay: Duration) {
        *self.inspect_delay.lock().unwrap() = Some(delay);
    }

    pub fn inspected_transactions(&self) -> Vec<TransactionKind> {
        self.inspected.lock().unwrap().clone()
    }

    pub fn add_object(&self, object: ObjectData) {
        self.objects
            .lock()
            .unwrap()
            .insert(object.object_id, object);
    }

    pub fn object_lookups(&self) -> usize {
        self.object_lookups.load(Ordering::SeqCst)
    }

    pub fn set_balances(&self, owner: ObjectAddress, balances: Vec<Balance>) {
        self.balances.lock().unwrap().insert(owner, balances);
    }

    fn handle_find(&self, pure_arg: &[u8]) -> InspectResult {
        let id: String = bcs::from_bytes(pure_arg).map_err(|e| e.to_string())?;
        *self.find_calls.lock().unwrap().entry(id.clone()).or_default() += 1;
        self.find_results
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            // Unknown ids behave like a registry miss
            .unwrap_or_else(|| Ok(DevInspectResults::for_testing(vec![vec![0]])))
    }

    fn handle_activity(&self, pure_arg: &[u8]) -> InspectResult {
        let user: ObjectAddress = bcs::from_bytes(pure_arg).map_err(|e| e.to_string())?;
        self.activity_calls.fetch_add(1, Ordering::SeqCst);
        self.activity_results
            .lock()
            .unwrap()
            .get(&user)
            .cloned()
            .unwrap_or_else(|| Err(format!("no activity preset for {user}")))
    }
}

#[async_trait]
impl DropletClientInner for DropletMockClient {
    type Error = MockRpcError;

    async fn query_events(
        &self,
        _filter: EventFilter,
        cursor: Option<EventID>,
        limit: u32,
        order: EventOrder,
    ) -> Result<EventPage, Self::Error> {
        self.past_event_queries
            .lock()
            .unwrap()
            .push((cursor.clone(), limit, order));
        let delay = self.event_query_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failing = self.failing_event_queries.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_event_queries
                .store(failing - 1, Ordering::SeqCst);
            return Err(MockRpcError("event query failed".to_string()));
        }
        Ok(self
            .events
            .lock()
            .unwrap()
            .get(&cursor)
            .cloned()
            .unwrap_or_else(Page::empty))
    }

    async fn dev_inspect_transaction(
        &self,
        _sender: ObjectAddress,
        kind: TransactionKind,
    ) -> Result<DevInspectResults, Self::Error> {
        self.inspected.lock().unwrap().push(kind.clone());
        let delay = *self.inspect_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let TransactionKind::ProgrammableTransaction(pt) = kind;
        let Some(Command::MoveCall(call)) = pt.commands.first() else {
            return Err(MockRpcError("no move call".to_string()));
        };
        let pure_arg = pt.inputs.iter().find_map(|input| match input {
            CallArg::Pure(bytes) => Some(bytes.clone()),
            _ => None,
        });
        let Some(pure_arg) = pure_arg else {
            return Err(MockRpcError("no pure argument".to_string()));
        };
        let result = match call.function.as_str() {
            FN_FIND_DROPLET_BY_ID => self.handle_find(&pure_arg),
            FN_USER_ACTIVITY_SUMMARY => self.handle_activity(&pure_arg),
            other => Err(format!("unexpected function {other}")),
        };
        result.map_err(MockRpcError)
    }

    async fn get_object(
        &self,
        id: ObjectAddress,
        _options: ObjectDataOptions,
    ) -> Result<ObjectResponse, Self::Error> {
        self.object_lookups.fetch_add(1, Ordering::SeqCst);
        let data = self.objects.lock().unwrap().get(&id).cloned();
        let error = data
            .is_none()
            .then(|| serde_json::json!({"code": "notExists", "object_id": id.to_string()}));
        Ok(ObjectResponse { data, error })
    }

    async fn get_all_balances(&self, owner: ObjectAddress) -> Result<Vec<Balance>, Self::Error> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(&owner)
            .cloned()
            .unwrap_or_default())
    }
}
