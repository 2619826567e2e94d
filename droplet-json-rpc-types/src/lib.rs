// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

// Wire types for the ledger JSON-RPC endpoints used by the droplet client

use droplet_types::ObjectAddress;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

// The node renders most integers as strings; accept either form
type U64Str = PickFirst<(DisplayFromStr, serde_with::Same)>;

/// Event ID: transaction digest plus position of the event in that transaction.
/// Doubles as the pagination cursor for `suix_queryEvents`.
#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct EventID {
    pub tx_digest: String,
    #[serde_as(as = "U64Str")]
    pub event_seq: u64,
}

impl EventID {
    pub fn new(tx_digest: impl Into<String>, event_seq: u64) -> Self {
        Self {
            tx_digest: tx_digest.into(),
            event_seq,
        }
    }
}

/// Move event as returned by the node
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DropletEventView {
    #[serde(default)]
    pub id: EventID,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_id: Option<ObjectAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<ObjectAddress>,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub parsed_json: serde_json::Value,
    #[serde_as(as = "Option<U64Str>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
}

impl DropletEventView {
    /// Struct name of the event type, e.g. `DropletCreated` for
    /// `0x..::dropnew::DropletCreated`
    pub fn event_name(&self) -> &str {
        let base = self.type_.split('<').next().unwrap_or(&self.type_);
        base.rsplit("::").next().unwrap_or(base)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T, C> {
    pub data: Vec<T>,
    pub next_cursor: Option<C>,
    pub has_next_page: bool,
}

impl<T, C> Page<T, C> {
    pub fn empty() -> Self {
        Self {
            data: vec![],
            next_cursor: None,
            has_next_page: false,
        }
    }
}

pub type EventPage = Page<DropletEventView, EventID>;

/// Event query filter. Only module-scoped queries are used.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventFilter {
    MoveModule {
        package: ObjectAddress,
        module: String,
    },
}

impl EventFilter {
    pub fn move_module(package: ObjectAddress, module: impl Into<String>) -> Self {
        EventFilter::MoveModule {
            package,
            module: module.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventOrder {
    Ascending,
    #[default]
    Descending,
}

impl EventOrder {
    pub fn is_descending(self) -> bool {
        matches!(self, EventOrder::Descending)
    }
}

// =============================================================================
// Read-only execution
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    #[serde(default)]
    pub return_values: Vec<(Vec<u8>, String)>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevInspectResults {
    #[serde(default)]
    pub effects: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub results: Option<Vec<ExecutionResult>>,
}

impl DevInspectResults {
    /// Return value `index` of the first command
    pub fn return_value(&self, index: usize) -> Option<&[u8]> {
        self.results
            .as_ref()?
            .first()?
            .return_values
            .get(index)
            .map(|(bytes, _)| bytes.as_slice())
    }

    pub fn for_testing(return_values: Vec<Vec<u8>>) -> Self {
        Self {
            effects: None,
            error: None,
            results: Some(vec![ExecutionResult {
                return_values: return_values
                    .into_iter()
                    .map(|bytes| (bytes, String::new()))
                    .collect(),
            }]),
        }
    }
}

// =============================================================================
// Objects
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDataOptions {
    pub show_type: bool,
    pub show_owner: bool,
    pub show_content: bool,
}

impl ObjectDataOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self) -> Self {
        self.show_type = true;
        self
    }

    pub fn with_owner(mut self) -> Self {
        self.show_owner = true;
        self
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Owner {
    AddressOwner(ObjectAddress),
    ObjectOwner(ObjectAddress),
    Shared {
        #[serde_as(as = "U64Str")]
        initial_shared_version: u64,
    },
    Immutable,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectData {
    pub object_id: ObjectAddress,
    #[serde_as(as = "U64Str")]
    pub version: u64,
    pub digest: String,
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub owner: Option<Owner>,
}

impl ObjectData {
    pub fn initial_shared_version(&self) -> Option<u64> {
        match self.owner {
            Some(Owner::Shared {
                initial_shared_version,
            }) => Some(initial_shared_version),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectResponse {
    #[serde(default)]
    pub data: Option<ObjectData>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

// =============================================================================
// Balances
// =============================================================================

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub coin_type: String,
    #[serde(default)]
    pub coin_object_count: u64,
    #[serde_as(as = "PickFirst<(DisplayFromStr, serde_with::Same)>")]
    pub total_balance: u128,
}

// =============================================================================
// Transaction results
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failure { error: String },
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    pub object_id: ObjectAddress,
    #[serde_as(as = "U64Str")]
    pub version: u64,
    pub digest: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnedObjectRef {
    #[serde(default)]
    pub owner: serde_json::Value,
    pub reference: ObjectRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBlockEffects {
    pub status: ExecutionStatus,
    #[serde(default)]
    pub created: Vec<OwnedObjectRef>,
    /// Some wallets inline the emitted events into the effects payload
    #[serde(default)]
    pub events: Vec<DropletEventView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ObjectChange {
    #[serde(rename_all = "camelCase")]
    Created {
        object_id: ObjectAddress,
        object_type: String,
    },
    #[serde(rename_all = "camelCase")]
    Mutated {
        object_id: ObjectAddress,
        object_type: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionBlockResponse {
    pub digest: String,
    #[serde(default)]
    pub effects: Option<TransactionBlockEffects>,
    #[serde(default)]
    pub events: Option<Vec<DropletEventView>>,
    #[serde(default)]
    pub object_changes: Option<Vec<ObjectChange>>,
}

impl TransactionBlockResponse {
    pub fn new(digest: impl Into<String>) -> Self {
        Self {
            digest: digest.into(),
            ..Default::default()
        }
    }

    pub fn status_ok(&self) -> Option<bool> {
        self.effects
            .as_ref()
            .map(|e| matches!(e.status, ExecutionStatus::Success))
    }

    /// Events from the top-level list first, then from the effects payload
    pub fn all_events(&self) -> impl Iterator<Item = &DropletEventView> {
        self.events
            .iter()
            .flatten()
            .chain(self.effects.iter().flat_map(|e| e.events.iter()))
    }

    /// Created object ids, from effects first, then from object changes
    pub fn created_object_ids(&self) -> Vec<ObjectAddress> {
        let from_effects = self
            .effects
            .iter()
            .flat_map(|e| e.created.iter())
            .map(|o| o.reference.object_id);
        let from_changes = self.object_changes.iter().flatten().filter_map(|c| match c {
            ObjectChange::Created { object_id, .. } => Some(*object_id),
            _ => None,
        });
        let mut ids: Vec<ObjectAddress> = Vec::new();
        for id in from_effects.chain(from_changes) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PKG: &str = "0x16c8dd907e254555c7a5d592f7b10b6040e19d07be94fc4adc6cdb7138011a55";

    #[test]
    fn test_event_page_from_node_json() {
        let raw = json!({
            "data": [{
                "id": {"txDigest": "9xQ1", "eventSeq": "0"},
                "packageId": PKG,
                "transactionModule": "dropnew",
                "sender": "0x2",
                "type": format!("{PKG}::dropnew::DropletCreated"),
                "parsedJson": {"droplet_id": "A1B2C3", "net_amount": "1000000000"},
                "bcs": "abc",
                "timestampMs": "1700000000000"
            }],
            "nextCursor": {"txDigest": "9xQ1", "eventSeq": "0"},
            "hasNextPage": false
        });
        let page: EventPage = serde_json::from_value(raw).unwrap();
        assert_eq!(page.data.len(), 1);
        let event = &page.data[0];
        assert_eq!(event.event_name(), "DropletCreated");
        assert_eq!(event.timestamp_ms, Some(1_700_000_000_000));
        assert_eq!(event.parsed_json["droplet_id"], "A1B2C3");
        assert_eq!(page.next_cursor, Some(EventID::new("9xQ1", 0)));
        assert!(!page.has_next_page);
    }

    #[test]
    fn test_event_name_strips_generics() {
        let event = DropletEventView {
            id: EventID::default(),
            package_id: None,
            transaction_module: None,
            sender: None,
            type_: "0x1::dropnew::DropletClosed<0x2::sui::SUI>".to_string(),
            parsed_json: json!({}),
            timestamp_ms: None,
        };
        assert_eq!(event.event_name(), "DropletClosed");
    }

    #[test]
    fn test_filter_and_cursor_encoding() {
        let filter = EventFilter::move_module(ObjectAddress::from_u8_suffix(1), "dropnew");
        let value = serde_json::to_value(&filter).unwrap();
        assert_eq!(value["MoveModule"]["module"], "dropnew");
        assert!(value["MoveModule"]["package"]
            .as_str()
            .unwrap()
            .ends_with("01"));

        let cursor = serde_json::to_value(EventID::new("abc", 3)).unwrap();
        assert_eq!(cursor, json!({"txDigest": "abc", "eventSeq": "3"}));
    }

    #[test]
    fn test_shared_object_owner() {
        let raw = json!({
            "data": {
                "objectId": "0x8ceec78670c97b8b01a0d50566a85177b8f910527759d93ef50486ef8c10f2e1",
                "version": "120",
                "digest": "D1g",
                "type": format!("{PKG}::dropnew::DropletRegistry"),
                "owner": {"Shared": {"initial_shared_version": 33}}
            }
        });
        let resp: ObjectResponse = serde_json::from_value(raw).unwrap();
        let data = resp.data.unwrap();
        assert_eq!(data.version, 120);
        assert_eq!(data.initial_shared_version(), Some(33));
    }

    #[test]
    fn test_owned_object_has_no_shared_version() {
        let raw = json!({
            "objectId": "0x5",
            "version": 1,
            "digest": "x",
            "owner": {"AddressOwner": "0x2"}
        });
        let data: ObjectData = serde_json::from_value(raw).unwrap();
        assert_eq!(data.initial_shared_version(), None);
    }

    #[test]
    fn test_dev_inspect_return_value() {
        let raw = json!({
            "effects": {},
            "results": [{"returnValues": [[[1, 2, 3], "0x1::option::Option<address>"]]}]
        });
        let results: DevInspectResults = serde_json::from_value(raw).unwrap();
        assert_eq!(results.return_value(0), Some(&[1u8, 2, 3][..]));
        assert_eq!(results.return_value(1), None);
        assert_eq!(DevInspectResults::default().return_value(0), None);
    }

    #[test]
    fn test_balance_parses_string_amount() {
        let raw = json!([
            {"coinType": "0x2::sui::SUI", "coinObjectCount": 2, "totalBalance": "1500000000"}
        ]);
        let balances: Vec<Balance> = serde_json::from_value(raw).unwrap();
        assert_eq!(balances[0].total_balance, 1_500_000_000);
    }

    #[test]
    fn test_transaction_response_helpers() {
        let raw = json!({
            "digest": "Tx1",
            "effects": {
                "status": {"status": "success"},
                "created": [{
                    "owner": {"Shared": {"initial_shared_version": 9}},
                    "reference": {"objectId": "0xabc123", "version": 9, "digest": "d"}
                }]
            },
            "objectChanges": [
                {"type": "created", "objectId": "0xabc123", "objectType": "0x1::dropnew::Droplet<0x2::sui::SUI>", "sender": "0x2"},
                {"type": "created", "objectId": "0xdef", "objectType": "0x2::coin::Coin<0x2::sui::SUI>"},
                {"type": "published", "packageId": "0x9"}
            ]
        });
        let resp: TransactionBlockResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(resp.status_ok(), Some(true));
        let ids = resp.created_object_ids();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].hex_suffix(6), "ABC123");
        assert_eq!(resp.all_events().count(), 0);
    }

    #[test]
    fn test_failed_status() {
        let status: ExecutionStatus =
            serde_json::from_value(json!({"status": "failure", "error": "MoveAbort(..., 3)"}))
                .unwrap();
        assert_eq!(
            status,
            ExecutionStatus::Failure {
                error: "MoveAbort(..., 3)".to_string()
            }
        );
    }
}
