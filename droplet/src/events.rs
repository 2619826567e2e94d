// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Typed droplet module events, decoded from the node's parsed JSON payload.

use crate::error::{DropletError, DropletResult};
use droplet_json_rpc_types::{DropletEventView, EventID};
use droplet_types::{DropletId, ObjectAddress};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

type U64Str = PickFirst<(DisplayFromStr, serde_with::Same)>;

pub const DROPLET_CREATED: &str = "DropletCreated";
pub const DROPLET_CLAIMED: &str = "DropletClaimed";
pub const DROPLET_CLOSED: &str = "DropletClosed";
pub const FEE_PERCENTAGE_UPDATED: &str = "FeePercentageUpdated";

/// Close reason reported when every slot has been claimed
pub const CLOSE_REASON_COMPLETED: &str = "completed";

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropletCreated {
    pub droplet_id: DropletId,
    pub sender: ObjectAddress,
    // Amount escrowed after the platform fee
    #[serde_as(as = "Option<U64Str>")]
    pub net_amount: Option<u64>,
    #[serde_as(as = "Option<U64Str>")]
    pub total_amount: Option<u64>,
    #[serde_as(as = "U64Str")]
    pub receiver_limit: u64,
    // Milliseconds since the epoch
    #[serde_as(as = "U64Str")]
    pub expiry_time: u64,
    #[serde(default)]
    pub message: String,
}

impl DropletCreated {
    /// Amount claimable by recipients. Prefers the net amount when both are present.
    pub fn amount(&self) -> u64 {
        self.net_amount.or(self.total_amount).unwrap_or(0)
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropletClaimed {
    pub droplet_id: DropletId,
    pub claimer: ObjectAddress,
    #[serde(default)]
    pub claimer_name: String,
    #[serde_as(as = "U64Str")]
    pub claim_amount: u64,
    #[serde(default)]
    pub message: String,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropletClosed {
    pub droplet_id: DropletId,
    #[serde(default)]
    pub reason: String,
    #[serde_as(as = "Option<U64Str>")]
    pub refund_amount: Option<u64>,
    #[serde_as(as = "Option<U64Str>")]
    pub num_claimers: Option<u64>,
}

impl DropletClosed {
    pub fn is_completed(&self) -> bool {
        self.reason == CLOSE_REASON_COMPLETED
    }
}

/// Fee values are in basis points
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePercentageUpdated {
    #[serde_as(as = "U64Str")]
    pub old_fee: u64,
    #[serde_as(as = "U64Str")]
    pub new_fee: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropletEvent {
    Created(DropletCreated),
    Claimed(DropletClaimed),
    Closed(DropletClosed),
    FeeUpdated(FeePercentageUpdated),
}

impl DropletEvent {
    /// Decode an event view. Returns `Ok(None)` for event types this client
    /// does not track and an error when a tracked event has a bad payload.
    pub fn try_from_view(view: &DropletEventView) -> DropletResult<Option<Self>> {
        let payload = view.parsed_json.clone();
        let event = match view.event_name() {
            DROPLET_CREATED => {
                let created: DropletCreated = serde_json::from_value(payload)?;
                if created.net_amount.is_none() && created.total_amount.is_none() {
                    return Err(DropletError::DecodeError(format!(
                        "{DROPLET_CREATED} {} carries no amount",
                        created.droplet_id
                    )));
                }
                DropletEvent::Created(created)
            }
            DROPLET_CLAIMED => DropletEvent::Claimed(serde_json::from_value(payload)?),
            DROPLET_CLOSED => DropletEvent::Closed(serde_json::from_value(payload)?),
            FEE_PERCENTAGE_UPDATED => DropletEvent::FeeUpdated(serde_json::from_value(payload)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }

    pub fn droplet_id(&self) -> Option<&DropletId> {
        match self {
            DropletEvent::Created(e) => Some(&e.droplet_id),
            DropletEvent::Claimed(e) => Some(&e.droplet_id),
            DropletEvent::Closed(e) => Some(&e.droplet_id),
            DropletEvent::FeeUpdated(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DropletEvent::Created(_) => "created",
            DropletEvent::Claimed(_) => "claimed",
            DropletEvent::Closed(_) => "closed",
            DropletEvent::FeeUpdated(_) => "fee_updated",
        }
    }
}

/// An event together with its ledger identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observed<T> {
    pub id: EventID,
    pub timestamp_ms: Option<u64>,
    pub data: T,
}

impl<T> Observed<T> {
    pub fn new(id: EventID, data: T) -> Self {
        Self {
            id,
            timestamp_ms: None,
            data,
        }
    }
}
