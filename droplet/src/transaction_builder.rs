// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Move call descriptions for the droplet module.
//!
//! A [`MoveCallTx`] names an entry point, its type arguments and typed
//! arguments. It is handed to the wallet for signed submission, or turned
//! into a BCS programmable transaction for read-only execution.

use crate::config::DropletClientConfig;
use droplet_types::{DropletId, ObjectAddress};
use serde::{Deserialize, Serialize};

pub const FN_CREATE_DROPLET: &str = "create_droplet";
pub const FN_CLAIM: &str = "claim_internal";
pub const FN_CLEANUP: &str = "cleanup_droplet";
pub const FN_FIND_DROPLET_BY_ID: &str = "find_droplet_by_id";
pub const FN_USER_ACTIVITY_SUMMARY: &str = "get_user_activity_summary";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PureArg {
    U64(u64),
    OptionU64(Option<u64>),
    String(String),
    Address(ObjectAddress),
}

impl PureArg {
    pub fn to_bcs_bytes(&self) -> Result<Vec<u8>, bcs::Error> {
        match self {
            PureArg::U64(v) => bcs::to_bytes(v),
            PureArg::OptionU64(v) => bcs::to_bytes(v),
            PureArg::String(v) => bcs::to_bytes(v),
            PureArg::Address(v) => bcs::to_bytes(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxArg {
    // Object input; the wallet or node resolves version and ownership
    Object(ObjectAddress),
    Pure(PureArg),
    // A coin of `coin_type` holding exactly `amount`, selected by the wallet
    CoinWithBalance { coin_type: String, amount: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCallTx {
    pub package: ObjectAddress,
    pub module: String,
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<TxArg>,
}

impl MoveCallTx {
    pub fn target(&self) -> String {
        format!("{}::{}::{}", self.package, self.module, self.function)
    }

    /// Action label used for logs and metrics
    pub fn action(&self) -> &str {
        match self.function.as_str() {
            FN_CREATE_DROPLET => "create",
            FN_CLAIM => "claim",
            FN_CLEANUP => "cleanup",
            other => other,
        }
    }
}

fn move_call(
    config: &DropletClientConfig,
    function: &str,
    type_arguments: Vec<String>,
    arguments: Vec<TxArg>,
) -> MoveCallTx {
    MoveCallTx {
        package: config.package_id,
        module: config.module.clone(),
        function: function.to_string(),
        type_arguments,
        arguments,
    }
}

pub fn build_create_droplet_tx(
    config: &DropletClientConfig,
    coin_type: &str,
    amount: u64,
    receiver_limit: u64,
    expiry_hours: Option<u64>,
    message: &str,
) -> MoveCallTx {
    move_call(
        config,
        FN_CREATE_DROPLET,
        vec![coin_type.to_string()],
        vec![
            TxArg::Object(config.registry_id),
            TxArg::Pure(PureArg::U64(amount)),
            TxArg::Pure(PureArg::U64(receiver_limit)),
            TxArg::Pure(PureArg::OptionU64(expiry_hours)),
            TxArg::Pure(PureArg::String(message.to_string())),
            TxArg::CoinWithBalance {
                coin_type: coin_type.to_string(),
                amount,
            },
            TxArg::Object(config.clock_id),
        ],
    )
}

pub fn build_claim_tx(
    config: &DropletClientConfig,
    droplet_address: ObjectAddress,
    droplet_id: &DropletId,
    claimer_name: &str,
    coin_type: &str,
) -> MoveCallTx {
    move_call(
        config,
        FN_CLAIM,
        vec![coin_type.to_string()],
        vec![
            TxArg::Object(config.registry_id),
            TxArg::Object(droplet_address),
            TxArg::Pure(PureArg::String(droplet_id.to_string())),
            TxArg::Pure(PureArg::String(claimer_name.to_string())),
            TxArg::Object(config.clock_id),
        ],
    )
}

pub fn build_cleanup_tx(
    config: &DropletClientConfig,
    droplet_address: ObjectAddress,
    coin_type: &str,
) -> MoveCallTx {
    move_call(
        config,
        FN_CLEANUP,
        vec![coin_type.to_string()],
        vec![
            TxArg::Object(droplet_address),
            TxArg::Object(config.clock_id),
        ],
    )
}

pub fn build_find_droplet_tx(config: &DropletClientConfig, droplet_id: &DropletId) -> MoveCallTx {
    move_call(
        config,
        FN_FIND_DROPLET_BY_ID,
        vec![],
        vec![
            TxArg::Object(config.registry_id),
            TxArg::Pure(PureArg::String(droplet_id.to_string())),
        ],
    )
}

pub fn build_user_activity_summary_tx(
    config: &DropletClientConfig,
    user: ObjectAddress,
) -> MoveCallTx {
    move_call(
        config,
        FN_USER_ACTIVITY_SUMMARY,
        vec![],
        vec![
            TxArg::Object(config.registry_id),
            TxArg::Pure(PureArg::Address(user)),
        ],
    )
}
