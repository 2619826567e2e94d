// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Input validation and wallet submission for user actions.
//!
//! Validation here is advisory: the contract enforces every rule again.
//! It exists so obviously bad input never costs a wallet round trip.

use droplet_json_rpc_types::{ExecutionStatus, TransactionBlockResponse};
use droplet_types::{DropletId, DROPLET_ID_LENGTH};
use std::str::FromStr;
use tracing::{error, info};

use crate::balances::{to_smallest_unit, CoinBalance};
use crate::error::{DropletError, DropletResult};
use crate::events::DROPLET_CREATED;
use crate::metrics::DropletMetrics;
use crate::transaction_builder::MoveCallTx;
use crate::types::MAX_MESSAGE_CHARS;
use crate::wallet::WalletAdapter;

pub const DEFAULT_MESSAGE: &str = "Airdrop from Sui Drop Hub";
pub const DEFAULT_EXPIRY_HOURS: u64 = 48;
pub const MAX_RECEIVER_LIMIT: u64 = 100_000;

/// Raw create-form input, as typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDropletForm {
    pub amount: String,
    pub receiver_limit: String,
    // Empty means the droplet never expires
    pub expiry_hours: String,
    pub message: String,
    pub coin_type: String,
}

impl Default for CreateDropletForm {
    fn default() -> Self {
        Self {
            amount: String::new(),
            receiver_limit: String::new(),
            expiry_hours: DEFAULT_EXPIRY_HOURS.to_string(),
            message: String::new(),
            coin_type: droplet_types::SUI_COIN_TYPE.to_string(),
        }
    }
}

/// Per-field validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateFormErrors {
    pub amount: Option<String>,
    pub receiver_limit: Option<String>,
    pub expiry_hours: Option<String>,
    pub message: Option<String>,
    pub coin_type: Option<String>,
}

impl CreateFormErrors {
    pub fn is_empty(&self) -> bool {
        self.messages().next().is_none()
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        [
            &self.amount,
            &self.receiver_limit,
            &self.expiry_hours,
            &self.message,
            &self.coin_type,
        ]
        .into_iter()
        .filter_map(|m| m.as_deref())
    }
}

impl From<CreateFormErrors> for DropletError {
    fn from(errors: CreateFormErrors) -> Self {
        DropletError::InvalidInput(errors.messages().collect::<Vec<_>>().join("; "))
    }
}

/// Create parameters ready to be turned into a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDropletParams {
    pub coin_type: String,
    // Smallest coin unit
    pub amount: u64,
    pub receiver_limit: u64,
    pub expiry_hours: Option<u64>,
    pub message: String,
}

/// Check the create form against the wallet's balances
pub fn validate_create(
    form: &CreateDropletForm,
    balances: &[CoinBalance],
) -> Result<CreateDropletParams, CreateFormErrors> {
    let mut errors = CreateFormErrors::default();

    let coin = balances.iter().find(|c| c.coin_type == form.coin_type);
    if coin.is_none() {
        errors.coin_type = Some("Please select a valid coin type".to_string());
    }
    let decimals = coin.map_or(crate::types::SUI_DECIMALS, |c| c.decimals);

    let amount = match to_smallest_unit(&form.amount, decimals) {
        Ok(amount) if amount > 0 => Some(amount),
        _ => {
            errors.amount = Some("Amount must be greater than 0".to_string());
            None
        }
    };
    if let (Some(amount), Some(coin)) = (amount, coin) {
        if amount as u128 > coin.balance {
            errors.amount = Some(format!("Insufficient balance. Available: {}", coin.formatted));
        }
    }

    let receiver_limit = match form.receiver_limit.trim().parse::<u64>() {
        Ok(limit) if (1..=MAX_RECEIVER_LIMIT).contains(&limit) => limit,
        _ => {
            errors.receiver_limit =
                Some("Receiver limit must be between 1 and 100,000".to_string());
            0
        }
    };

    let expiry_hours = match form.expiry_hours.trim() {
        "" => None,
        raw => match raw.parse::<u64>() {
            Ok(hours) if hours > 0 => Some(hours),
            _ => {
                errors.expiry_hours = Some("Expiry hours must be greater than 0".to_string());
                None
            }
        },
    };

    if form.message.chars().count() > MAX_MESSAGE_CHARS {
        errors.message = Some(format!(
            "Message must be less than {MAX_MESSAGE_CHARS} characters"
        ));
    }
    let message = if form.message.is_empty() {
        DEFAULT_MESSAGE.to_string()
    } else {
        form.message.clone()
    };

    match amount {
        Some(amount) if errors.is_empty() => Ok(CreateDropletParams {
            coin_type: form.coin_type.clone(),
            amount,
            receiver_limit,
            expiry_hours,
            message,
        }),
        _ => Err(errors),
    }
}

/// Check the claim form. Returns the parsed id and trimmed claimer name.
pub fn validate_claim(droplet_id: &str, claimer_name: &str) -> DropletResult<(DropletId, String)> {
    let droplet_id = DropletId::from_str(droplet_id)?;
    let name = claimer_name.trim();
    if name.is_empty() {
        return Err(DropletError::InvalidInput(
            "Please enter your name".to_string(),
        ));
    }
    Ok((droplet_id, name.to_string()))
}

fn id_from_text(raw: &str) -> Option<DropletId> {
    let raw = raw.trim();
    let tail = if raw.len() > DROPLET_ID_LENGTH {
        raw.get(raw.len() - DROPLET_ID_LENGTH..)?
    } else {
        raw
    };
    DropletId::from_str(tail).ok()
}

/// Droplet id of a creation transaction.
///
/// Reads the first `DropletCreated` event carrying an id, then falls back to
/// the tail of the first created object id. Never invents an id.
pub fn extract_droplet_id(response: &TransactionBlockResponse) -> Option<DropletId> {
    let from_events = response
        .all_events()
        .filter(|e| e.event_name() == DROPLET_CREATED)
        .find_map(|e| e.parsed_json.get("droplet_id")?.as_str().and_then(id_from_text));
    if from_events.is_some() {
        return from_events;
    }
    response
        .created_object_ids()
        .first()
        .and_then(|id| DropletId::from_str(&id.hex_suffix(DROPLET_ID_LENGTH)).ok())
}

/// Hand a transaction to the wallet and classify the outcome.
pub async fn submit<W>(
    wallet: &W,
    tx: MoveCallTx,
    metrics: &DropletMetrics,
) -> DropletResult<TransactionBlockResponse>
where
    W: WalletAdapter + ?Sized,
{
    if wallet.address().is_none() {
        return Err(DropletError::WalletNotConnected);
    }
    let action = tx.action().to_string();
    let target = tx.target();
    metrics.tx_submitted.with_label_values(&[&action]).inc();

    let result = match wallet.sign_and_execute(tx).await {
        Ok(response) => match response.effects.as_ref().map(|e| &e.status) {
            Some(ExecutionStatus::Failure { error }) => {
                Err(DropletError::from_transaction_error(error.clone()))
            }
            _ => Ok(response),
        },
        Err(e) => Err(DropletError::from_transaction_error(e.0)),
    };

    match &result {
        Ok(response) => info!("[Actions] {} succeeded: {}", action, response.digest),
        Err(e) => {
            metrics
                .tx_failed
                .with_label_values(&[&action, e.error_type()])
                .inc();
            error!("[Actions] {} via {} failed: {}", action, target, e);
        }
    }
    result
}
