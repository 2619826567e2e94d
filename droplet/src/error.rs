// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use droplet_types::{AddressParseError, DropletIdError, TypeTagParseError};

/// Known contract abort codes, matched by substring against the error text
/// returned by the wallet or node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractAbort {
    AlreadyClaimed,
    DropletExpired,
    DropletClosed,
    ReceiverLimitReached,
    InsufficientBalance,
    DropletNotFound,
    InvalidDropletId,
    InvalidFee,
}

impl ContractAbort {
    // Checked in order; the first match wins
    const PATTERNS: &'static [(&'static str, ContractAbort)] = &[
        ("E_ALREADY_CLAIMED", ContractAbort::AlreadyClaimed),
        ("E_DROPLET_EXPIRED", ContractAbort::DropletExpired),
        ("E_DROPLET_CLOSED", ContractAbort::DropletClosed),
        ("E_RECEIVER_LIMIT_REACHED", ContractAbort::ReceiverLimitReached),
        ("E_INSUFFICIENT_BALANCE", ContractAbort::InsufficientBalance),
        ("E_DROPLET_NOT_FOUND", ContractAbort::DropletNotFound),
        ("E_INVALID_DROPLET_ID", ContractAbort::InvalidDropletId),
        ("E_INVALID_FEE", ContractAbort::InvalidFee),
        ("insufficient", ContractAbort::InsufficientBalance),
    ];

    pub fn from_error_message(message: &str) -> Option<Self> {
        Self::PATTERNS
            .iter()
            .find(|(pattern, _)| message.contains(pattern))
            .map(|(_, abort)| *abort)
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ContractAbort::AlreadyClaimed => "You have already claimed from this droplet",
            ContractAbort::DropletExpired => "This droplet has expired",
            ContractAbort::DropletClosed => "This droplet is closed",
            ContractAbort::ReceiverLimitReached => "Droplet has reached its recipient limit",
            ContractAbort::InsufficientBalance => "Insufficient balance for this transaction",
            ContractAbort::DropletNotFound => "Droplet not found. Please check the ID",
            ContractAbort::InvalidDropletId => "Invalid droplet ID",
            ContractAbort::InvalidFee => "Invalid platform fee",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ContractAbort::AlreadyClaimed => "abort_already_claimed",
            ContractAbort::DropletExpired => "abort_droplet_expired",
            ContractAbort::DropletClosed => "abort_droplet_closed",
            ContractAbort::ReceiverLimitReached => "abort_receiver_limit_reached",
            ContractAbort::InsufficientBalance => "abort_insufficient_balance",
            ContractAbort::DropletNotFound => "abort_droplet_not_found",
            ContractAbort::InvalidDropletId => "abort_invalid_droplet_id",
            ContractAbort::InvalidFee => "abort_invalid_fee",
        }
    }
}

pub const GENERIC_TX_FAILURE_MESSAGE: &str = "Transaction failed, please try again.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DropletError {
    // User input rejected before any network call
    #[error("{0}")]
    InvalidInput(String),
    // Action requires a connected wallet
    #[error("Wallet not connected")]
    WalletNotConnected,
    // Transaction rejected by the contract with a recognised abort code
    #[error("{}", .0.user_message())]
    ContractAbort(ContractAbort),
    // Transaction rejected for any other reason; carries the raw error text
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
    // Droplet ID does not resolve to an on-chain object
    #[error("Droplet not found: {0}")]
    DropletNotFound(String),
    // JSON-RPC transport or node error
    #[error("RPC error: {0}")]
    RpcError(String),
    // Malformed binary or JSON payload
    #[error("Decode error: {0}")]
    DecodeError(String),
    // Result belongs to a session that has since been reset
    #[error("Stale session")]
    StaleSession,
    // Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DropletError {
    /// Returns a short string identifying the error type for metrics labels
    pub fn error_type(&self) -> &'static str {
        match self {
            DropletError::InvalidInput(_) => "invalid_input",
            DropletError::WalletNotConnected => "wallet_not_connected",
            DropletError::ContractAbort(abort) => abort.label(),
            DropletError::TransactionFailed(_) => "transaction_failed",
            DropletError::DropletNotFound(_) => "droplet_not_found",
            DropletError::RpcError(_) => "rpc_error",
            DropletError::DecodeError(_) => "decode_error",
            DropletError::StaleSession => "stale_session",
            DropletError::InternalError(_) => "internal_error",
        }
    }

    /// Classify an error reported by the wallet or node for a submitted transaction
    pub fn from_transaction_error(message: impl Into<String>) -> Self {
        let message = message.into();
        match ContractAbort::from_error_message(&message) {
            Some(abort) => DropletError::ContractAbort(abort),
            None => DropletError::TransactionFailed(message),
        }
    }

    /// Text suitable for a user-facing notification
    pub fn user_message(&self) -> String {
        match self {
            DropletError::InvalidInput(msg) => msg.clone(),
            DropletError::WalletNotConnected => {
                "Please connect your wallet to continue".to_string()
            }
            DropletError::ContractAbort(abort) => abort.user_message().to_string(),
            DropletError::DropletNotFound(_) => {
                ContractAbort::DropletNotFound.user_message().to_string()
            }
            _ => GENERIC_TX_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl From<DropletIdError> for DropletError {
    fn from(e: DropletIdError) -> Self {
        DropletError::InvalidInput(e.to_string())
    }
}

impl From<AddressParseError> for DropletError {
    fn from(e: AddressParseError) -> Self {
        DropletError::InvalidInput(e.to_string())
    }
}

impl From<TypeTagParseError> for DropletError {
    fn from(e: TypeTagParseError) -> Self {
        DropletError::InvalidInput(e.to_string())
    }
}

impl From<bcs::Error> for DropletError {
    fn from(e: bcs::Error) -> Self {
        DropletError::DecodeError(e.to_string())
    }
}

impl From<serde_json::Error> for DropletError {
    fn from(e: serde_json::Error) -> Self {
        DropletError::DecodeError(e.to_string())
    }
}

impl From<anyhow::Error> for DropletError {
    fn from(e: anyhow::Error) -> Self {
        DropletError::RpcError(format!("{e:#}"))
    }
}

pub type DropletResult<T> = Result<T, DropletError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_codes_map_to_user_messages() {
        let cases = vec![
            (
                "MoveAbort(dropnew, E_ALREADY_CLAIMED) in command 0",
                "You have already claimed from this droplet",
            ),
            ("E_DROPLET_EXPIRED", "This droplet has expired"),
            ("E_DROPLET_CLOSED", "This droplet is closed"),
            (
                "abort E_RECEIVER_LIMIT_REACHED",
                "Droplet has reached its recipient limit",
            ),
            (
                "E_INSUFFICIENT_BALANCE",
                "Insufficient balance for this transaction",
            ),
            (
                "insufficient gas for transaction",
                "Insufficient balance for this transaction",
            ),
            (
                "E_DROPLET_NOT_FOUND",
                "Droplet not found. Please check the ID",
            ),
            ("E_INVALID_DROPLET_ID", "Invalid droplet ID"),
            ("E_INVALID_FEE", "Invalid platform fee"),
        ];
        for (raw, expected) in cases {
            let err = DropletError::from_transaction_error(raw);
            assert!(
                matches!(err, DropletError::ContractAbort(_)),
                "{raw} should map to a contract abort"
            );
            assert_eq!(err.user_message(), expected, "message for {raw}");
        }
    }

    #[test]
    fn test_unmatched_error_is_generic() {
        let err = DropletError::from_transaction_error("network hiccup");
        assert_eq!(
            err,
            DropletError::TransactionFailed("network hiccup".to_string())
        );
        assert_eq!(err.user_message(), GENERIC_TX_FAILURE_MESSAGE);
        assert_eq!(err.error_type(), "transaction_failed");
    }

    #[test]
    fn test_specific_code_beats_generic_substring() {
        // Contains both the explicit code and the loose "insufficient" word
        let err = DropletError::from_transaction_error(
            "E_RECEIVER_LIMIT_REACHED: insufficient slots",
        );
        assert_eq!(
            err,
            DropletError::ContractAbort(ContractAbort::ReceiverLimitReached)
        );
    }

    #[test]
    fn test_error_type_labels() {
        let errors = vec![
            (DropletError::InvalidInput("x".into()), "invalid_input"),
            (DropletError::WalletNotConnected, "wallet_not_connected"),
            (
                DropletError::ContractAbort(ContractAbort::InvalidFee),
                "abort_invalid_fee",
            ),
            (DropletError::DropletNotFound("A".into()), "droplet_not_found"),
            (DropletError::RpcError("x".into()), "rpc_error"),
            (DropletError::DecodeError("x".into()), "decode_error"),
            (DropletError::StaleSession, "stale_session"),
            (DropletError::InternalError("x".into()), "internal_error"),
        ];
        for (error, expected) in errors {
            assert_eq!(error.error_type(), expected);
        }
    }

    #[test]
    fn test_input_errors_keep_validation_text() {
        let err: DropletError = DropletIdError::Malformed.into();
        assert_eq!(
            err.user_message(),
            "Droplet ID must be exactly 6 uppercase alphanumeric characters"
        );
    }
}
