// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Optimistic overlay for droplet cleanup.
//!
//! Per droplet: `Active -> CleanupPending -> (CleanedUp | CleanupFailed -> Active)`.
//! While a cleanup is pending or has succeeded the droplet is shown as
//! closed. A failed cleanup is shown open again and stays `CleanupFailed`
//! until the user retries or a close is confirmed. The overlay only ever
//! sets `is_closed`; it never clears a close that came from a confirmed event.

use droplet_json_rpc_types::TransactionBlockResponse;
use droplet_types::DropletId;
use std::collections::HashMap;
use std::fmt;

use crate::error::{ContractAbort, DropletError, DropletResult};
use crate::events::{DropletClosed, DROPLET_CLOSED};
use crate::notifications::Notification;
use crate::types::DropletSummary;

pub const CLEANUP_SUCCESS_TITLE: &str = "Droplet Cleaned Up Successfully!";
pub const CLEANUP_FAILED_TITLE: &str = "Cleanup Failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupState {
    Active,
    CleanupPending,
    CleanedUp,
    CleanupFailed,
}

impl fmt::Display for CleanupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CleanupState::Active => "active",
            CleanupState::CleanupPending => "cleanup-pending",
            CleanupState::CleanedUp => "cleaned-up",
            CleanupState::CleanupFailed => "cleanup-failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy)]
struct OverlayEntry {
    state: CleanupState,
    // `is_closed` as displayed before the action started
    previous_closed: bool,
}

#[derive(Debug, Default)]
pub struct CleanupOverlay {
    entries: HashMap<DropletId, OverlayEntry>,
}

impl CleanupOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, droplet_id: &DropletId) -> CleanupState {
        self.entries
            .get(droplet_id)
            .map_or(CleanupState::Active, |e| e.state)
    }

    /// Start a cleanup. Only an expired droplet that is not closed qualifies.
    pub fn begin(&mut self, summary: &DropletSummary) -> DropletResult<()> {
        let droplet_id = &summary.droplet_id;
        match self.state(droplet_id) {
            CleanupState::CleanupPending => {
                return Err(DropletError::InvalidInput(format!(
                    "Cleanup of {droplet_id} is already in progress"
                )))
            }
            CleanupState::CleanedUp => {
                return Err(DropletError::InvalidInput(format!(
                    "{droplet_id} has already been cleaned up"
                )))
            }
            CleanupState::Active | CleanupState::CleanupFailed => {}
        }
        if !summary.can_cleanup() {
            return Err(DropletError::InvalidInput(format!(
                "Only expired droplets that are still open can be cleaned up ({droplet_id} is {})",
                summary.status()
            )));
        }
        self.entries.insert(
            droplet_id.clone(),
            OverlayEntry {
                state: CleanupState::CleanupPending,
                previous_closed: summary.is_closed,
            },
        );
        Ok(())
    }

    /// Pending -> CleanedUp
    pub fn succeed(&mut self, droplet_id: &DropletId) {
        if let Some(entry) = self.entries.get_mut(droplet_id) {
            entry.state = CleanupState::CleanedUp;
        }
    }

    /// Pending -> CleanupFailed. Returns the `is_closed` value to restore,
    /// or `None` when no cleanup was pending.
    pub fn fail(&mut self, droplet_id: &DropletId) -> Option<bool> {
        let entry = self.entries.get_mut(droplet_id)?;
        if entry.state != CleanupState::CleanupPending {
            return None;
        }
        tracing::debug!(
            "[Cleanup] {} {} -> {}",
            droplet_id,
            entry.state,
            CleanupState::CleanupFailed
        );
        entry.state = CleanupState::CleanupFailed;
        Some(entry.previous_closed)
    }

    /// Overlay optimistic state onto freshly reconciled summaries. Entries
    /// whose close has been confirmed by an event are retired.
    pub fn apply(&mut self, summaries: &mut [DropletSummary]) {
        for summary in summaries.iter_mut() {
            let Some(entry) = self.entries.get(&summary.droplet_id).copied() else {
                continue;
            };
            if summary.is_closed {
                // A confirmed close supersedes the overlay
                if matches!(
                    entry.state,
                    CleanupState::CleanedUp | CleanupState::CleanupFailed
                ) {
                    self.entries.remove(&summary.droplet_id);
                }
                continue;
            }
            match entry.state {
                CleanupState::CleanupPending | CleanupState::CleanedUp => summary.is_closed = true,
                CleanupState::Active | CleanupState::CleanupFailed => {}
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// User-facing reason for a failed cleanup. Abort codes read differently
/// here than for claims.
pub fn cleanup_failure_message(error: &DropletError) -> String {
    match error {
        DropletError::ContractAbort(ContractAbort::DropletExpired) => {
            "This droplet is not yet expired and cannot be cleaned up".to_string()
        }
        DropletError::ContractAbort(ContractAbort::DropletClosed) => {
            "This droplet has already been cleaned up".to_string()
        }
        DropletError::ContractAbort(ContractAbort::DropletNotFound)
        | DropletError::DropletNotFound(_) => {
            "Droplet not found. Please check the droplet ID".to_string()
        }
        other => other.user_message(),
    }
}

pub fn cleanup_failure_notification(error: &DropletError) -> Notification {
    let mut notification = Notification::failure(CLEANUP_FAILED_TITLE, error);
    notification.body = cleanup_failure_message(error);
    notification
}

/// Success notification, using the close event in the response when present
pub fn cleanup_success_notification(response: &TransactionBlockResponse) -> Notification {
    let closed = response
        .all_events()
        .filter(|e| e.event_name() == DROPLET_CLOSED)
        .find_map(|e| serde_json::from_value::<DropletClosed>(e.parsed_json.clone()).ok());
    let body = match closed {
        Some(DropletClosed {
            refund_amount: Some(refund),
            reason,
            ..
        }) => format!("Refunded {refund} tokens. Reason: {reason}"),
        _ => "Expired droplet has been processed and any remaining funds refunded.".to_string(),
    };
    Notification::success(CLEANUP_SUCCESS_TITLE, body)
}
