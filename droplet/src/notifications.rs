// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! User-facing notifications for live events and action outcomes.

use std::time::Duration;

use crate::error::DropletError;
use crate::events::{DropletEvent, Observed};

const LAMPORTS_PER_COIN: f64 = 1e9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub body: String,
    // How long the front-end should keep it on screen
    pub duration: Duration,
}

impl Notification {
    fn new(level: NotificationLevel, title: &str, body: String, duration_ms: u64) -> Self {
        Self {
            level,
            title: title.to_string(),
            body,
            duration: Duration::from_millis(duration_ms),
        }
    }

    pub fn success(title: &str, body: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, title, body.into(), 4_000)
    }

    /// Failure of a user action. The body is the mapped, user-facing reason.
    pub fn failure(title: &str, error: &DropletError) -> Self {
        Self::new(NotificationLevel::Error, title, error.user_message(), 5_000)
    }

    /// Live notification for a newly observed event
    pub fn for_event(event: &DropletEvent) -> Option<Self> {
        let notification = match event {
            DropletEvent::Created(e) => Self::new(
                NotificationLevel::Info,
                "New Droplet Created!",
                format!(
                    "Droplet {} created with {} SUI",
                    e.droplet_id,
                    coins(e.amount())
                ),
                4_000,
            ),
            DropletEvent::Claimed(e) => {
                let message = if e.message.is_empty() {
                    String::new()
                } else {
                    format!(" • \"{}\"", e.message)
                };
                Self::new(
                    NotificationLevel::Info,
                    "Airdrop Claimed!",
                    format!(
                        "{} claimed {} SUI from {}{}",
                        e.claimer_name,
                        coins(e.claim_amount),
                        e.droplet_id,
                        message
                    ),
                    5_000,
                )
            }
            DropletEvent::Closed(e) => {
                let reason = if e.is_completed() {
                    "All tokens claimed!"
                } else {
                    "Droplet expired"
                };
                let claims = e
                    .num_claimers
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "?".to_string());
                Self::new(
                    NotificationLevel::Info,
                    "Droplet Closed",
                    format!("{}: {} • {} claims made", e.droplet_id, reason, claims),
                    4_000,
                )
            }
            DropletEvent::FeeUpdated(e) => Self::new(
                NotificationLevel::Info,
                "Platform Fee Updated",
                format!(
                    "Fee changed from {:.1}% to {:.1}%",
                    e.old_fee as f64 / 100.0,
                    e.new_fee as f64 / 100.0
                ),
                4_000,
            ),
        };
        Some(notification)
    }
}

fn coins(raw: u64) -> String {
    format!("{:.4}", raw as f64 / LAMPORTS_PER_COIN)
}

/// Notifications for a batch of newly ingested events, in arrival order
pub fn notifications_for(events: &[Observed<DropletEvent>]) -> Vec<Notification> {
    events
        .iter()
        .filter_map(|e| Notification::for_event(&e.data))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContractAbort;
    use crate::events::test_events::*;
    use crate::events::FeePercentageUpdated;

    fn decode(view: droplet_json_rpc_types::DropletEventView) -> DropletEvent {
        DropletEvent::try_from_view(&view).unwrap().unwrap()
    }

    #[test]
    fn test_created_and_claimed_text() {
        let n = Notification::for_event(&decode(created_view("t", "A1B2C3", 1_500_000_000, 5, 9)))
            .unwrap();
        assert_eq!(n.title, "New Droplet Created!");
        assert_eq!(n.body, "Droplet A1B2C3 created with 1.5000 SUI");

        let n = Notification::for_event(&decode(claimed_view("t", "A1B2C3", "0xb0b", 250_000_000)))
            .unwrap();
        assert_eq!(n.title, "Airdrop Claimed!");
        assert_eq!(n.body, "bob claimed 0.2500 SUI from A1B2C3");
        assert_eq!(n.duration, Duration::from_secs(5));
    }

    #[test]
    fn test_claim_message_is_quoted() {
        let mut view = claimed_view("t", "A1B2C3", "0xb0b", 1_000_000_000);
        view.parsed_json["message"] = serde_json::json!("gm");
        let n = Notification::for_event(&decode(view)).unwrap();
        assert_eq!(n.body, "bob claimed 1.0000 SUI from A1B2C3 • \"gm\"");
    }

    #[test]
    fn test_closed_reasons() {
        let n = Notification::for_event(&decode(closed_view("t", "A1B2C3", "completed"))).unwrap();
        assert_eq!(n.body, "A1B2C3: All tokens claimed! • 2 claims made");
        let n = Notification::for_event(&decode(closed_view("t", "A1B2C3", "expired"))).unwrap();
        assert_eq!(n.body, "A1B2C3: Droplet expired • 2 claims made");
    }

    #[test]
    fn test_fee_update_in_percent() {
        let n = Notification::for_event(&DropletEvent::FeeUpdated(FeePercentageUpdated {
            old_fee: 130,
            new_fee: 250,
        }))
        .unwrap();
        assert_eq!(n.title, "Platform Fee Updated");
        assert_eq!(n.body, "Fee changed from 1.3% to 2.5%");
    }

    #[test]
    fn test_failure_uses_mapped_reason() {
        let n = Notification::failure(
            "Cleanup failed",
            &DropletError::ContractAbort(ContractAbort::DropletClosed),
        );
        assert_eq!(n.level, NotificationLevel::Error);
        assert_eq!(n.body, "This droplet is closed");

        let n = Notification::failure("Cleanup failed", &DropletError::TransactionFailed("x".into()));
        assert_eq!(n.body, "Transaction failed, please try again.");
    }
}
