// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use droplet_types::{DropletId, ObjectAddress};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

pub const MAX_MESSAGE_CHARS: usize = 200;
pub const SUI_DECIMALS: u8 = 9;
const MS_PER_HOUR: u64 = 3_600_000;

/// Wall-clock time in milliseconds since the epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// View of one droplet derived from cached events. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropletSummary {
    pub droplet_id: DropletId,
    pub droplet_address: Option<ObjectAddress>,
    pub creator: ObjectAddress,
    pub total_amount: u64,
    pub claimed_amount: u64,
    pub receiver_limit: u64,
    pub num_claimed: u64,
    pub expiry_time: u64,
    pub is_expired: bool,
    pub is_closed: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropletStatus {
    Active,
    Expired,
    Completed,
}

impl fmt::Display for DropletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DropletStatus::Active => "Active",
            DropletStatus::Expired => "Expired",
            DropletStatus::Completed => "Completed",
        };
        f.write_str(s)
    }
}

impl DropletSummary {
    pub fn is_full(&self) -> bool {
        self.num_claimed >= self.receiver_limit
    }

    pub fn status(&self) -> DropletStatus {
        if self.is_closed || self.is_full() {
            DropletStatus::Completed
        } else if self.is_expired {
            DropletStatus::Expired
        } else {
            DropletStatus::Active
        }
    }

    /// Whole hours until expiry, rounded up. `None` once expired.
    pub fn remaining_hours(&self, now_ms: u64) -> Option<u64> {
        if now_ms >= self.expiry_time {
            return None;
        }
        Some((self.expiry_time - now_ms).div_ceil(MS_PER_HOUR))
    }

    pub fn remaining_amount(&self) -> u64 {
        self.total_amount.saturating_sub(self.claimed_amount)
    }

    /// Only an expired droplet that is not yet closed can be cleaned up
    pub fn can_cleanup(&self) -> bool {
        self.is_expired && !self.is_closed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropletFilter {
    #[default]
    All,
    Active,
    Expired,
    Completed,
}

impl DropletFilter {
    pub fn matches(&self, s: &DropletSummary) -> bool {
        match self {
            DropletFilter::All => true,
            DropletFilter::Active => !s.is_expired && !s.is_closed && !s.is_full(),
            DropletFilter::Expired => s.is_expired && !s.is_closed,
            DropletFilter::Completed => s.is_closed || s.is_full(),
        }
    }
}

impl FromStr for DropletFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(DropletFilter::All),
            "active" => Ok(DropletFilter::Active),
            "expired" => Ok(DropletFilter::Expired),
            "completed" => Ok(DropletFilter::Completed),
            other => Err(format!(
                "unknown filter `{other}`, expected one of all, active, expired, completed"
            )),
        }
    }
}

/// Pure filter over summaries; input order is preserved
pub fn filter_droplets(summaries: &[DropletSummary], filter: DropletFilter) -> Vec<DropletSummary> {
    summaries
        .iter()
        .filter(|s| filter.matches(s))
        .cloned()
        .collect()
}

/// Decoded result of the registry's per-user aggregate read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserActivitySummary {
    pub created_ids: Vec<DropletId>,
    pub claimed_ids: Vec<DropletId>,
    pub created_count: u64,
    pub claimed_count: u64,
}

impl UserActivitySummary {
    pub fn is_empty(&self) -> bool {
        self.created_ids.is_empty() && self.claimed_ids.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardSource {
    // Droplet ids came from the registry's aggregate read
    Aggregate,
    // Droplet ids came from the user's events in the session cache
    Events,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDashboard {
    pub source: DashboardSource,
    pub created: Vec<DropletSummary>,
    pub claimed: Vec<DropletSummary>,
}

impl UserDashboard {
    pub fn total_claimed_amount(&self) -> u64 {
        self.claimed
            .iter()
            .fold(0u64, |acc, s| acc.saturating_add(s.claimed_amount))
    }
}

/// Render a raw on-chain amount with a fixed number of decimal places.
/// Truncates rather than rounds.
pub fn format_amount(raw: u128, decimals: u8, places: usize) -> String {
    let scale = 10u128.pow(decimals as u32);
    let whole = raw / scale;
    if places == 0 {
        return whole.to_string();
    }
    let frac = raw % scale;
    let frac_str = format!("{:0width$}", frac, width = decimals as usize);
    let shown: String = frac_str
        .chars()
        .chain(std::iter::repeat('0'))
        .take(places)
        .collect();
    format!("{whole}.{shown}")
}
