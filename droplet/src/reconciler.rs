// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Derives droplet view state from cached events.
//!
//! Everything here is a pure function of the event cache and the current
//! time. Claim totals only grow as claim events arrive and a droplet stays
//! closed once a close event has been observed.

use droplet_types::{DropletId, ObjectAddress};
use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::event_cache::EventCache;
use crate::events::{DropletClaimed, DropletClosed, DropletCreated, Observed};
use crate::types::DropletSummary;

/// Reconcile one droplet. Returns `None` when no creation event is cached.
pub fn reconcile(
    droplet_id: &DropletId,
    created: &[Observed<DropletCreated>],
    claimed: &[Observed<DropletClaimed>],
    closed: &[Observed<DropletClosed>],
    now_ms: u64,
) -> Option<DropletSummary> {
    let mut creations = created.iter().filter(|e| &e.data.droplet_id == droplet_id);
    let creation = creations.next()?;
    let extra = creations.count();
    if extra > 0 {
        warn!(
            "[Reconciler] {} has {} duplicate creation events, using {:?}",
            droplet_id, extra, creation.id
        );
    }
    let claims = claimed.iter().filter(|e| &e.data.droplet_id == droplet_id);
    let is_closed = closed.iter().any(|e| &e.data.droplet_id == droplet_id);
    Some(summarize(&creation.data, claims.map(|e| &e.data), is_closed, now_ms))
}

fn summarize<'a>(
    creation: &DropletCreated,
    claims: impl Iterator<Item = &'a DropletClaimed>,
    is_closed: bool,
    now_ms: u64,
) -> DropletSummary {
    let (claimed_amount, num_claimed) = claims.fold((0u64, 0u64), |(amount, count), c| {
        (amount.saturating_add(c.claim_amount), count + 1)
    });
    DropletSummary {
        droplet_id: creation.droplet_id.clone(),
        droplet_address: None,
        creator: creation.sender,
        total_amount: creation.amount(),
        claimed_amount,
        receiver_limit: creation.receiver_limit,
        num_claimed,
        expiry_time: creation.expiry_time,
        is_expired: now_ms >= creation.expiry_time,
        is_closed,
        message: creation.message.clone(),
    }
}

/// Claim and close events grouped by droplet, built once per reconciliation pass
struct EventIndex<'a> {
    creations: HashMap<&'a DropletId, &'a DropletCreated>,
    claims: HashMap<&'a DropletId, Vec<&'a DropletClaimed>>,
    closed: HashSet<&'a DropletId>,
}

impl<'a> EventIndex<'a> {
    fn new(cache: &'a EventCache) -> Self {
        let mut creations = HashMap::new();
        for e in cache.created() {
            if creations.contains_key(&e.data.droplet_id) {
                warn!(
                    "[Reconciler] ignoring duplicate creation event {:?} for {}",
                    e.id, e.data.droplet_id
                );
                continue;
            }
            creations.insert(&e.data.droplet_id, &e.data);
        }
        let mut claims: HashMap<&DropletId, Vec<&DropletClaimed>> = HashMap::new();
        for e in cache.claimed() {
            claims.entry(&e.data.droplet_id).or_default().push(&e.data);
        }
        let closed = cache.closed().iter().map(|e| &e.data.droplet_id).collect();
        Self {
            creations,
            claims,
            closed,
        }
    }

    fn summary(&self, droplet_id: &DropletId, now_ms: u64) -> Option<DropletSummary> {
        let creation = self.creations.get(droplet_id)?;
        let claims = self
            .claims
            .get(droplet_id)
            .into_iter()
            .flatten()
            .copied();
        Some(summarize(
            creation,
            claims,
            self.closed.contains(droplet_id),
            now_ms,
        ))
    }
}

/// Every droplet with a cached creation event, in creation order
pub fn reconcile_all(cache: &EventCache, now_ms: u64) -> Vec<DropletSummary> {
    let index = EventIndex::new(cache);
    let mut seen = HashSet::new();
    cache
        .created()
        .iter()
        .filter(|e| seen.insert(&e.data.droplet_id))
        .filter_map(|e| index.summary(&e.data.droplet_id, now_ms))
        .collect()
}

/// Summaries for the given ids, in the given order. Ids without a cached
/// creation event are skipped.
pub fn reconcile_ids(cache: &EventCache, ids: &[DropletId], now_ms: u64) -> Vec<DropletSummary> {
    let index = EventIndex::new(cache);
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(*id))
        .filter_map(|id| index.summary(id, now_ms))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDroplets {
    pub created: Vec<DropletSummary>,
    pub claimed: Vec<DropletSummary>,
}

/// Droplets the user created and droplets the user claimed from, as seen in the cache
pub fn reconcile_user(user: ObjectAddress, cache: &EventCache, now_ms: u64) -> UserDroplets {
    let created_ids: Vec<DropletId> = cache
        .created()
        .iter()
        .filter(|e| e.data.sender == user)
        .map(|e| e.data.droplet_id.clone())
        .collect();
    let claimed_ids: Vec<DropletId> = cache
        .claimed()
        .iter()
        .filter(|e| e.data.claimer == user)
        .map(|e| e.data.droplet_id.clone())
        .collect();
    let index = EventIndex::new(cache);
    let resolve = |ids: Vec<DropletId>| {
        let mut seen = HashSet::new();
        ids.into_iter()
            .filter(|id| seen.insert(id.clone()))
            .filter_map(|id| index.summary(&id, now_ms))
            .collect::<Vec<_>>()
    };
    UserDroplets {
        created: resolve(created_ids),
        claimed: resolve(claimed_ids),
    }
}
