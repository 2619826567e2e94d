// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Session-scoped cache of droplet events.
//!
//! Holds a deduplicated subset of the module's event log in arrival order.
//! It only grows until [`EventCache::invalidate`] drops everything, which
//! forces the next fetch to start again from genesis.

use crate::events::{DropletClaimed, DropletClosed, DropletCreated, DropletEvent, Observed};
use droplet_json_rpc_types::{DropletEventView, EventID};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::warn;

#[derive(Debug, Default)]
pub struct IngestReport {
    // Events not seen before, in the order they were supplied
    pub new_events: Vec<Observed<DropletEvent>>,
    pub duplicates: usize,
    pub undecodable: usize,
}

#[derive(Debug)]
pub struct EventCache {
    created: Vec<Observed<DropletCreated>>,
    claimed: Vec<Observed<DropletClaimed>>,
    closed: Vec<Observed<DropletClosed>>,
    seen: HashSet<EventID>,
    cursor: Option<EventID>,
    last_fetch_time: Option<Instant>,
    freshness: Duration,
}

impl EventCache {
    pub fn new(freshness: Duration) -> Self {
        Self {
            created: vec![],
            claimed: vec![],
            closed: vec![],
            seen: HashSet::new(),
            cursor: None,
            last_fetch_time: None,
            freshness,
        }
    }

    pub fn created(&self) -> &[Observed<DropletCreated>] {
        &self.created
    }

    pub fn claimed(&self) -> &[Observed<DropletClaimed>] {
        &self.claimed
    }

    pub fn closed(&self) -> &[Observed<DropletClosed>] {
        &self.closed
    }

    pub fn len(&self) -> usize {
        self.created.len() + self.claimed.len() + self.closed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cursor(&self) -> Option<&EventID> {
        self.cursor.as_ref()
    }

    pub fn set_cursor(&mut self, cursor: Option<EventID>) {
        if cursor.is_some() {
            self.cursor = cursor;
        }
    }

    pub fn mark_fetched(&mut self) {
        self.last_fetch_time = Some(Instant::now());
    }

    pub fn last_fetch_time(&self) -> Option<Instant> {
        self.last_fetch_time
    }

    /// True when a fetch completed within the freshness window
    pub fn is_fresh(&self) -> bool {
        self.last_fetch_time
            .is_some_and(|t| t.elapsed() < self.freshness)
    }

    /// Has a full refetch populated this cache since the last invalidation
    pub fn is_primed(&self) -> bool {
        self.last_fetch_time.is_some()
    }

    pub fn invalidate(&mut self) {
        self.created.clear();
        self.claimed.clear();
        self.closed.clear();
        self.seen.clear();
        self.cursor = None;
        self.last_fetch_time = None;
    }

    /// Insert one decoded event. Returns false when the id was already seen.
    pub fn insert(&mut self, observed: Observed<DropletEvent>) -> bool {
        if !self.seen.insert(observed.id.clone()) {
            return false;
        }
        let Observed {
            id,
            timestamp_ms,
            data,
        } = observed;
        match data {
            DropletEvent::Created(e) => self.created.push(Observed {
                id,
                timestamp_ms,
                data: e,
            }),
            DropletEvent::Claimed(e) => self.claimed.push(Observed {
                id,
                timestamp_ms,
                data: e,
            }),
            DropletEvent::Closed(e) => self.closed.push(Observed {
                id,
                timestamp_ms,
                data: e,
            }),
            // Fee changes carry no per-droplet state
            DropletEvent::FeeUpdated(_) => {}
        }
        true
    }

    /// Decode and insert a page of raw events
    pub fn ingest(&mut self, views: &[DropletEventView]) -> IngestReport {
        let mut report = IngestReport::default();
        for view in views {
            if self.seen.contains(&view.id) {
                report.duplicates += 1;
                continue;
            }
            let event = match DropletEvent::try_from_view(view) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) => {
                    warn!(
                        "[EventCache] skipping undecodable {} event {:?}: {}",
                        view.event_name(),
                        view.id,
                        e
                    );
                    report.undecodable += 1;
                    continue;
                }
            };
            let observed = Observed {
                id: view.id.clone(),
                timestamp_ms: view.timestamp_ms,
                data: event,
            };
            if self.insert(observed.clone()) {
                report.new_events.push(observed);
            }
        }
        report
    }
}
