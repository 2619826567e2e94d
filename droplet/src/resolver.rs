// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Read-through resolution of droplet ids to on-chain object addresses.
//!
//! A successful lookup is memoized for the lifetime of the resolver and is
//! never overwritten. Not-found results are not memoized, so a droplet
//! created later in the session can still be resolved. Concurrent requests
//! for the same id share one underlying read-only call. [`AddressResolver::clear`]
//! fences off lookups that are still running: their results are returned to
//! their callers but never reach the memo.

use droplet_types::{DropletId, ObjectAddress};
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::droplet_client::{DropletClient, DropletClientInner};
use crate::encoding::decode_option_address;
use crate::error::{ContractAbort, DropletError};
use crate::types::DropletSummary;

type InFlight = Arc<OnceCell<Option<ObjectAddress>>>;

pub struct AddressResolver<P> {
    client: Arc<DropletClient<P>>,
    resolved: RwLock<HashMap<DropletId, ObjectAddress>>,
    in_flight: Mutex<HashMap<DropletId, InFlight>>,
    // Bumped by `clear`; a lookup started under an older value is stale
    generation: AtomicU64,
    concurrency: usize,
}

impl<P> AddressResolver<P>
where
    P: DropletClientInner,
{
    pub fn new(client: Arc<DropletClient<P>>) -> Self {
        let concurrency = client.config().resolver_concurrency.max(1);
        Self {
            client,
            resolved: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            concurrency,
        }
    }

    /// Synchronous cache lookup
    pub fn cached(&self, droplet_id: &DropletId) -> Option<ObjectAddress> {
        self.resolved
            .read()
            .ok()
            .and_then(|map| map.get(droplet_id).copied())
    }

    pub fn cached_len(&self) -> usize {
        self.resolved.read().map(|map| map.len()).unwrap_or(0)
    }

    /// Forget every resolved address. Lookups already in flight still finish
    /// but their results are not memoized.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.clear();
        }
        if let Ok(mut map) = self.resolved.write() {
            map.clear();
        }
    }

    /// Resolve one id, hitting the ledger only on a cache miss.
    pub async fn resolve_address(&self, droplet_id: &DropletId) -> Option<ObjectAddress> {
        if let Some(address) = self.cached(droplet_id) {
            self.client.metrics().resolver_cache_hits.inc();
            return Some(address);
        }

        let cell = match self.in_flight.lock() {
            Ok(mut in_flight) => in_flight
                .entry(droplet_id.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone(),
            // A poisoned map only loses coalescing
            Err(_) => Arc::new(OnceCell::new()),
        };

        let result = *cell.get_or_init(|| self.lookup(droplet_id)).await;

        if let Ok(mut in_flight) = self.in_flight.lock() {
            let finished = in_flight
                .get(droplet_id)
                .is_some_and(|current| Arc::ptr_eq(current, &cell));
            if finished {
                in_flight.remove(droplet_id);
            }
        }
        result
    }

    async fn lookup(&self, droplet_id: &DropletId) -> Option<ObjectAddress> {
        let metrics = self.client.metrics();
        metrics.resolver_calls.inc();
        let generation = self.generation.load(Ordering::SeqCst);

        let results = match self.client.find_droplet_by_id(droplet_id).await {
            Ok(results) => results,
            Err(DropletError::ContractAbort(ContractAbort::DropletNotFound)) => {
                metrics.resolver_not_found.inc();
                debug!("[Resolver] {} is not registered", droplet_id);
                return None;
            }
            Err(e) => {
                warn!("[Resolver] lookup of {} failed: {}", droplet_id, e);
                return None;
            }
        };

        // A call that produced no return value is treated like an empty payload
        let bytes = results.return_value(0).unwrap_or_default();
        match decode_option_address(bytes) {
            Ok(Some(address)) => {
                if self.generation.load(Ordering::SeqCst) != generation {
                    metrics
                        .stale_responses_discarded
                        .with_label_values(&["resolver_cleared"])
                        .inc();
                    debug!("[Resolver] not caching {}, cleared mid-lookup", droplet_id);
                    return Some(address);
                }
                if let Ok(mut resolved) = self.resolved.write() {
                    // Write-once: a concurrent writer that got here first wins
                    let stored = *resolved.entry(droplet_id.clone()).or_insert(address);
                    if stored != address {
                        warn!(
                            "[Resolver] {} resolved to {} but {} is already cached",
                            droplet_id, address, stored
                        );
                    }
                    return Some(stored);
                }
                Some(address)
            }
            Ok(None) => {
                metrics.resolver_not_found.inc();
                debug!("[Resolver] {} not found", droplet_id);
                None
            }
            Err(e) => {
                metrics
                    .decode_faults
                    .with_label_values(&[e.value_kind()])
                    .inc();
                warn!(
                    "[Resolver] malformed lookup result for {} ({} bytes): {}",
                    droplet_id,
                    bytes.len(),
                    e
                );
                None
            }
        }
    }

    /// Resolve many ids with at most `resolver-concurrency` lookups in flight.
    /// Only ids that resolved appear in the result.
    pub async fn resolve_batch(&self, droplet_ids: &[DropletId]) -> HashMap<DropletId, ObjectAddress> {
        let mut seen = HashSet::new();
        let unique: Vec<DropletId> = droplet_ids
            .iter()
            .filter(|id| seen.insert((*id).clone()))
            .cloned()
            .collect();

        let results: Vec<(DropletId, Option<ObjectAddress>)> = futures::stream::iter(unique)
            .map(|id| async move {
                let address = self.resolve_address(&id).await;
                (id, address)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        results
            .into_iter()
            .filter_map(|(id, address)| address.map(|a| (id, a)))
            .collect()
    }

    /// Fill in missing addresses on summaries. Existing addresses are kept.
    pub async fn fill_addresses(&self, summaries: &mut [DropletSummary]) {
        let missing: Vec<DropletId> = summaries
            .iter()
            .filter(|s| s.droplet_address.is_none())
            .map(|s| s.droplet_id.clone())
            .collect();
        if missing.is_empty() {
            return;
        }
        let resolved = self.resolve_batch(&missing).await;
        for summary in summaries.iter_mut() {
            if summary.droplet_address.is_none() {
                summary.droplet_address = resolved.get(&summary.droplet_id).copied();
            }
        }
    }
}
