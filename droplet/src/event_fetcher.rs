// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Event Fetcher
//!
//! Polls `suix_queryEvents` for the droplet module and feeds new events into
//! the session's [`EventCache`].
//!
//! ## Fetch modes
//!
//! - Full refetch: used when the cache is empty or was invalidated. Pages
//!   ascending from genesis until the node reports no next page, bounded by
//!   `max-backfill-pages`.
//! - Tail: pages ascending from the cursor stored in the cache.
//!
//! ## Staleness
//!
//! Every fetch takes a generation number when it starts. A response is only
//! applied if no newer fetch (or invalidation) has been applied meanwhile and
//! the session it was started in is still current. Poll failures are never
//! surfaced to the user; they are logged at debug level and counted.

use droplet_json_rpc_types::{DropletEventView, EventID, EventOrder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MAX_PAGE_SIZE;
use crate::droplet_client::{DropletClient, DropletClientInner};
use crate::error::{DropletError, DropletResult};
use crate::event_cache::{EventCache, IngestReport};
use crate::events::{DropletEvent, Observed};

/// One page of events plus where to continue from
#[derive(Debug, Clone)]
pub struct PollResult {
    pub events: Vec<DropletEventView>,
    // Cursor to pass to the next poll. Never moves backwards.
    pub next_cursor: Option<EventID>,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    FullRefetch,
    Tail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    // A newer fetch or an invalidation was applied first
    Generation,
    // The session was reset while the fetch was in flight
    Session,
}

impl StaleReason {
    fn label(&self) -> &'static str {
        match self {
            StaleReason::Generation => "generation",
            StaleReason::Session => "session",
        }
    }
}

#[derive(Debug)]
pub enum FetchOutcome {
    Applied { mode: FetchMode, report: IngestReport },
    Stale(StaleReason),
    Failed(DropletError),
}

impl FetchOutcome {
    pub fn new_events(&self) -> &[Observed<DropletEvent>] {
        match self {
            FetchOutcome::Applied { report, .. } => &report.new_events,
            _ => &[],
        }
    }
}

pub struct EventFetcher<P> {
    client: Arc<DropletClient<P>>,
    cache: Arc<RwLock<EventCache>>,
    // Session the fetcher belongs to; bumped by the owner on reset
    session_id: Arc<AtomicU64>,
    // Last generation handed out
    generation: AtomicU64,
    // Generation of the last applied response or invalidation
    applied_generation: AtomicU64,
    refresh: Notify,
}

impl<P> EventFetcher<P>
where
    P: DropletClientInner + 'static,
{
    pub fn new(
        client: Arc<DropletClient<P>>,
        cache: Arc<RwLock<EventCache>>,
        session_id: Arc<AtomicU64>,
    ) -> Self {
        Self {
            client,
            cache,
            session_id,
            generation: AtomicU64::new(0),
            applied_generation: AtomicU64::new(0),
            refresh: Notify::new(),
        }
    }

    pub fn cache(&self) -> &Arc<RwLock<EventCache>> {
        &self.cache
    }

    /// Read one page. A `None` cursor starts from genesis when ascending and
    /// from the most recent event when descending.
    pub async fn poll(
        &self,
        cursor: Option<EventID>,
        limit: u32,
        order: EventOrder,
    ) -> DropletResult<PollResult> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let page = self.client.query_events(cursor.clone(), limit, order).await?;
        // Some nodes omit the cursor on the last page; fall back to the last
        // event, then to where this poll started
        let next_cursor = page
            .next_cursor
            .or_else(|| page.data.last().map(|e| e.id.clone()))
            .or(cursor);
        Ok(PollResult {
            events: page.data,
            next_cursor,
            has_next_page: page.has_next_page,
        })
    }

    /// Page ascending from `start` until the end of the log or the page cap
    async fn fetch_pages(
        &self,
        start: Option<EventID>,
    ) -> DropletResult<(Vec<DropletEventView>, Option<EventID>)> {
        let config = self.client.config();
        let mut cursor = start;
        let mut events = Vec::new();
        for page_no in 0..config.max_backfill_pages {
            let result = self
                .poll(cursor.clone(), config.page_size, EventOrder::Ascending)
                .await?;
            events.extend(result.events);
            cursor = result.next_cursor;
            if !result.has_next_page {
                return Ok((events, cursor));
            }
            debug!("[EventFetcher] page {} done, continuing", page_no + 1);
        }
        warn!(
            "[EventFetcher] stopped after {} pages with more events pending",
            config.max_backfill_pages
        );
        Ok((events, cursor))
    }

    /// Run one fetch and apply it to the cache unless it went stale.
    pub async fn fetch_once(&self) -> FetchOutcome {
        let metrics = self.client.metrics();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let session = self.session_id.load(Ordering::SeqCst);
        metrics.event_polls.inc();

        let (mode, start) = {
            let cache = self.cache.read().await;
            if cache.is_primed() {
                (FetchMode::Tail, cache.cursor().cloned())
            } else {
                (FetchMode::FullRefetch, None)
            }
        };

        let (events, cursor) = match self.fetch_pages(start).await {
            Ok(fetched) => fetched,
            Err(e) => {
                metrics.event_poll_errors.inc();
                debug!("[EventFetcher] poll failed, skipping tick: {}", e);
                return FetchOutcome::Failed(e);
            }
        };

        let mut cache = self.cache.write().await;
        if self.session_id.load(Ordering::SeqCst) != session {
            return self.discard(StaleReason::Session, generation);
        }
        if generation <= self.applied_generation.load(Ordering::SeqCst) {
            return self.discard(StaleReason::Generation, generation);
        }
        self.applied_generation.store(generation, Ordering::SeqCst);

        let report = cache.ingest(&events);
        cache.set_cursor(cursor);
        cache.mark_fetched();

        metrics.cached_events.set(cache.len() as i64);
        metrics
            .events_unrecognized
            .inc_by(report.undecodable as u64);
        for event in &report.new_events {
            metrics
                .events_ingested
                .with_label_values(&[event.data.kind()])
                .inc();
        }
        if mode == FetchMode::FullRefetch {
            info!(
                "[EventFetcher] full refetch loaded {} events ({} cached)",
                report.new_events.len(),
                cache.len()
            );
        } else if !report.new_events.is_empty() {
            debug!("[EventFetcher] {} new events", report.new_events.len());
        }
        FetchOutcome::Applied { mode, report }
    }

    fn discard(&self, reason: StaleReason, generation: u64) -> FetchOutcome {
        self.client
            .metrics()
            .stale_responses_discarded
            .with_label_values(&[reason.label()])
            .inc();
        debug!(
            "[EventFetcher] discarding response of fetch #{} ({})",
            generation,
            reason.label()
        );
        FetchOutcome::Stale(reason)
    }

    /// Fetch unless a fetch completed within the freshness window
    pub async fn refresh_if_stale(&self) -> Option<FetchOutcome> {
        if self.cache.read().await.is_fresh() {
            return None;
        }
        Some(self.fetch_once().await)
    }

    /// Drop all cached events. The next fetch starts again from genesis and
    /// any fetch already in flight is discarded.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        let fence = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.applied_generation.store(fence, Ordering::SeqCst);
        cache.invalidate();
        let metrics = self.client.metrics();
        metrics.cache_invalidations.inc();
        metrics.cached_events.set(0);
        info!("[EventFetcher] event cache invalidated");
    }

    /// Wake the polling loop for an immediate fetch
    pub fn trigger(&self) {
        self.refresh.notify_one();
    }

    /// Poll on the configured interval until cancelled. Batches of new events
    /// are forwarded to `updates`.
    pub fn spawn(
        self: Arc<Self>,
        updates: mpsc::Sender<Vec<Observed<DropletEvent>>>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(updates, cancel).await })
    }

    async fn run(
        &self,
        updates: mpsc::Sender<Vec<Observed<DropletEvent>>>,
        cancel: CancellationToken,
    ) {
        let poll_interval = self.client.config().poll_interval();
        info!(
            "[EventFetcher] starting, polling every {:?}",
            poll_interval
        );
        let mut interval = time::interval(poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("[EventFetcher] cancelled");
                    return;
                }
                _ = interval.tick() => {}
                _ = self.refresh.notified() => {
                    debug!("[EventFetcher] refresh requested");
                }
            }

            let outcome = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("[EventFetcher] cancelled during fetch");
                    return;
                }
                outcome = self.fetch_once() => outcome,
            };
            if let FetchOutcome::Applied { report, .. } = outcome {
                if !report.new_events.is_empty()
                    && updates.send(report.new_events).await.is_err()
                {
                    debug!("[EventFetcher] update receiver dropped");
                }
            }
        }
    }
}
