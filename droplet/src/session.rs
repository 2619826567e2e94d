// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-connection session state.
//!
//! A [`DropletSession`] is created when a wallet connects and owns every
//! cache the client keeps: the event cache, resolved addresses, the cached
//! activity summary and the cleanup overlay. [`DropletSession::reset`]
//! drops all of it and stops the background poller; results of work that
//! was in flight at that moment are discarded.

use droplet_json_rpc_types::TransactionBlockResponse;
use droplet_types::{DropletId, ObjectAddress};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::actions::{self, extract_droplet_id, validate_claim, validate_create, CreateDropletForm};
use crate::balances::{fetch_coin_balances, CoinBalance};
use crate::cleanup::{
    cleanup_failure_notification, cleanup_success_notification, CleanupOverlay, CleanupState,
};
use crate::droplet_client::{DropletClient, DropletClientInner};
use crate::encoding::decode_user_activity_summary;
use crate::error::{DropletError, DropletResult};
use crate::event_cache::EventCache;
use crate::event_fetcher::{EventFetcher, FetchOutcome};
use crate::notifications::{notifications_for, Notification};
use crate::reconciler::{reconcile_all, reconcile_ids, reconcile_user};
use crate::resolver::AddressResolver;
use crate::transaction_builder::{build_claim_tx, build_cleanup_tx, build_create_droplet_tx};
use crate::ttl_cache::TtlCache;
use crate::types::{
    filter_droplets, now_ms, DashboardSource, DropletFilter, DropletSummary, UserActivitySummary,
    UserDashboard,
};
use crate::wallet::WalletAdapter;

const NOTIFICATION_CHANNEL_SIZE: usize = 256;
const FETCHER_CHANNEL_SIZE: usize = 32;

pub const CLAIM_SUCCESS_TITLE: &str = "Successfully claimed!";
pub const CLAIM_FAILED_TITLE: &str = "Failed to claim";
pub const CREATE_SUCCESS_TITLE: &str = "Droplet Created Successfully!";
pub const CREATE_FAILED_TITLE: &str = "Failed to Create Droplet";

// Next session id across all sessions in the process
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Result of a successful creation
#[derive(Debug, Clone)]
pub struct CreatedDroplet {
    pub response: TransactionBlockResponse,
    // `None` when the id could not be read from the response
    pub droplet_id: Option<DropletId>,
}

pub struct DropletSession<P> {
    client: Arc<DropletClient<P>>,
    wallet: Arc<dyn WalletAdapter>,
    session_id: Arc<AtomicU64>,
    fetcher: Arc<EventFetcher<P>>,
    resolver: AddressResolver<P>,
    activity: TtlCache<UserActivitySummary>,
    overlay: Mutex<CleanupOverlay>,
    notifications: broadcast::Sender<Notification>,
    background: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl<P> DropletSession<P>
where
    P: DropletClientInner + 'static,
{
    pub fn create(client: Arc<DropletClient<P>>, wallet: Arc<dyn WalletAdapter>) -> Self {
        let ttl = client.config().cache_ttl();
        let session_id = Arc::new(AtomicU64::new(
            NEXT_SESSION_ID.fetch_add(1, Ordering::SeqCst),
        ));
        let cache = Arc::new(RwLock::new(EventCache::new(ttl)));
        let fetcher = Arc::new(EventFetcher::new(
            client.clone(),
            cache,
            session_id.clone(),
        ));
        let (notifications, _) = broadcast::channel(NOTIFICATION_CHANNEL_SIZE);
        info!(
            "[Session] created session {} for {:?}",
            session_id.load(Ordering::SeqCst),
            wallet.address()
        );
        Self {
            resolver: AddressResolver::new(client.clone()),
            client,
            wallet,
            session_id,
            fetcher,
            activity: TtlCache::new(ttl),
            overlay: Mutex::new(CleanupOverlay::new()),
            notifications,
            background: Mutex::new(None),
        }
    }

    pub fn id(&self) -> u64 {
        self.session_id.load(Ordering::SeqCst)
    }

    pub fn client(&self) -> &Arc<DropletClient<P>> {
        &self.client
    }

    pub fn fetcher(&self) -> &Arc<EventFetcher<P>> {
        &self.fetcher
    }

    pub fn resolver(&self) -> &AddressResolver<P> {
        &self.resolver
    }

    pub fn wallet_address(&self) -> Option<ObjectAddress> {
        self.wallet.address()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    fn notify(&self, notification: Notification) {
        // No subscribers is fine
        let _ = self.notifications.send(notification);
    }

    fn overlay(&self) -> MutexGuard<'_, CleanupOverlay> {
        self.overlay.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start polling in the background. Newly observed events are turned
    /// into notifications for subscribers. Calling it twice is a no-op.
    pub fn start(&self) {
        let mut background = self.background.lock().unwrap_or_else(|e| e.into_inner());
        if background.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel(FETCHER_CHANNEL_SIZE);
        let poller = self.fetcher.clone().spawn(tx, cancel.clone());

        let notifications = self.notifications.clone();
        tokio::spawn(async move {
            while let Some(events) = rx.recv().await {
                for notification in notifications_for(&events) {
                    let _ = notifications.send(notification);
                }
            }
            debug!("[Session] event forwarding stopped");
        });
        *background = Some((cancel, poller));
    }

    /// Disconnect: stop polling and drop every cache. Responses that
    /// arrive afterwards are discarded.
    pub async fn reset(&self) {
        let previous = self.session_id.swap(
            NEXT_SESSION_ID.fetch_add(1, Ordering::SeqCst),
            Ordering::SeqCst,
        );
        let background = self
            .background
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some((cancel, poller)) = background {
            cancel.cancel();
            if let Err(e) = poller.await {
                warn!("[Session] poller ended abnormally: {}", e);
            }
        }
        self.fetcher.invalidate().await;
        self.resolver.clear();
        self.activity.invalidate().await;
        self.overlay().clear();
        info!("[Session] session {} reset, now {}", previous, self.id());
    }

    /// Fetch now, regardless of cache freshness
    pub async fn refresh(&self) -> FetchOutcome {
        self.fetcher.fetch_once().await
    }

    fn ensure_current(&self, session: u64) -> DropletResult<()> {
        if self.id() != session {
            debug!("[Session] discarding result of session {}", session);
            return Err(DropletError::StaleSession);
        }
        Ok(())
    }

    /// Overlay pending cleanups and fill in resolved addresses
    async fn present(&self, mut summaries: Vec<DropletSummary>) -> Vec<DropletSummary> {
        self.overlay().apply(&mut summaries);
        self.resolver.fill_addresses(&mut summaries).await;
        summaries
    }

    /// Every droplet seen in the event log, in creation order
    pub async fn all_droplets(&self, filter: DropletFilter) -> DropletResult<Vec<DropletSummary>> {
        let session = self.id();
        self.fetcher.refresh_if_stale().await;
        let summaries = reconcile_all(&*self.fetcher.cache().read().await, now_ms());
        let summaries = self.present(summaries).await;
        self.ensure_current(session)?;
        Ok(filter_droplets(&summaries, filter))
    }

    /// Confirmed state of one droplet, without the optimistic overlay
    async fn confirmed_summary(&self, droplet_id: &DropletId) -> Option<DropletSummary> {
        let lookup = |cache: &EventCache| {
            reconcile_ids(cache, std::slice::from_ref(droplet_id), now_ms())
                .into_iter()
                .next()
        };
        if let Some(summary) = lookup(&*self.fetcher.cache().read().await) {
            return Some(summary);
        }
        self.fetcher.refresh_if_stale().await;
        lookup(&*self.fetcher.cache().read().await)
    }

    /// One droplet as displayed, including a pending cleanup
    pub async fn droplet(&self, droplet_id: &DropletId) -> Option<DropletSummary> {
        let summary = self.confirmed_summary(droplet_id).await?;
        self.present(vec![summary]).await.into_iter().next()
    }

    pub fn cleanup_state(&self, droplet_id: &DropletId) -> CleanupState {
        self.overlay().state(droplet_id)
    }

    /// Registry aggregate for `user`, cached for the freshness window.
    /// A failing read is retried for `activity-retry-ms`, then logged and
    /// reported as absent. A result that arrives after a reset is dropped.
    async fn activity_summary(&self, user: ObjectAddress) -> Option<UserActivitySummary> {
        if let Some(summary) = self.activity.get_if_valid().await {
            return Some(summary);
        }
        let session = self.id();
        let budget = self.client.config().activity_retry_budget();
        let results = match self
            .client
            .get_user_activity_summary_with_retry(user, budget)
            .await
        {
            Ok(results) => results,
            Err(e) => {
                warn!("[Session] activity summary for {} unavailable: {}", user, e);
                return None;
            }
        };
        match decode_user_activity_summary(&results) {
            Ok(summary) => {
                if self.id() == session {
                    self.activity.update(summary.clone()).await;
                    // A reset may have landed while the write lock was awaited
                    if self.id() == session {
                        return Some(summary);
                    }
                    self.activity.invalidate().await;
                }
                self.client
                    .metrics()
                    .stale_responses_discarded
                    .with_label_values(&["activity_session"])
                    .inc();
                debug!(
                    "[Session] dropping activity summary for {} from session {}",
                    user, session
                );
                None
            }
            Err(e) => {
                self.client
                    .metrics()
                    .decode_faults
                    .with_label_values(&[e.value_kind()])
                    .inc();
                warn!("[Session] activity summary for {} undecodable: {}", user, e);
                None
            }
        }
    }

    /// Droplets the connected user created and claimed from.
    ///
    /// The registry's aggregate read decides which droplets belong to the
    /// user; their state is reconciled from cached events. If the aggregate
    /// read fails or is empty, the user's own events in the cache are used
    /// instead.
    pub async fn dashboard(&self, filter: DropletFilter) -> DropletResult<UserDashboard> {
        let user = self
            .wallet
            .address()
            .ok_or(DropletError::WalletNotConnected)?;
        let session = self.id();

        let (aggregate, _) = tokio::join!(
            self.activity_summary(user),
            self.fetcher.refresh_if_stale()
        );
        let now = now_ms();
        let (source, created, claimed) = {
            let cache = self.fetcher.cache().read().await;
            match aggregate.filter(|s| !s.is_empty()) {
                Some(summary) => (
                    DashboardSource::Aggregate,
                    reconcile_ids(&cache, &summary.created_ids, now),
                    reconcile_ids(&cache, &summary.claimed_ids, now),
                ),
                None => {
                    let own = reconcile_user(user, &cache, now);
                    (DashboardSource::Events, own.created, own.claimed)
                }
            }
        };
        let created = self.present(created).await;
        let claimed = self.present(claimed).await;
        self.ensure_current(session)?;

        debug!(
            "[Session] dashboard for {} from {:?}: {} created, {} claimed",
            user,
            source,
            created.len(),
            claimed.len()
        );
        Ok(UserDashboard {
            source,
            created: filter_droplets(&created, filter),
            claimed: filter_droplets(&claimed, filter),
        })
    }

    pub async fn balances(&self) -> DropletResult<Vec<CoinBalance>> {
        let owner = self
            .wallet
            .address()
            .ok_or(DropletError::WalletNotConnected)?;
        fetch_coin_balances(&self.client, owner).await
    }

    /// Coin type of a droplet, falling back to the configured default
    async fn droplet_coin_type(&self, droplet: ObjectAddress) -> String {
        match self.client.get_droplet_coin_type(droplet).await {
            Ok(coin_type) => coin_type,
            Err(e) => {
                let fallback = self.client.config().coin_type.clone();
                warn!(
                    "[Session] coin type of {} unknown ({}), using {}",
                    droplet, e, fallback
                );
                fallback
            }
        }
    }

    /// Something changed on chain because of the user
    async fn after_user_action(&self) {
        self.activity.invalidate().await;
        self.fetcher.trigger();
    }

    pub async fn claim(
        &self,
        droplet_id: &str,
        claimer_name: &str,
    ) -> DropletResult<TransactionBlockResponse> {
        let (droplet_id, claimer_name) = validate_claim(droplet_id, claimer_name)?;
        if self.wallet.address().is_none() {
            return Err(DropletError::WalletNotConnected);
        }
        let result = self.submit_claim(&droplet_id, &claimer_name).await;
        match &result {
            Ok(response) => {
                let digest: String = response.digest.chars().take(10).collect();
                self.notify(Notification::success(
                    CLAIM_SUCCESS_TITLE,
                    format!("Transaction: {digest}..."),
                ));
                self.after_user_action().await;
            }
            Err(e) => self.notify(Notification::failure(CLAIM_FAILED_TITLE, e)),
        }
        result
    }

    async fn submit_claim(
        &self,
        droplet_id: &DropletId,
        claimer_name: &str,
    ) -> DropletResult<TransactionBlockResponse> {
        let address = self
            .resolver
            .resolve_address(droplet_id)
            .await
            .ok_or_else(|| DropletError::DropletNotFound(droplet_id.to_string()))?;
        let coin_type = self.droplet_coin_type(address).await;
        let tx = build_claim_tx(
            self.client.config(),
            address,
            droplet_id,
            claimer_name,
            &coin_type,
        );
        actions::submit(self.wallet.as_ref(), tx, self.client.metrics()).await
    }

    pub async fn create_droplet(&self, form: &CreateDropletForm) -> DropletResult<CreatedDroplet> {
        if self.wallet.address().is_none() {
            return Err(DropletError::WalletNotConnected);
        }
        let balances = self.balances().await?;
        let params = validate_create(form, &balances)?;
        let tx = build_create_droplet_tx(
            self.client.config(),
            &params.coin_type,
            params.amount,
            params.receiver_limit,
            params.expiry_hours,
            &params.message,
        );
        let response = match actions::submit(self.wallet.as_ref(), tx, self.client.metrics()).await
        {
            Ok(response) => response,
            Err(e) => {
                self.notify(Notification::failure(CREATE_FAILED_TITLE, &e));
                return Err(e);
            }
        };

        let droplet_id = extract_droplet_id(&response);
        let body = match &droplet_id {
            Some(id) => {
                format!("Droplet ID: {id} - Share this ID to distribute your airdrop!")
            }
            None => {
                warn!(
                    "[Session] no droplet id in creation result {}",
                    response.digest
                );
                "Droplet created. Its ID will appear on your dashboard shortly.".to_string()
            }
        };
        self.notify(Notification::success(CREATE_SUCCESS_TITLE, body));
        self.after_user_action().await;
        Ok(CreatedDroplet {
            response,
            droplet_id,
        })
    }

    /// Clean up an expired droplet, showing it closed while the transaction
    /// is pending and rolling back if it fails.
    pub async fn cleanup(&self, droplet_id: &DropletId) -> DropletResult<TransactionBlockResponse> {
        if self.wallet.address().is_none() {
            return Err(DropletError::WalletNotConnected);
        }
        let summary = self
            .confirmed_summary(droplet_id)
            .await
            .ok_or_else(|| DropletError::DropletNotFound(droplet_id.to_string()))?;
        self.overlay().begin(&summary)?;
        debug!("[Session] cleanup of {} pending", droplet_id);

        match self.submit_cleanup(&summary).await {
            Ok(response) => {
                self.overlay().succeed(droplet_id);
                self.notify(cleanup_success_notification(&response));
                // The close event only shows up after a full refetch
                self.fetcher.invalidate().await;
                self.after_user_action().await;
                Ok(response)
            }
            Err(e) => {
                if let Some(previous) = self.overlay().fail(droplet_id) {
                    debug!(
                        "[Session] cleanup of {} rolled back to is_closed={}",
                        droplet_id, previous
                    );
                }
                self.notify(cleanup_failure_notification(&e));
                Err(e)
            }
        }
    }

    async fn submit_cleanup(
        &self,
        summary: &DropletSummary,
    ) -> DropletResult<TransactionBlockResponse> {
        let address = match summary.droplet_address {
            Some(address) => Some(address),
            None => self.resolver.resolve_address(&summary.droplet_id).await,
        }
        .ok_or_else(|| DropletError::DropletNotFound(summary.droplet_id.to_string()))?;
        let coin_type = self.droplet_coin_type(address).await;
        let tx = build_cleanup_tx(self.client.config(), address, &coin_type);
        actions::submit(self.wallet.as_ref(), tx, self.client.metrics()).await
    }
}
