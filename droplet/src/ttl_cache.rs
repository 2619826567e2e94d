// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Generic TTL (Time-To-Live) cache for reducing RPC calls.
//!
//! Holds a single value per cache instance together with the instant it was
//! stored. Used for the per-user activity summary, which is expensive to read
//! and changes only when the user acts.

use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug)]
pub struct TtlCache<T: Clone> {
    entry: RwLock<Option<(T, Instant)>>,
    cache_duration: Duration,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(cache_duration: Duration) -> Self {
        Self {
            entry: RwLock::new(None),
            cache_duration,
        }
    }

    pub fn with_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// Return the cached value if it is still fresh
    pub async fn get_if_valid(&self) -> Option<T> {
        let entry = self.entry.read().await;
        entry
            .as_ref()
            .filter(|(_, updated_at)| updated_at.elapsed() < self.cache_duration)
            .map(|(value, _)| value.clone())
    }

    pub async fn update(&self, value: T) {
        let mut entry = self.entry.write().await;
        *entry = Some((value, Instant::now()));
    }

    /// Force the next access to fetch fresh data
    pub async fn invalidate(&self) {
        let mut entry = self.entry.write().await;
        *entry = None;
    }
}
