// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Client library for the droplet token-airdrop Move package.
//!
//! Events are polled by [`event_fetcher`] into a per-session cache, turned
//! into [`types::DropletSummary`] values by [`reconciler`], and completed
//! with on-chain addresses by [`resolver`]. User actions go through
//! [`session::DropletSession`].

pub mod actions;
pub mod balances;
pub mod cleanup;
pub mod config;
pub mod droplet_client;
pub mod encoding;
pub mod error;
pub mod event_cache;
pub mod event_fetcher;
pub mod events;
pub mod jsonrpc_client;
pub mod links;
pub mod metrics;
pub mod notifications;
pub mod reconciler;
pub mod resolver;
pub mod session;
pub mod transaction_builder;
pub mod ttl_cache;
pub mod types;
pub mod wallet;

#[cfg(test)]
mod mock_client;

pub use config::{DropletClientConfig, Network};
pub use droplet_client::{DropletClient, DropletClientInner, DropletRpcClient};
pub use error::{ContractAbort, DropletError, DropletResult};
pub use session::DropletSession;
pub use types::{DropletFilter, DropletSummary, UserDashboard};

#[macro_export]
macro_rules! retry_with_max_elapsed_time {
    ($func:expr, $max_elapsed_time:expr) => {{
        // Delays in seconds, with jitter:
        // 0.4, 0.8, 1.6, 3.2, 6.4, 12.8, 25.6, 51.2, 102.4, 120, 120 ...
        let backoff = backoff::ExponentialBackoff {
            initial_interval: std::time::Duration::from_millis(400),
            randomization_factor: 0.1,
            multiplier: 2.0,
            max_interval: std::time::Duration::from_secs(120),
            max_elapsed_time: Some($max_elapsed_time),
            ..Default::default()
        };
        backoff::future::retry(backoff, || {
            let fut = async {
                let result = $func.await;
                match result {
                    Ok(_) => {
                        return Ok(result);
                    }
                    Err(e) => {
                        // Every error is retried until max_elapsed_time
                        tracing::debug!("Retrying due to error: {:?}", e);
                        return Err(backoff::Error::transient(e));
                    }
                }
            };
            std::boxed::Box::pin(fut)
        })
        .await
    }};
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    async fn lookup_ok() -> anyhow::Result<u64> {
        Ok(7)
    }

    async fn lookup_err() -> anyhow::Result<u64> {
        tracing::info!("lookup_err");
        Err(anyhow::anyhow!("node unavailable"))
    }

    #[tokio::test]
    async fn test_retry_with_max_elapsed_time() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        // Succeeds on the first attempt even with a tiny budget
        let max_elapsed_time = Duration::from_millis(20);
        let value = retry_with_max_elapsed_time!(lookup_ok(), max_elapsed_time)
            .unwrap()
            .unwrap();
        assert_eq!(value, 7);

        // Always failing: gives up before the budget runs out by much
        let max_elapsed_time = Duration::from_secs(2);
        let instant = std::time::Instant::now();
        retry_with_max_elapsed_time!(lookup_err(), max_elapsed_time).unwrap_err();
        assert!(instant.elapsed() < max_elapsed_time * 3);
    }
}
