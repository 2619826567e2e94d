// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use anyhow::anyhow;
use droplet_config::Config;
use droplet_types::{ObjectAddress, TypeTag, CLOCK_OBJECT_ID, SUI_COIN_TYPE};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PACKAGE_ID: &str =
    "0x16c8dd907e254555c7a5d592f7b10b6040e19d07be94fc4adc6cdb7138011a55";
pub const DEFAULT_REGISTRY_ID: &str =
    "0x8ceec78670c97b8b01a0d50566a85177b8f910527759d93ef50486ef8c10f2e1";
pub const DEFAULT_MODULE: &str = "dropnew";

// Largest page the node accepts for event queries
pub const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    #[default]
    Testnet,
    Devnet,
    Mainnet,
}

impl Network {
    pub fn fullnode_url(&self) -> &'static str {
        match self {
            Network::Testnet => "https://fullnode.testnet.sui.io:443",
            Network::Devnet => "https://fullnode.devnet.sui.io:443",
            Network::Mainnet => "https://fullnode.mainnet.sui.io:443",
        }
    }
}

impl FromStr for Network {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "testnet" | "test" => Ok(Network::Testnet),
            "devnet" | "dev" => Ok(Network::Devnet),
            "mainnet" | "main" => Ok(Network::Mainnet),
            other => Err(anyhow!("Unknown network `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DropletClientConfig {
    // Network whose public fullnode is used unless `rpc-url` is set.
    pub network: Network,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    // Published package holding the droplet module.
    pub package_id: ObjectAddress,
    pub module: String,
    // Shared registry object mapping droplet IDs to droplet objects.
    pub registry_id: ObjectAddress,
    pub clock_id: ObjectAddress,
    // Coin type used when the caller does not pick one.
    pub coin_type: String,
    pub poll_interval_ms: u64,
    pub page_size: u32,
    // Freshness window of the event cache and the activity summary.
    pub cache_ttl_secs: u64,
    pub resolver_concurrency: usize,
    // How long a failing activity summary read is retried before the
    // dashboard falls back to events.
    pub activity_retry_ms: u64,
    // Upper bound on pages read by a full refetch.
    pub max_backfill_pages: usize,
}

impl Default for DropletClientConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            rpc_url: None,
            package_id: parse_const(DEFAULT_PACKAGE_ID),
            module: DEFAULT_MODULE.to_string(),
            registry_id: parse_const(DEFAULT_REGISTRY_ID),
            clock_id: CLOCK_OBJECT_ID,
            coin_type: SUI_COIN_TYPE.to_string(),
            poll_interval_ms: 3_000,
            page_size: MAX_PAGE_SIZE,
            cache_ttl_secs: 30,
            resolver_concurrency: 5,
            activity_retry_ms: 2_000,
            max_backfill_pages: 200,
        }
    }
}

// Compiled-in ids are known to be well formed
fn parse_const(s: &str) -> ObjectAddress {
    ObjectAddress::from_str(s).unwrap_or(ObjectAddress::ZERO)
}

impl Config for DropletClientConfig {}

impl DropletClientConfig {
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            ..Default::default()
        }
    }

    pub fn rpc_url(&self) -> &str {
        self.rpc_url
            .as_deref()
            .unwrap_or_else(|| self.network.fullnode_url())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn activity_retry_budget(&self) -> Duration {
        Duration::from_millis(self.activity_retry_ms)
    }

    /// `{package}::{module}::{function}`
    pub fn move_target(&self, function: &str) -> String {
        format!("{}::{}::{}", self.package_id, self.module, function)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.module.is_empty() {
            return Err(anyhow!("module must not be empty"));
        }
        if self.package_id == ObjectAddress::ZERO {
            return Err(anyhow!("package-id must be set"));
        }
        if self.registry_id == ObjectAddress::ZERO {
            return Err(anyhow!("registry-id must be set"));
        }
        TypeTag::from_str(&self.coin_type)
            .map_err(|e| anyhow!("Invalid coin-type `{}`: {e}", self.coin_type))?;
        if self.poll_interval_ms == 0 {
            return Err(anyhow!("poll-interval-ms must be greater than 0"));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(anyhow!(
                "page-size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            ));
        }
        if self.resolver_concurrency == 0 {
            return Err(anyhow!("resolver-concurrency must be greater than 0"));
        }
        if self.max_backfill_pages == 0 {
            return Err(anyhow!("max-backfill-pages must be greater than 0"));
        }
        if let Some(url) = &self.rpc_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(anyhow!("rpc-url must be an http(s) URL, got `{url}`"));
            }
        }
        Ok(())
    }
}
