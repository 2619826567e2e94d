// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use anyhow::Context;
use async_trait::async_trait;
use clap::*;
use droplet::config::{DropletClientConfig, Network as DropletNetwork};
use droplet::transaction_builder::MoveCallTx;
use droplet::types::{format_amount, DropletSummary, SUI_DECIMALS};
use droplet::wallet::{WalletAdapter, WalletError};
use droplet_config::Config;
use droplet_json_rpc_types::TransactionBlockResponse;
use droplet_types::ObjectAddress;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[clap(rename_all = "kebab-case")]
pub struct Args {
    /// YAML or JSON client config; compiled-in defaults otherwise
    #[clap(long = "config-path", global = true)]
    pub config_path: Option<PathBuf>,
    /// Overrides the network of the config file
    #[clap(long = "network", global = true)]
    pub network: Option<Network>,
    #[clap(subcommand)]
    pub command: DropletCommand,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Network {
    Testnet,
    Devnet,
    Mainnet,
}

impl From<Network> for DropletNetwork {
    fn from(network: Network) -> Self {
        match network {
            Network::Testnet => DropletNetwork::Testnet,
            Network::Devnet => DropletNetwork::Devnet,
            Network::Mainnet => DropletNetwork::Mainnet,
        }
    }
}

#[derive(Parser)]
#[clap(rename_all = "kebab-case")]
pub enum DropletCommand {
    /// Droplets an address created and claimed from
    #[clap(name = "dashboard")]
    Dashboard {
        #[clap(long = "address")]
        address: ObjectAddress,
        #[clap(long = "filter", default_value = "all")]
        filter: droplet::DropletFilter,
    },
    /// Every droplet in the event log
    #[clap(name = "droplets")]
    Droplets {
        #[clap(long = "filter", default_value = "all")]
        filter: droplet::DropletFilter,
    },
    /// Print live notifications until interrupted
    #[clap(name = "watch")]
    Watch,
    /// Resolve droplet ids to object addresses
    #[clap(name = "resolve")]
    Resolve {
        #[clap(required = true)]
        ids: Vec<String>,
    },
    /// Show where a shared link leads
    #[clap(name = "check-link")]
    CheckLink { link: String },
    /// Non-zero coin balances of an address
    #[clap(name = "balances")]
    Balances {
        #[clap(long = "address")]
        address: ObjectAddress,
    },
    #[clap(name = "create-config-template")]
    CreateConfigTemplate {
        #[clap(long = "path")]
        path: PathBuf,
    },
}

/// Load the client config, apply the network override and validate it
pub fn load_config(
    path: Option<&Path>,
    network: Option<Network>,
) -> anyhow::Result<DropletClientConfig> {
    let mut config = match path {
        Some(path) => DropletClientConfig::load(path)
            .with_context(|| format!("Couldn't load config {}", path.display()))?,
        None => DropletClientConfig::default(),
    };
    if let Some(network) = network {
        config.network = network.into();
    }
    config.validate()?;
    Ok(config)
}

pub fn write_config_template(path: &Path) -> anyhow::Result<()> {
    DropletClientConfig::default().save(path)?;
    info!("Config template written to {}", path.display());
    Ok(())
}

/// Wallet that only knows an address. Read-only commands use it to look at
/// another account; it refuses to sign.
pub struct WatchOnlyWallet {
    address: Option<ObjectAddress>,
}

impl WatchOnlyWallet {
    pub fn new(address: Option<ObjectAddress>) -> Self {
        Self { address }
    }
}

#[async_trait]
impl WalletAdapter for WatchOnlyWallet {
    fn address(&self) -> Option<ObjectAddress> {
        self.address
    }

    async fn sign_and_execute(
        &self,
        tx: MoveCallTx,
    ) -> Result<TransactionBlockResponse, WalletError> {
        Err(WalletError(format!(
            "watch-only wallet cannot sign {}",
            tx.target()
        )))
    }
}

pub fn summary_header() -> String {
    format!(
        "{:<8} {:<10} {:>16} {:>16} {:>11} {:>10}  {}",
        "ID", "STATUS", "TOTAL", "CLAIMED", "CLAIMS", "LEFT", "ADDRESS"
    )
}

/// One table row; amounts in whole coins
pub fn summary_row(summary: &DropletSummary, now_ms: u64) -> String {
    let left = match summary.remaining_hours(now_ms) {
        Some(hours) => format!("{hours}h"),
        None => "-".to_string(),
    };
    let address = summary
        .droplet_address
        .map_or_else(|| "?".to_string(), |a| a.to_hex_literal());
    format!(
        "{:<8} {:<10} {:>16} {:>16} {:>11} {:>10}  {}",
        summary.droplet_id,
        summary.status(),
        format_amount(summary.total_amount as u128, SUI_DECIMALS, 4),
        format_amount(summary.claimed_amount as u128, SUI_DECIMALS, 4),
        format!("{}/{}", summary.num_claimed, summary.receiver_limit),
        left,
        address
    )
}
