// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use clap::*;
use droplet::balances::fetch_coin_balances;
use droplet::links::{parse_link, LinkTarget};
use droplet::metrics::DropletMetrics;
use droplet::resolver::AddressResolver;
use droplet::types::now_ms;
use droplet::{DropletRpcClient, DropletSession};
use droplet_cli::{
    load_config, summary_header, summary_row, write_config_template, Args, DropletCommand,
    WatchOnlyWallet,
};
use droplet_types::{DropletId, ObjectAddress};
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    if let DropletCommand::CreateConfigTemplate { path } = &args.command {
        write_config_template(path)?;
        return Ok(());
    }
    if let DropletCommand::CheckLink { link } = &args.command {
        match parse_link(link) {
            LinkTarget::Claim(id) => println!("claim form for droplet {id}"),
            LinkTarget::Home => println!("home page"),
        }
        return Ok(());
    }

    let config = Arc::new(load_config(args.config_path.as_deref(), args.network)?);
    tracing::debug!("Using fullnode {}", config.rpc_url());
    let registry = prometheus::Registry::new();
    let metrics = Arc::new(DropletMetrics::new(&registry));
    let client = Arc::new(DropletRpcClient::new(config, metrics));

    match args.command {
        DropletCommand::Dashboard { address, filter } => {
            let session = session(&client, Some(address));
            let dashboard = session.dashboard(filter).await?;
            let now = now_ms();
            println!("Created ({} from {:?})", dashboard.created.len(), dashboard.source);
            print_table(&dashboard.created, now);
            println!();
            println!("Claimed ({})", dashboard.claimed.len());
            print_table(&dashboard.claimed, now);
        }
        DropletCommand::Droplets { filter } => {
            let session = session(&client, None);
            let droplets = session.all_droplets(filter).await?;
            print_table(&droplets, now_ms());
        }
        DropletCommand::Watch => {
            let session = session(&client, None);
            let mut notifications = session.subscribe();
            session.start();
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    received = notifications.recv() => match received {
                        Ok(n) => println!("[{:?}] {}: {}", n.level, n.title, n.body),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!("Skipped {} notifications", skipped);
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            session.reset().await;
        }
        DropletCommand::Resolve { ids } => {
            let ids = ids
                .iter()
                .map(|raw| DropletId::from_str(raw))
                .collect::<Result<Vec<_>, _>>()?;
            let resolver = AddressResolver::new(client.clone());
            let resolved = resolver.resolve_batch(&ids).await;
            for id in &ids {
                match resolved.get(id) {
                    Some(address) => println!("{id} {address}"),
                    None => println!("{id} not found"),
                }
            }
        }
        DropletCommand::Balances { address } => {
            for coin in fetch_coin_balances(&client, address).await? {
                println!("{:<12} {}", coin.symbol, coin.formatted);
            }
        }
        DropletCommand::CreateConfigTemplate { .. } | DropletCommand::CheckLink { .. } => {}
    }
    Ok(())
}

fn session(
    client: &Arc<DropletRpcClient>,
    address: Option<ObjectAddress>,
) -> DropletSession<droplet::jsonrpc_client::DropletJsonRpcClient> {
    DropletSession::create(client.clone(), Arc::new(WatchOnlyWallet::new(address)))
}

fn print_table(summaries: &[droplet::DropletSummary], now: u64) {
    println!("{}", summary_header());
    for summary in summaries {
        println!("{}", summary_row(summary, now));
    }
}
