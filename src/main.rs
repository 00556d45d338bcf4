mod config;
mod core;
mod db;
mod monitor;
mod price;
mod report;
mod rpc;
mod signals;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::core::pipeline::run_analysis;
use crate::db::PriceDb;
use crate::price::PriceResolver;
use crate::rpc::{BlockchainClient, CryptoCompareClient};

#[derive(Parser, Debug)]
#[command(name = "walletlens", about = "Bitcoin wallet behavioral analytics")]
struct Cli {
    /// Bitcoin wallet address to analyze
    #[arg(long)]
    wallet: Option<String>,

    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Poll the wallet and alert on balance changes instead of analyzing
    #[arg(long)]
    monitor: bool,

    /// Import a price snapshot CSV into the local price table, then exit
    #[arg(long, value_name = "CSV")]
    import_prices: Option<PathBuf>,

    /// Emit the analysis report as JSON instead of the console view
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("walletlens=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config);

    if let Some(csv_path) = &cli.import_prices {
        import_prices(&config, csv_path);
        return;
    }

    let Some(wallet) = cli.wallet.as_deref() else {
        eprintln!("Please provide a wallet address with --wallet");
        std::process::exit(2);
    };

    let timeout = Duration::from_secs(config.api.timeout_secs);
    let ledger = BlockchainClient::new(&config.api.ledger_url, timeout);

    if cli.monitor {
        monitor::monitor_wallet(&ledger, wallet, config.monitor.interval_secs).await;
        return;
    }

    let price_client = CryptoCompareClient::new(&config.api.price_url, timeout);
    let price_db = open_price_table(&config.price_db.path);
    let mut resolver = PriceResolver::new(&price_client, price_db.as_ref());

    match run_analysis(&ledger, &mut resolver, wallet, &config.detection).await {
        Ok(analysis) => {
            if cli.json {
                match serde_json::to_string_pretty(&analysis) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        tracing::error!("Failed to serialize report: {e}");
                        std::process::exit(1);
                    }
                }
            } else {
                report::render(&analysis);
            }
        }
        Err(e) => {
            tracing::error!("Error fetching wallet: {e}");
            std::process::exit(1);
        }
    }
}

/// Open the local price table when a snapshot file is present. Analysis
/// works without it; the resolver just loses its fallback source.
fn open_price_table(path: &str) -> Option<PriceDb> {
    if !Path::new(path).exists() {
        tracing::info!("No local price table at {path}, running without fallback");
        return None;
    }
    match PriceDb::open(Path::new(path)) {
        Ok(db) => {
            tracing::info!("Local price table opened at {path}");
            Some(db)
        }
        Err(e) => {
            tracing::warn!("Failed to open price table {path}: {e}");
            None
        }
    }
}

fn import_prices(config: &Config, csv_path: &Path) {
    let db_path = Path::new(&config.price_db.path);
    if let Some(parent) = db_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::error!("Failed to create {}: {e}", parent.display());
            std::process::exit(1);
        }
    }
    let db = match PriceDb::open(db_path) {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to open price table: {e}");
            std::process::exit(1);
        }
    };
    match db.import_csv(csv_path) {
        Ok(count) => println!(
            "Imported {count} price snapshots into {}",
            config.price_db.path
        ),
        Err(e) => {
            tracing::error!("Failed to import {}: {e}", csv_path.display());
            std::process::exit(1);
        }
    }
}
