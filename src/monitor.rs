use std::time::Duration;

use tracing::{info, warn};

use crate::core::sats_to_btc;
use crate::rpc::Ledger;

/// Poll the wallet and alert on balance changes. Runs until interrupted;
/// fetch failures are logged and the next tick retried.
pub async fn monitor_wallet<L: Ledger>(ledger: &L, address: &str, interval_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    let mut previous: Option<f64> = None;

    info!("Monitoring {address} every {interval_secs}s");
    loop {
        ticker.tick().await;
        let wallet = match ledger.fetch_wallet(address).await {
            Ok(w) => w,
            Err(e) => {
                warn!("Error monitoring wallet: {e}");
                continue;
            }
        };
        let balance = sats_to_btc(wallet.final_balance_sat);
        if let Some(prev) = previous {
            if balance != prev {
                println!(
                    "[ALERT] Wallet balance changed! Previous: {prev:.8} BTC, Current: {balance:.8} BTC"
                );
            }
        }
        previous = Some(balance);
    }
}
