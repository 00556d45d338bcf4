use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::DetectionConfig;
use crate::core::aggregate::{AggregateState, aggregate};
use crate::core::enrich::enrich;
use crate::core::summary::{SummaryStats, compute_summary};
use crate::core::{EnrichedTx, RiskSummary, sats_to_btc};
use crate::price::{FallbackQuotes, PriceResolver, PrimarySource};
use crate::rpc::{FetchError, Ledger};
use crate::signals::score::risk_summary;
use crate::signals::{DetectionReport, Detector};

/// Wallet header for the report, in BTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletSummary {
    pub address: String,
    pub received_btc: f64,
    pub sent_btc: f64,
    pub balance_btc: f64,
    /// Balance at the current spot price, when a price was resolvable.
    pub balance_usd: Option<f64>,
    pub tx_count: usize,
}

/// Everything one run produces. Owned by the run; nothing is retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub wallet: WalletSummary,
    pub enriched: Vec<EnrichedTx>,
    pub detection: DetectionReport,
    pub risk: RiskSummary,
    pub summary: SummaryStats,
    /// Transactions excluded because their amount or price was unavailable.
    pub skipped: usize,
}

/// Run the full pipeline for one wallet: fetch, enrich, aggregate, detect,
/// then summarize.
///
/// A failed whole-wallet fetch is fatal. A failed amount or price lookup for
/// a single transaction skips that transaction (counted in `skipped`) and
/// never aborts the batch.
pub async fn run_analysis<L, P, F>(
    ledger: &L,
    resolver: &mut PriceResolver<P, F>,
    address: &str,
    cfg: &DetectionConfig,
) -> Result<AnalysisReport, FetchError>
where
    L: Ledger,
    P: PrimarySource,
    F: FallbackQuotes,
{
    let wallet = ledger.fetch_wallet(address).await?;
    info!(
        "Fetched wallet {} with {} transactions",
        wallet.address,
        wallet.transactions.len()
    );

    // The aggregator depends on chronological order; the ledger does not
    // guarantee it, so sort before enrichment.
    let mut transactions = wallet.transactions.clone();
    transactions.sort_by_key(|tx| tx.time);

    let mut enriched = Vec::with_capacity(transactions.len());
    let mut skipped = 0usize;
    for tx in &transactions {
        let net_sats = match ledger.fetch_tx_amount(address, &tx.txid).await {
            Ok(sats) => sats,
            Err(e) => {
                warn!("Skipping {}: amount fetch failed: {e}", tx.txid);
                skipped += 1;
                continue;
            }
        };
        let quote = match resolver.resolve(tx.time).await {
            Ok(q) => q,
            Err(e) => {
                warn!("Skipping {}: {e}", tx.txid);
                skipped += 1;
                continue;
            }
        };
        enriched.push(enrich(tx, net_sats, quote, address));
    }
    if skipped > 0 {
        info!("Excluded {skipped} transactions from analysis");
    }

    let state: AggregateState = aggregate(&enriched, address, cfg);
    let detection = Detector::new(cfg.clone()).detect(&state, &enriched);
    let risk = risk_summary(&state, &enriched, &detection.flags, cfg);
    let summary = compute_summary(&enriched, &state);

    let balance_usd = match resolver.resolve(Utc::now().timestamp()).await {
        Ok(quote) => Some(sats_to_btc(wallet.final_balance_sat) * quote.usd),
        Err(e) => {
            debug!("No spot price for balance valuation: {e}");
            None
        }
    };

    Ok(AnalysisReport {
        wallet: WalletSummary {
            address: wallet.address,
            received_btc: sats_to_btc(wallet.total_received_sat),
            sent_btc: sats_to_btc(wallet.total_sent_sat),
            balance_btc: sats_to_btc(wallet.final_balance_sat),
            balance_usd,
            tx_count: wallet.tx_count,
        },
        enriched,
        detection,
        risk,
        summary,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RiskCategory, Transaction, TxInput, TxOutput, WalletInfo};
    use crate::price::PriceError;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    const WALLET: &str = "1Wallet";
    const T0: i64 = 1_700_000_000;
    const HOUR: i64 = 3600;

    struct FakeLedger {
        wallet: Option<WalletInfo>,
        amounts: HashMap<String, i64>,
    }

    impl Ledger for FakeLedger {
        async fn fetch_wallet(&self, _address: &str) -> Result<WalletInfo, FetchError> {
            self.wallet
                .clone()
                .ok_or_else(|| FetchError::Parse("ledger down".into()))
        }

        async fn fetch_tx_amount(&self, _address: &str, txid: &str) -> Result<i64, FetchError> {
            self.amounts
                .get(txid)
                .copied()
                .ok_or_else(|| FetchError::Parse(format!("no amount for {txid}")))
        }
    }

    struct FixedPrice(f64);

    impl PrimarySource for &FixedPrice {
        async fn daily_close(&self, _timestamp: i64) -> Result<f64, PriceError> {
            Ok(self.0)
        }
    }

    struct NoFallback;

    impl FallbackQuotes for NoFallback {
        fn close_at_or_before(&self, _day: NaiveDate) -> Result<f64, PriceError> {
            Err(PriceError::NoQuote)
        }
    }

    fn raw_tx(txid: &str, time: i64, source: &str) -> Transaction {
        Transaction {
            txid: txid.into(),
            time,
            confirmations: 2,
            inputs: vec![TxInput {
                prev_out: Some(TxOutput {
                    addr: Some(source.to_string()),
                    value: 0,
                }),
            }],
            outputs: vec![TxOutput {
                addr: Some(WALLET.to_string()),
                value: 0,
            }],
        }
    }

    fn wallet_with(transactions: Vec<Transaction>) -> WalletInfo {
        WalletInfo {
            address: WALLET.into(),
            total_received_sat: 300_000_000,
            total_sent_sat: 100_000_000,
            final_balance_sat: 200_000_000,
            tx_count: transactions.len(),
            transactions,
        }
    }

    #[tokio::test]
    async fn wallet_fetch_failure_is_fatal() {
        let ledger = FakeLedger {
            wallet: None,
            amounts: HashMap::new(),
        };
        let price = FixedPrice(100.0);
        let mut resolver = PriceResolver::new(&price, None::<NoFallback>);
        let result = run_analysis(&ledger, &mut resolver, WALLET, &DetectionConfig::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn amount_failures_skip_not_abort() {
        let ledger = FakeLedger {
            wallet: Some(wallet_with(vec![
                raw_tx("t1", T0, "1A"),
                raw_tx("t2", T0 + HOUR, "1A"), // no amount available
                raw_tx("t3", T0 + 2 * HOUR, "1A"),
            ])),
            amounts: HashMap::from([("t1".to_string(), 50_000_000), ("t3".to_string(), 10_000_000)]),
        };
        let price = FixedPrice(100.0);
        let mut resolver = PriceResolver::new(&price, None::<NoFallback>);
        let report = run_analysis(&ledger, &mut resolver, WALLET, &DetectionConfig::default())
            .await
            .unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.enriched.len(), 2);
        assert!(report.enriched.iter().all(|e| e.txid != "t2"));
        // Skipped transactions vanish from aggregates too.
        assert_eq!(
            report.summary.size_histogram.iter().sum::<u64>(),
            2
        );
    }

    #[tokio::test]
    async fn unsorted_ledger_output_is_resorted() {
        let ledger = FakeLedger {
            wallet: Some(wallet_with(vec![
                raw_tx("later", T0 + HOUR, "1A"),
                raw_tx("earlier", T0, "1A"),
            ])),
            amounts: HashMap::from([
                ("later".to_string(), 10_000_000),
                ("earlier".to_string(), 10_000_000),
            ]),
        };
        let price = FixedPrice(100.0);
        let mut resolver = PriceResolver::new(&price, None::<NoFallback>);
        let report = run_analysis(&ledger, &mut resolver, WALLET, &DetectionConfig::default())
            .await
            .unwrap();
        let ids: Vec<&str> = report.enriched.iter().map(|e| e.txid.as_str()).collect();
        assert_eq!(ids, vec!["earlier", "later"]);
    }

    #[tokio::test]
    async fn empty_wallet_yields_low_risk_report() {
        let ledger = FakeLedger {
            wallet: Some(wallet_with(Vec::new())),
            amounts: HashMap::new(),
        };
        let price = FixedPrice(100.0);
        let mut resolver = PriceResolver::new(&price, None::<NoFallback>);
        let report = run_analysis(&ledger, &mut resolver, WALLET, &DetectionConfig::default())
            .await
            .unwrap();
        assert_eq!(report.risk.score, 0);
        assert_eq!(report.risk.category, RiskCategory::Low);
        assert!(report.detection.flags.is_empty());
        assert_eq!(report.summary.unique_counterparties, 0);
        assert_eq!(report.wallet.balance_btc, 2.0);
        assert_eq!(report.wallet.balance_usd, Some(200.0));
    }

    #[tokio::test]
    async fn identical_runs_produce_identical_reports() {
        let ledger = FakeLedger {
            wallet: Some(wallet_with(vec![
                raw_tx("t1", T0, "1A"),
                raw_tx("t2", T0 + HOUR, "1B"),
            ])),
            amounts: HashMap::from([
                ("t1".to_string(), 250_000_000),
                ("t2".to_string(), 50_000_000),
            ]),
        };
        let price = FixedPrice(100.0);
        let mut r1 = PriceResolver::new(&price, None::<NoFallback>);
        let mut r2 = PriceResolver::new(&price, None::<NoFallback>);
        let cfg = DetectionConfig::default();
        let a = run_analysis(&ledger, &mut r1, WALLET, &cfg).await.unwrap();
        let b = run_analysis(&ledger, &mut r2, WALLET, &cfg).await.unwrap();
        assert_eq!(a.detection, b.detection);
        assert_eq!(a.risk, b.risk);
        assert_eq!(
            serde_json::to_vec(&a.detection).unwrap(),
            serde_json::to_vec(&b.detection).unwrap()
        );
    }
}
