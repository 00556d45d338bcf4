pub mod rules;
pub mod score;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DetectionConfig;
use crate::core::aggregate::AggregateState;
use crate::core::{AnomalyFlag, EnrichedTx};
use rules::AddressRule;

/// A run of transactions with sub-window pairwise gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RapidWindow {
    pub start: DateTime<Utc>,
    pub txids: Vec<String>,
}

/// A single transaction above the high-value threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighValueTx {
    pub txid: String,
    pub amount_btc: f64,
    pub time: DateTime<Utc>,
}

/// A transaction whose size jumped relative to its predecessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spike {
    pub txid: String,
    pub amount_btc: f64,
    pub previous_btc: f64,
}

/// A counterparty interacting more often than the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequentInteractor {
    pub address: String,
    pub total_transactions: u64,
    pub total_volume_btc: f64,
}

/// Everything the detector found: per-address flags plus stream-level lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub flags: Vec<AnomalyFlag>,
    pub rapid_windows: Vec<RapidWindow>,
    pub high_value: Vec<HighValueTx>,
    pub spikes: Vec<Spike>,
    pub frequent: Vec<FrequentInteractor>,
}

/// Runs all per-address rules plus the stream-level scans.
pub struct Detector {
    rules: Vec<Box<dyn AddressRule + Send + Sync>>,
    cfg: DetectionConfig,
}

impl Detector {
    pub fn new(cfg: DetectionConfig) -> Self {
        Self {
            rules: rules::default_rules(),
            cfg,
        }
    }

    /// Pure function of aggregates and the enriched stream. Address iteration
    /// is sorted, so the output is byte-stable for identical input.
    pub fn detect(&self, state: &AggregateState, stream: &[EnrichedTx]) -> DetectionReport {
        let mut flags = Vec::new();
        for (address, stats) in &state.addresses {
            for rule in &self.rules {
                flags.extend(rule.evaluate(address, stats, &self.cfg));
            }
        }

        DetectionReport {
            flags,
            rapid_windows: state
                .rapid_windows
                .iter()
                .map(|(start, txids)| RapidWindow {
                    start: *start,
                    txids: txids.clone(),
                })
                .collect(),
            high_value: scan_high_value(stream, &self.cfg),
            spikes: scan_spikes(stream, &self.cfg),
            frequent: frequent_interactors(state, &self.cfg),
        }
    }
}

fn scan_high_value(stream: &[EnrichedTx], cfg: &DetectionConfig) -> Vec<HighValueTx> {
    stream
        .iter()
        .filter(|tx| tx.amount_btc.abs() > cfg.high_value_btc)
        .map(|tx| HighValueTx {
            txid: tx.txid.clone(),
            amount_btc: tx.amount_btc,
            time: tx.time,
        })
        .collect()
}

fn scan_spikes(stream: &[EnrichedTx], cfg: &DetectionConfig) -> Vec<Spike> {
    stream
        .windows(2)
        .filter(|w| w[1].amount_btc.abs() > cfg.spike_ratio * w[0].amount_btc.abs())
        .map(|w| Spike {
            txid: w[1].txid.clone(),
            amount_btc: w[1].amount_btc,
            previous_btc: w[0].amount_btc,
        })
        .collect()
}

fn frequent_interactors(state: &AggregateState, cfg: &DetectionConfig) -> Vec<FrequentInteractor> {
    state
        .addresses
        .iter()
        .filter(|(_, s)| s.total_transactions > cfg.frequent_interactor_txs)
        .map(|(address, s)| FrequentInteractor {
            address: address.clone(),
            total_transactions: s.total_transactions,
            total_volume_btc: s.total_volume_btc,
        })
        .collect()
}
