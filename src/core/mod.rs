pub mod aggregate;
pub mod enrich;
pub mod pipeline;
pub mod summary;

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Satoshis per bitcoin. Raw amounts cross the API boundary as integer
/// satoshis and are converted to floating BTC exactly once, here.
pub const SATS_PER_BTC: f64 = 100_000_000.0;

pub fn sats_to_btc(sats: i64) -> f64 {
    sats as f64 / SATS_PER_BTC
}

/// A wallet's full history as returned by the ledger API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletInfo {
    pub address: String,
    #[serde(rename = "total_received")]
    pub total_received_sat: i64,
    #[serde(rename = "total_sent")]
    pub total_sent_sat: i64,
    #[serde(rename = "final_balance")]
    pub final_balance_sat: i64,
    #[serde(rename = "n_tx")]
    pub tx_count: usize,
    #[serde(rename = "txs", default)]
    pub transactions: Vec<Transaction>,
}

/// A raw ledger transaction. Never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "hash")]
    pub txid: String,
    pub time: i64,
    #[serde(default)]
    pub confirmations: u32,
    #[serde(default)]
    pub inputs: Vec<TxInput>,
    #[serde(rename = "out", default)]
    pub outputs: Vec<TxOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxInput {
    #[serde(default)]
    pub prev_out: Option<TxOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxOutput {
    #[serde(default)]
    pub addr: Option<String>,
    #[serde(default)]
    pub value: u64,
}

impl Transaction {
    /// Non-empty source addresses, in input order.
    pub fn input_addresses(&self) -> impl Iterator<Item = &str> {
        self.inputs
            .iter()
            .filter_map(|i| i.prev_out.as_ref())
            .filter_map(|o| o.addr.as_deref())
            .filter(|a| !a.is_empty())
    }

    /// Non-empty destination addresses, in output order.
    pub fn output_addresses(&self) -> impl Iterator<Item = &str> {
        self.outputs
            .iter()
            .filter_map(|o| o.addr.as_deref())
            .filter(|a| !a.is_empty())
    }
}

/// One USD quote for a requested timestamp (nearest prior daily close for
/// historical lookups).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub timestamp: i64,
    pub usd: f64,
}

/// Transfer direction from the monitored wallet's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// A transaction enriched with the wallet's net amount, resolved price, and
/// display counterparties. One per raw transaction, immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedTx {
    pub txid: String,
    /// Net BTC moved for the wallet; positive = receipt, negative = send.
    pub amount_btc: f64,
    /// `amount_btc` at the resolved historical price.
    pub usd_value: f64,
    pub time: DateTime<Utc>,
    pub confirmations: u32,
    pub direction: Direction,
    /// All non-empty input addresses.
    pub sources: Vec<String>,
    /// All non-empty output addresses.
    pub destinations: Vec<String>,
    pub origin_display: String,
    pub dest_display: String,
}

/// Per-counterparty accumulator. The monitored wallet is never a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressStats {
    pub total_transactions: u64,
    pub total_volume_btc: f64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Transactions where the wallet received.
    pub incoming: u64,
    /// Transactions where the wallet sent.
    pub outgoing: u64,
    /// Absolute BTC amounts, in stream order.
    pub amounts: Vec<f64>,
    /// Hours since the previous transaction in the *global* stream, recorded
    /// from this address's second appearance onward.
    pub deltas_hours: Vec<f64>,
    /// BTC volume per UTC calendar day.
    pub daily_volume: BTreeMap<NaiveDate, f64>,
}

/// Why an address was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlagReason {
    HighVariance,
    HighValueLowCount,
    UnusuallyFrequent,
    DailySpam,
}

impl FlagReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagReason::HighVariance => "high_variance",
            FlagReason::HighValueLowCount => "high_value_low_count",
            FlagReason::UnusuallyFrequent => "unusually_frequent",
            FlagReason::DailySpam => "daily_spam",
        }
    }
}

/// A single anomaly finding for one address. An address may carry several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFlag {
    pub address: String,
    pub reason: FlagReason,
    pub detail: String,
    /// The statistic that tripped the rule (stddev, volume, mean delta, ...).
    pub metric: f64,
    pub total_transactions: u64,
    pub total_volume_btc: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl RiskCategory {
    pub fn from_score(score: u8) -> Self {
        if score >= 2 {
            RiskCategory::High
        } else if score == 1 {
            RiskCategory::Medium
        } else {
            RiskCategory::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Low => "LOW",
            RiskCategory::Medium => "MEDIUM",
            RiskCategory::High => "HIGH",
        }
    }
}

/// Final risk classification: one increment per distinct triggered rule class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub score: u8,
    pub factors: Vec<String>,
    pub category: RiskCategory,
}
