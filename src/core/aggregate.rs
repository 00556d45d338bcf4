use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DetectionConfig;
use crate::core::{AddressStats, Direction, EnrichedTx};

/// Output of the aggregation fold: per-counterparty stats plus the global
/// rapid-sequence index. Owned exclusively by the run that built it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateState {
    pub addresses: BTreeMap<String, AddressStats>,
    /// Runs of transactions whose pairwise gaps fall under the configured
    /// window, keyed by the time of the transaction that opened the run.
    pub rapid_windows: BTreeMap<DateTime<Utc>, Vec<String>>,
}

/// Fold the chronologically ordered stream into per-address statistics.
///
/// This is a single stateful pass: the per-address map and the last-seen
/// global timestamp advance together, because each address's time deltas are
/// measured against the previous transaction in the *global* stream, not the
/// address's own previous transaction.
pub fn aggregate(stream: &[EnrichedTx], wallet: &str, cfg: &DetectionConfig) -> AggregateState {
    let mut state = AggregateState::default();
    let mut prev: Option<&EnrichedTx> = None;
    let mut open_window: Option<DateTime<Utc>> = None;

    for tx in stream {
        let gap_hours = prev.map(|p| (tx.time - p.time).num_seconds() as f64 / 3600.0);

        if let (Some(gap), Some(p)) = (gap_hours, prev) {
            if gap < cfg.rapid_window_hours {
                let start = *open_window.get_or_insert(p.time);
                let members = state.rapid_windows.entry(start).or_default();
                if members.is_empty() {
                    members.push(p.txid.clone());
                }
                members.push(tx.txid.clone());
            } else {
                open_window = None;
            }
        }

        let amount = tx.amount_btc.abs();
        let day = tx.time.date_naive();

        let mut counterparties: Vec<&str> = tx
            .sources
            .iter()
            .chain(tx.destinations.iter())
            .map(String::as_str)
            .filter(|a| *a != wallet)
            .collect();
        counterparties.sort_unstable();
        counterparties.dedup();

        for addr in counterparties {
            let stats = state
                .addresses
                .entry(addr.to_string())
                .or_insert_with(|| AddressStats {
                    total_transactions: 0,
                    total_volume_btc: 0.0,
                    first_seen: tx.time,
                    last_seen: tx.time,
                    incoming: 0,
                    outgoing: 0,
                    amounts: Vec::new(),
                    deltas_hours: Vec::new(),
                    daily_volume: BTreeMap::new(),
                });

            stats.total_transactions += 1;
            stats.total_volume_btc += amount;
            *stats.daily_volume.entry(day).or_insert(0.0) += amount;
            stats.last_seen = tx.time;
            match tx.direction {
                Direction::Incoming => stats.incoming += 1,
                Direction::Outgoing => stats.outgoing += 1,
            }
            // Second appearance onward: record the global inter-tx gap.
            if !stats.amounts.is_empty() {
                if let Some(gap) = gap_hours {
                    stats.deltas_hours.push(gap);
                }
            }
            stats.amounts.push(amount);
        }

        prev = Some(tx);
    }

    state
}
