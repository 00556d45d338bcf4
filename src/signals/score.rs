use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::config::DetectionConfig;
use crate::core::aggregate::AggregateState;
use crate::core::{AnomalyFlag, EnrichedTx, FlagReason, RiskCategory, RiskSummary};

/// Roll the detector output and stream-level metrics into a bounded score:
/// one increment per distinct triggered rule class, fully recomputed per run.
pub fn risk_summary(
    state: &AggregateState,
    stream: &[EnrichedTx],
    flags: &[AnomalyFlag],
    cfg: &DetectionConfig,
) -> RiskSummary {
    let mut score = 0u8;
    let mut factors = Vec::new();

    if has_rapid_counterparty(state, flags, cfg) {
        score += 1;
        factors.push("rapid counterparty interaction frequency".to_string());
    }

    let busiest = busiest_day_volume(stream);
    if busiest > cfg.whale_day_btc {
        score += 1;
        factors.push(format!("whale-scale daily volume ({busiest:.4} BTC)"));
    }

    let rate = daily_tx_rate(stream);
    if rate > cfg.daily_tx_rate {
        score += 1;
        factors.push(format!(
            "suspicious transaction frequency ({rate:.2} tx/day)"
        ));
    }

    RiskSummary {
        score,
        factors,
        category: RiskCategory::from_score(score),
    }
}

/// Either the per-address frequency rule already fired, or some counterparty
/// shows a high interactions-per-hour rate over its observed lifetime. The
/// two heuristics differ in unit and basis and are kept separate on purpose.
fn has_rapid_counterparty(
    state: &AggregateState,
    flags: &[AnomalyFlag],
    cfg: &DetectionConfig,
) -> bool {
    if flags
        .iter()
        .any(|f| f.reason == FlagReason::UnusuallyFrequent)
    {
        return true;
    }
    state.addresses.values().any(|s| {
        let hours = (s.last_seen - s.first_seen).num_seconds() as f64 / 3600.0;
        // Zero observed span means no measurable rate.
        hours > 0.0 && s.total_transactions as f64 / hours >= cfg.rate_per_hour
    })
}

/// Largest single-UTC-day volume over the whole stream, in absolute BTC.
fn busiest_day_volume(stream: &[EnrichedTx]) -> f64 {
    let mut per_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for tx in stream {
        *per_day.entry(tx.time.date_naive()).or_insert(0.0) += tx.amount_btc.abs();
    }
    per_day.values().cloned().fold(0.0, f64::max)
}

/// Mean transactions per active day; 0 when there are no active days.
fn daily_tx_rate(stream: &[EnrichedTx]) -> f64 {
    let days: std::collections::BTreeSet<NaiveDate> =
        stream.iter().map(|tx| tx.time.date_naive()).collect();
    if days.is_empty() {
        return 0.0;
    }
    stream.len() as f64 / days.len() as f64
}
