use crate::config::DetectionConfig;
use crate::core::{AddressStats, AnomalyFlag, FlagReason};

/// A detection rule evaluated independently for each counterparty address.
/// Returns zero or more flags (daily spam can fire once per day).
pub trait AddressRule {
    fn name(&self) -> &'static str;
    fn evaluate(
        &self,
        address: &str,
        stats: &AddressStats,
        cfg: &DetectionConfig,
    ) -> Vec<AnomalyFlag>;
}

/// All per-address rules, in evaluation order.
pub fn default_rules() -> Vec<Box<dyn AddressRule + Send + Sync>> {
    vec![
        Box::new(HighVarianceRule),
        Box::new(HighValueLowCountRule),
        Box::new(UnusuallyFrequentRule),
        Box::new(DailySpamRule),
    ]
}

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population standard deviation. Order-independent by construction.
pub fn std_dev(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64;
    var.sqrt()
}

fn flag(
    address: &str,
    reason: FlagReason,
    detail: String,
    metric: f64,
    stats: &AddressStats,
) -> AnomalyFlag {
    AnomalyFlag {
        address: address.to_string(),
        reason,
        detail,
        metric,
        total_transactions: stats.total_transactions,
        total_volume_btc: stats.total_volume_btc,
    }
}

// --- Per-address rules ---

struct HighVarianceRule;
impl AddressRule for HighVarianceRule {
    fn name(&self) -> &'static str {
        "high_variance"
    }
    fn evaluate(
        &self,
        address: &str,
        stats: &AddressStats,
        cfg: &DetectionConfig,
    ) -> Vec<AnomalyFlag> {
        let sd = std_dev(&stats.amounts);
        if sd > cfg.variance_stddev_btc && stats.total_transactions > cfg.variance_min_txs {
            vec![flag(
                address,
                FlagReason::HighVariance,
                format!("high variance in transaction amounts (stddev {sd:.4} BTC)"),
                sd,
                stats,
            )]
        } else {
            Vec::new()
        }
    }
}

struct HighValueLowCountRule;
impl AddressRule for HighValueLowCountRule {
    fn name(&self) -> &'static str {
        "high_value_low_count"
    }
    fn evaluate(
        &self,
        address: &str,
        stats: &AddressStats,
        cfg: &DetectionConfig,
    ) -> Vec<AnomalyFlag> {
        if stats.total_volume_btc > cfg.high_volume_btc
            && stats.total_transactions < cfg.low_count_txs
        {
            vec![flag(
                address,
                FlagReason::HighValueLowCount,
                format!(
                    "high volume with few transactions ({:.4} BTC over {})",
                    stats.total_volume_btc, stats.total_transactions
                ),
                stats.total_volume_btc,
                stats,
            )]
        } else {
            Vec::new()
        }
    }
}

struct UnusuallyFrequentRule;
impl AddressRule for UnusuallyFrequentRule {
    fn name(&self) -> &'static str {
        "unusually_frequent"
    }
    fn evaluate(
        &self,
        address: &str,
        stats: &AddressStats,
        cfg: &DetectionConfig,
    ) -> Vec<AnomalyFlag> {
        if stats.deltas_hours.len() > cfg.frequent_min_deltas {
            let m = mean(&stats.deltas_hours);
            if m < cfg.frequent_mean_hours {
                return vec![flag(
                    address,
                    FlagReason::UnusuallyFrequent,
                    format!("unusually frequent transactions (mean gap {m:.2}h)"),
                    m,
                    stats,
                )];
            }
        }
        Vec::new()
    }
}

struct DailySpamRule;
impl AddressRule for DailySpamRule {
    fn name(&self) -> &'static str {
        "daily_spam"
    }
    fn evaluate(
        &self,
        address: &str,
        stats: &AddressStats,
        cfg: &DetectionConfig,
    ) -> Vec<AnomalyFlag> {
        if stats.amounts.len() <= cfg.daily_min_samples {
            return Vec::new();
        }
        stats
            .daily_volume
            .iter()
            .filter(|(_, vol)| **vol > cfg.daily_volume_btc)
            .map(|(day, vol)| {
                flag(
                    address,
                    FlagReason::DailySpam,
                    format!("high volume on {day}, possibly suspicious ({vol:.4} BTC)"),
                    *vol,
                    stats,
                )
            })
            .collect()
    }
}
