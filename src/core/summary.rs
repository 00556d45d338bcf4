use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::core::aggregate::AggregateState;
use crate::core::EnrichedTx;

/// Transaction size bands in BTC, matching `SIZE_BAND_LABELS`.
pub const SIZE_BANDS: [f64; 4] = [0.001, 0.01, 0.1, 1.0];
pub const SIZE_BAND_LABELS: [&str; 5] =
    ["<0.001", "0.001-0.01", "0.01-0.1", "0.1-1", ">=1"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LargestTx {
    pub txid: String,
    pub amount_btc: f64,
    pub time: DateTime<Utc>,
}

/// Stream-level aggregates for the report. Pure snapshot, recomputed per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Sum of signed BTC amounts over the enriched stream.
    pub total_signed_btc: f64,
    /// Transaction with the largest absolute amount.
    pub largest: Option<LargestTx>,
    /// UTC day with the most transactions.
    pub busiest_day: Option<(NaiveDate, usize)>,
    /// Hour of day (0-23, UTC) with the most transactions.
    pub busiest_hour: Option<(u32, usize)>,
    pub unique_counterparties: usize,
    /// Signed USD value per calendar month ("YYYY-MM").
    pub monthly_pnl: BTreeMap<String, f64>,
    /// Counts per size band, indexed as `SIZE_BAND_LABELS`.
    pub size_histogram: [u64; 5],
}

pub fn size_band(amount_btc: f64) -> usize {
    let abs = amount_btc.abs();
    SIZE_BANDS.iter().position(|b| abs < *b).unwrap_or(SIZE_BANDS.len())
}

pub fn compute_summary(stream: &[EnrichedTx], state: &AggregateState) -> SummaryStats {
    let mut daily_count: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let mut hourly_count: BTreeMap<u32, usize> = BTreeMap::new();
    let mut monthly_pnl: BTreeMap<String, f64> = BTreeMap::new();
    let mut size_histogram = [0u64; 5];
    let mut largest: Option<&EnrichedTx> = None;

    for tx in stream {
        *daily_count.entry(tx.time.date_naive()).or_insert(0) += 1;
        *hourly_count.entry(tx.time.hour()).or_insert(0) += 1;
        let month = format!("{:04}-{:02}", tx.time.year(), tx.time.month());
        *monthly_pnl.entry(month).or_insert(0.0) += tx.usd_value;
        size_histogram[size_band(tx.amount_btc)] += 1;
        if largest.is_none_or(|l| tx.amount_btc.abs() > l.amount_btc.abs()) {
            largest = Some(tx);
        }
    }

    // Strictly-greater comparisons keep the earliest key on ties.
    let busiest_day = daily_count
        .iter()
        .fold(None, |acc: Option<(NaiveDate, usize)>, (day, count)| {
            match acc {
                Some((_, best)) if *count <= best => acc,
                _ => Some((*day, *count)),
            }
        });
    let busiest_hour = hourly_count
        .iter()
        .fold(None, |acc: Option<(u32, usize)>, (hour, count)| match acc {
            Some((_, best)) if *count <= best => acc,
            _ => Some((*hour, *count)),
        });

    SummaryStats {
        total_signed_btc: stream.iter().map(|t| t.amount_btc).sum(),
        largest: largest.map(|t| LargestTx {
            txid: t.txid.clone(),
            amount_btc: t.amount_btc,
            time: t.time,
        }),
        busiest_day,
        busiest_hour,
        unique_counterparties: state.addresses.len(),
        monthly_pnl,
        size_histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionConfig;
    use crate::core::aggregate::aggregate;
    use crate::core::enrich::enrich;
    use crate::core::{PriceQuote, Transaction, TxInput, TxOutput};

    const WALLET: &str = "1Wallet";
    const T0: i64 = 1_700_000_000; // 2023-11-14 22:13:20 UTC
    const HOUR: i64 = 3600;
    const DAY: i64 = 86_400;

    fn enriched_at(txid: &str, time: i64, counterparty: &str, sats: i64, usd: f64) -> EnrichedTx {
        let (sources, dests) = if sats < 0 {
            (WALLET, counterparty)
        } else {
            (counterparty, WALLET)
        };
        let tx = Transaction {
            txid: txid.into(),
            time,
            confirmations: 1,
            inputs: vec![TxInput {
                prev_out: Some(TxOutput {
                    addr: Some(sources.to_string()),
                    value: 0,
                }),
            }],
            outputs: vec![TxOutput {
                addr: Some(dests.to_string()),
                value: 0,
            }],
        };
        enrich(&tx, sats, PriceQuote { timestamp: time, usd }, WALLET)
    }

    fn summarize(stream: &[EnrichedTx]) -> SummaryStats {
        let state = aggregate(stream, WALLET, &DetectionConfig::default());
        compute_summary(stream, &state)
    }

    #[test]
    fn empty_stream_is_well_defined() {
        let s = summarize(&[]);
        assert_eq!(s.total_signed_btc, 0.0);
        assert!(s.largest.is_none());
        assert!(s.busiest_day.is_none());
        assert!(s.busiest_hour.is_none());
        assert_eq!(s.unique_counterparties, 0);
        assert!(s.monthly_pnl.is_empty());
        assert_eq!(s.size_histogram, [0; 5]);
    }

    #[test]
    fn size_band_edges() {
        assert_eq!(size_band(0.0005), 0);
        assert_eq!(size_band(0.001), 1);
        assert_eq!(size_band(0.005), 1);
        assert_eq!(size_band(0.01), 2);
        assert_eq!(size_band(0.05), 2);
        assert_eq!(size_band(0.1), 3);
        assert_eq!(size_band(0.999), 3);
        assert_eq!(size_band(1.0), 4);
        assert_eq!(size_band(-2.5), 4);
    }

    #[test]
    fn signed_total_and_largest() {
        let stream = vec![
            enriched_at("t1", T0, "1A", 50_000_000, 100.0),
            enriched_at("t2", T0 + HOUR, "1A", -200_000_000, 100.0),
        ];
        let s = summarize(&stream);
        assert!((s.total_signed_btc - (-1.5)).abs() < 1e-9);
        // Largest is by magnitude, not sign.
        assert_eq!(s.largest.as_ref().unwrap().txid, "t2");
        assert_eq!(s.largest.unwrap().amount_btc, -2.0);
    }

    #[test]
    fn busiest_day_and_hour() {
        let stream = vec![
            enriched_at("t1", T0, "1A", 1_000, 1.0),
            enriched_at("t2", T0 + 60, "1A", 1_000, 1.0),
            enriched_at("t3", T0 + DAY, "1A", 1_000, 1.0),
        ];
        let s = summarize(&stream);
        let (day, count) = s.busiest_day.unwrap();
        assert_eq!(day, stream[0].time.date_naive());
        assert_eq!(count, 2);
        let (hour, hour_count) = s.busiest_hour.unwrap();
        // t1, t2, and t3 (one day later) all land in hour 22 UTC.
        assert_eq!(hour, 22);
        assert_eq!(hour_count, 3);
    }

    #[test]
    fn busiest_day_tie_keeps_earliest() {
        let stream = vec![
            enriched_at("t1", T0, "1A", 1_000, 1.0),
            enriched_at("t2", T0 + DAY, "1A", 1_000, 1.0),
        ];
        let s = summarize(&stream);
        assert_eq!(s.busiest_day.unwrap().0, stream[0].time.date_naive());
    }

    #[test]
    fn monthly_pnl_groups_by_calendar_month() {
        // November receipt at 100 USD/BTC, December send at 200 USD/BTC.
        let stream = vec![
            enriched_at("t1", T0, "1A", 100_000_000, 100.0),
            enriched_at("t2", T0 + 30 * DAY, "1A", -100_000_000, 200.0),
        ];
        let s = summarize(&stream);
        assert_eq!(s.monthly_pnl["2023-11"], 100.0);
        assert_eq!(s.monthly_pnl["2023-12"], -200.0);
    }

    #[test]
    fn unique_counterparties_counted() {
        let stream = vec![
            enriched_at("t1", T0, "1A", 1_000, 1.0),
            enriched_at("t2", T0 + HOUR, "1B", 1_000, 1.0),
            enriched_at("t3", T0 + 2 * HOUR, "1A", 1_000, 1.0),
        ];
        assert_eq!(summarize(&stream).unique_counterparties, 2);
    }

    #[test]
    fn histogram_buckets_fill() {
        let stream = vec![
            enriched_at("t1", T0, "1A", 50_000, 1.0),          // 0.0005
            enriched_at("t2", T0 + 1, "1A", 500_000, 1.0),     // 0.005
            enriched_at("t3", T0 + 2, "1A", 5_000_000, 1.0),   // 0.05
            enriched_at("t4", T0 + 3, "1A", 50_000_000, 1.0),  // 0.5
            enriched_at("t5", T0 + 4, "1A", 500_000_000, 1.0), // 5.0
        ];
        assert_eq!(summarize(&stream).size_histogram, [1, 1, 1, 1, 1]);
    }
}
