use crate::core::pipeline::AnalysisReport;
use crate::core::summary::SIZE_BAND_LABELS;
use crate::core::{Direction, RiskCategory};

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

fn category_color(category: RiskCategory) -> &'static str {
    match category {
        RiskCategory::Low => GREEN,
        RiskCategory::Medium => YELLOW,
        RiskCategory::High => RED,
    }
}

/// Render the full analysis to stdout. Presentation only; every number here
/// is computed upstream.
pub fn render(report: &AnalysisReport) {
    let w = &report.wallet;
    println!("\n--- Wallet Summary ---");
    println!("Address: {}", w.address);
    println!("Total Bitcoin Received: {:.8} BTC", w.received_btc);
    println!("Total Bitcoin Sent: {:.8} BTC", w.sent_btc);
    println!("Final Bitcoin Balance: {:.8} BTC", w.balance_btc);
    match w.balance_usd {
        Some(usd) => println!("Value of Bitcoin Balance: {usd:.2} USD"),
        None => println!("Value of Bitcoin Balance: unavailable"),
    }
    println!("Number of Transactions: {}", w.tx_count);
    if report.skipped > 0 {
        println!(
            "{YELLOW}Excluded {} transactions (amount or price unavailable){RESET}",
            report.skipped
        );
    }

    println!("\n--- Transactions ---");
    for tx in &report.enriched {
        let color = match tx.direction {
            Direction::Incoming => GREEN,
            Direction::Outgoing => RED,
        };
        println!(
            "TxID: {}, Amount: {color}{:.8} BTC{RESET}, Confirmations: {}, Time: {}, Value: {:.2} USD, {} -> {}",
            tx.txid,
            tx.amount_btc,
            tx.confirmations,
            tx.time.format("%Y-%m-%d %H:%M:%S"),
            tx.usd_value,
            tx.origin_display,
            tx.dest_display,
        );
    }

    let s = &report.summary;
    println!("\n--- Transaction Pattern Analysis ---");
    println!("Net flow: {:.8} BTC", s.total_signed_btc);
    if let Some(largest) = &s.largest {
        println!(
            "Largest transaction: {:.8} BTC ({}, {})",
            largest.amount_btc,
            largest.txid,
            largest.time.format("%Y-%m-%d %H:%M:%S")
        );
    }
    if let Some((day, count)) = s.busiest_day {
        println!("Busiest day: {day} with {count} transactions");
    }
    if let Some((hour, count)) = s.busiest_hour {
        println!("Busiest hour: {hour:02}:00 UTC with {count} transactions");
    }
    println!("Unique counterparties: {}", s.unique_counterparties);
    println!("Size distribution (BTC):");
    for (label, count) in SIZE_BAND_LABELS.iter().zip(s.size_histogram.iter()) {
        println!("  {label:>10}: {count}");
    }
    if !s.monthly_pnl.is_empty() {
        println!("Monthly profit/loss:");
        for (month, usd) in &s.monthly_pnl {
            let color = if *usd < 0.0 { RED } else { GREEN };
            println!("  {month}: {color}{usd:.2} USD{RESET}");
        }
    }

    let d = &report.detection;
    println!("\n--- Anomaly Flags ---");
    if d.flags.is_empty() {
        println!("No per-address anomalies detected");
    }
    for flag in &d.flags {
        println!(
            "{YELLOW}[{}]{RESET} {}: {} ({} txs, {:.4} BTC)",
            flag.reason.as_str(),
            flag.address,
            flag.detail,
            flag.total_transactions,
            flag.total_volume_btc
        );
    }
    for window in &d.rapid_windows {
        println!(
            "Rapid sequence from {}: {}",
            window.start.format("%Y-%m-%d %H:%M:%S"),
            window.txids.join(", ")
        );
    }
    for hv in &d.high_value {
        println!(
            "High-value transaction: {} ({:.8} BTC)",
            hv.txid, hv.amount_btc
        );
    }
    for spike in &d.spikes {
        println!(
            "Volume spike: {} jumped to {:.8} BTC from {:.8} BTC",
            spike.txid, spike.amount_btc, spike.previous_btc
        );
    }
    for freq in &d.frequent {
        println!(
            "Frequent interactor: {} ({} txs, {:.4} BTC)",
            freq.address, freq.total_transactions, freq.total_volume_btc
        );
    }

    let r = &report.risk;
    let color = category_color(r.category);
    println!("\n--- Risk Assessment ---");
    println!(
        "Risk: {color}{}{RESET} (score {})",
        r.category.as_str(),
        r.score
    );
    for factor in &r.factors {
        println!("  - {factor}");
    }
}
