use chrono::{DateTime, Utc};

use crate::core::{Direction, EnrichedTx, PriceQuote, Transaction, sats_to_btc};

/// How many counterparty addresses to show before collapsing to a count.
const DISPLAY_LIMIT: usize = 3;

/// Format a counterparty address list for display.
/// Empty → "N/A"; up to `limit` entries comma-joined; beyond that the first
/// `limit` plus a " (+n)" remainder suffix.
pub fn format_address_list(addrs: &[String], limit: usize) -> String {
    if addrs.is_empty() {
        return "N/A".to_string();
    }
    if addrs.len() <= limit {
        return addrs.join(", ");
    }
    format!("{} (+{})", addrs[..limit].join(", "), addrs.len() - limit)
}

/// Combine a raw transaction, the wallet's net satoshi amount for it, and a
/// resolved price into an enriched record.
///
/// Direction is inferred once: the transaction is outgoing when any input
/// address is the monitored wallet, incoming otherwise. The sign of
/// `amount_btc` follows the direction; `net_sats` is taken by magnitude.
pub fn enrich(
    tx: &Transaction,
    net_sats: i64,
    quote: PriceQuote,
    wallet: &str,
) -> EnrichedTx {
    let sources: Vec<String> = tx.input_addresses().map(str::to_string).collect();
    let destinations: Vec<String> = tx.output_addresses().map(str::to_string).collect();

    let direction = if sources.iter().any(|a| a == wallet) {
        Direction::Outgoing
    } else {
        Direction::Incoming
    };

    let magnitude = sats_to_btc(net_sats.abs());
    let amount_btc = match direction {
        Direction::Incoming => magnitude,
        Direction::Outgoing => -magnitude,
    };

    let (origin_display, dest_display) = match direction {
        Direction::Outgoing => (
            wallet.to_string(),
            format_address_list(&destinations, DISPLAY_LIMIT),
        ),
        Direction::Incoming => (
            format_address_list(&sources, DISPLAY_LIMIT),
            wallet.to_string(),
        ),
    };

    EnrichedTx {
        txid: tx.txid.clone(),
        amount_btc,
        usd_value: amount_btc * quote.usd,
        time: DateTime::<Utc>::from_timestamp(tx.time, 0).unwrap_or_default(),
        confirmations: tx.confirmations,
        direction,
        sources,
        destinations,
        origin_display,
        dest_display,
    }
}
