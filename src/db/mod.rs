pub mod schema;

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::price::{FallbackQuotes, PriceError};

/// Local day-indexed BTC/USD price table. Acts as the resolver's secondary
/// source when the primary API is unreachable.
///
/// Rows use the CoinGecko snapshot format: `snapped_at` is
/// "YYYY-MM-DD HH:MM:SS UTC", which compares correctly as text.
pub struct PriceDb {
    conn: Connection,
}

impl PriceDb {
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    pub fn insert_snapshot(
        &self,
        snapped_at: &str,
        price: f64,
        market_cap: i64,
        total_volume: i64,
    ) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO crypto_data (snapped_at, price, market_cap, total_volume)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![snapped_at, price, market_cap, total_volume],
        )?;
        Ok(())
    }

    /// Most recent stored price at or before UTC midnight of `day`.
    pub fn price_at_or_before(&self, day: NaiveDate) -> Result<Option<f64>, rusqlite::Error> {
        let midnight = day.format("%Y-%m-%d 00:00:00 UTC").to_string();
        let mut stmt = self.conn.prepare(
            "SELECT price FROM crypto_data WHERE snapped_at <= ?1
             ORDER BY snapped_at DESC LIMIT 1",
        )?;
        let mut rows = stmt.query(rusqlite::params![midnight])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub fn snapshot_count(&self) -> Result<usize, rusqlite::Error> {
        self.conn.query_row("SELECT COUNT(*) FROM crypto_data", [], |row| {
            row.get::<_, i64>(0).map(|c| c as usize)
        })
    }

    /// Bulk-load price snapshots from a CoinGecko-style CSV
    /// (`snapped_at,price,market_cap,total_volume`). Empty numeric fields
    /// default to 0; short rows are skipped.
    pub fn import_csv(&self, path: &Path) -> Result<usize, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let tx = self.conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO crypto_data (snapped_at, price, market_cap, total_volume)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for line in content.lines().skip(1) {
                // skip header
                let parts: Vec<&str> = line.splitn(4, ',').collect();
                if parts.len() < 2 {
                    continue;
                }
                let snapped_at = parts[0].trim();
                let price: f64 = match parts[1].trim().parse() {
                    Ok(p) => p,
                    Err(_) => continue,
                };
                let market_cap = parts
                    .get(2)
                    .and_then(|s| s.trim().parse::<f64>().ok())
                    .unwrap_or(0.0) as i64;
                let total_volume = parts
                    .get(3)
                    .and_then(|s| s.trim().parse::<f64>().ok())
                    .unwrap_or(0.0) as i64;
                stmt.execute(rusqlite::params![snapped_at, price, market_cap, total_volume])?;
                count += 1;
            }
        }
        tx.commit()?;
        Ok(count)
    }
}

impl FallbackQuotes for &PriceDb {
    fn close_at_or_before(&self, day: NaiveDate) -> Result<f64, PriceError> {
        self.price_at_or_before(day)
            .map_err(PriceError::Db)?
            .ok_or(PriceError::NoQuote)
    }
}
