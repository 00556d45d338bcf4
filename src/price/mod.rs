use std::collections::HashMap;

use chrono::{DateTime, NaiveDate};
use tracing::debug;

use crate::core::PriceQuote;

/// Errors from price resolution. `Unavailable` means both the primary API
/// and the local fallback table failed for the requested timestamp.
#[derive(Debug)]
pub enum PriceError {
    Unavailable,
    /// Primary API transport or decode failure.
    Fetch(String),
    /// The source had no quote covering the requested day.
    NoQuote,
    Db(rusqlite::Error),
}

impl std::fmt::Display for PriceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceError::Unavailable => write!(f, "no price available from any source"),
            PriceError::Fetch(e) => write!(f, "price fetch failed: {e}"),
            PriceError::NoQuote => write!(f, "no quote for requested day"),
            PriceError::Db(e) => write!(f, "price table error: {e}"),
        }
    }
}

impl std::error::Error for PriceError {}

/// Primary source: an external daily-close API.
#[allow(async_fn_in_trait)]
pub trait PrimarySource {
    async fn daily_close(&self, timestamp: i64) -> Result<f64, PriceError>;
}

/// Secondary source: a local day-indexed price table. Selects the most
/// recent stored quote at or before UTC midnight of the requested day.
pub trait FallbackQuotes {
    fn close_at_or_before(&self, day: NaiveDate) -> Result<f64, PriceError>;
}

/// Resolves USD prices with a single primary-then-fallback attempt and a
/// run-scoped per-day cache (same UTC day means same quote, one external call).
pub struct PriceResolver<P, F> {
    primary: P,
    fallback: Option<F>,
    cache: HashMap<NaiveDate, f64>,
}

impl<P: PrimarySource, F: FallbackQuotes> PriceResolver<P, F> {
    pub fn new(primary: P, fallback: Option<F>) -> Self {
        Self {
            primary,
            fallback,
            cache: HashMap::new(),
        }
    }

    pub async fn resolve(&mut self, timestamp: i64) -> Result<PriceQuote, PriceError> {
        let day = DateTime::from_timestamp(timestamp, 0)
            .ok_or(PriceError::NoQuote)?
            .date_naive();

        if let Some(usd) = self.cache.get(&day) {
            return Ok(PriceQuote {
                timestamp,
                usd: *usd,
            });
        }

        let usd = match self.primary.daily_close(timestamp).await {
            Ok(usd) => usd,
            Err(e) => {
                debug!("Primary price lookup failed for {day}: {e}, trying fallback");
                let fallback = self.fallback.as_ref().ok_or(PriceError::Unavailable)?;
                fallback
                    .close_at_or_before(day)
                    .map_err(|_| PriceError::Unavailable)?
            }
        };

        self.cache.insert(day, usd);
        Ok(PriceQuote { timestamp, usd })
    }
}
