use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::core::WalletInfo;
use crate::price::{PriceError, PrimarySource};

/// Ledger or price API failure. Whole-wallet fetch failures are fatal to a
/// run; per-transaction failures cause that transaction to be skipped.
#[derive(Debug)]
pub enum FetchError {
    Http(reqwest::Error),
    Parse(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Http(e) => write!(f, "HTTP error: {e}"),
            FetchError::Parse(e) => write!(f, "parse error: {e}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Http(e)
    }
}

/// The ledger collaborator: wallet history plus per-transaction net amounts.
#[allow(async_fn_in_trait)]
pub trait Ledger {
    async fn fetch_wallet(&self, address: &str) -> Result<WalletInfo, FetchError>;
    /// Net satoshis attributable to the wallet for one transaction.
    async fn fetch_tx_amount(&self, address: &str, txid: &str) -> Result<i64, FetchError>;
}

/// blockchain.info-compatible ledger client.
pub struct BlockchainClient {
    client: Client,
    base_url: String,
}

impl BlockchainClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Ledger for BlockchainClient {
    async fn fetch_wallet(&self, address: &str) -> Result<WalletInfo, FetchError> {
        let url = format!("{}/rawaddr/{address}", self.base_url);
        let resp = self.client.get(&url).send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }

    async fn fetch_tx_amount(&self, address: &str, txid: &str) -> Result<i64, FetchError> {
        let url = format!("{}/q/txresult/{txid}/{address}", self.base_url);
        let resp = self.client.get(&url).send().await?.error_for_status()?;
        let body = resp.text().await?;
        body.trim()
            .parse()
            .map_err(|e| FetchError::Parse(format!("txresult {txid}: {e}")))
    }
}

/// CryptoCompare-compatible daily-close client: the resolver's primary
/// source. `histoday` with `limit=1` returns the prior daily close first,
/// which is the quote the engine wants for historical lookups.
pub struct CryptoCompareClient {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct HistoResponse {
    #[serde(rename = "Data")]
    data: HistoData,
}

#[derive(Deserialize)]
struct HistoData {
    #[serde(rename = "Data", default)]
    data: Vec<HistoBar>,
}

#[derive(Deserialize)]
struct HistoBar {
    close: f64,
}

impl CryptoCompareClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl PrimarySource for &CryptoCompareClient {
    async fn daily_close(&self, timestamp: i64) -> Result<f64, PriceError> {
        let url = format!(
            "{}/data/v2/histoday?fsym=BTC&tsym=USD&limit=1&toTs={timestamp}",
            self.base_url
        );
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PriceError::Fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| PriceError::Fetch(e.to_string()))?;
        let histo: HistoResponse = resp
            .json()
            .await
            .map_err(|e| PriceError::Fetch(e.to_string()))?;
        histo
            .data
            .data
            .first()
            .map(|bar| bar.close)
            .ok_or(PriceError::NoQuote)
    }
}
