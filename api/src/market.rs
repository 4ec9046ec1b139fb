use anyhow::{bail, Context, Result};
use shared::{HistoricalBar, HistoryResponse, Timeframe};

/// Client for the service's own `/api/mt5/history` endpoint.
#[derive(Debug, Clone)]
pub struct MarketDataClient {
    pub base_url: String,
    http: reqwest::Client,
}

impl MarketDataClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn history(&self, symbol: &str, timeframe: Timeframe, count: u32) -> Result<Vec<HistoricalBar>> {
        let count = count.to_string();
        let response = self
            .http
            .get(format!("{}/api/mt5/history", self.base_url))
            .query(&[
                ("symbol", symbol),
                ("timeframe", timeframe.as_str()),
                ("count", count.as_str()),
            ])
            .send()
            .await
            .context("History endpoint is unreachable")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("History endpoint returned {}: {}", status, body);
        }

        let history: HistoryResponse = response
            .json()
            .await
            .context("History endpoint returned an unreadable body")?;
        Ok(history.bars)
    }
}
