use std::time::Duration;

use crate::error::TrackerError;

use super::types::ServerTimeResponse;

/// Unauthenticated REST client used to verify the exchange is reachable before streaming.
pub struct BinanceRestClient {
    http: reqwest::Client,
    base_url: String,
}

impl BinanceRestClient {
    pub fn new(base_url: &str) -> Result<Self, TrackerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn ping(&self) -> Result<(), TrackerError> {
        let url = format!("{}/api/v3/ping", self.base_url);
        self.http.get(&url).send().await?.error_for_status()?;
        Ok(())
    }

    pub async fn server_time(&self) -> Result<u64, TrackerError> {
        let url = format!("{}/api/v3/time", self.base_url);
        let resp: ServerTimeResponse = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.server_time)
    }
}
