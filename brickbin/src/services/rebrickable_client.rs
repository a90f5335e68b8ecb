//! Rebrickable API client

use crate::{Error, Result};
use std::time::Duration;
use tracing::debug;

const REBRICKABLE_BASE_URL: &str = "https://rebrickable.com";
const USER_AGENT: &str = concat!("brickbin/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Rebrickable API client, authenticated by an opaque key per request.
pub struct RebrickableClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl RebrickableClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(REBRICKABLE_BASE_URL)
    }

    /// Client against an alternate endpoint, for tests.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::RemoteLookup(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
        })
    }

    /// Fetch the raw JSON inventory for a set number.
    pub async fn set_parts(&self, key: &str, set_number: &str) -> Result<String> {
        let url = format!(
            "{}/api/v3/lego/sets/{}/parts/",
            self.base_url, set_number
        );
        debug!(set_number = %set_number, url = %url, "Querying Rebrickable API");

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", format!("key {}", key))
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::RemoteLookup(format!("set {}: {}", set_number, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::RemoteLookup(format!(
                "set {}: HTTP {}",
                set_number,
                status.as_u16()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::RemoteLookup(format!("set {}: {}", set_number, e)))
    }
}
