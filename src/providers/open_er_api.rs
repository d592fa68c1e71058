use crate::core::currency::{RateSnapshot, RateSnapshotProvider, normalize_code};
use crate::core::error::FetchError;
use crate::providers::util::{build_client, check_status, with_retry};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Rate snapshots from the keyless open.er-api.com `latest` endpoint.
pub struct OpenErApiProvider {
    base_url: String,
    client: Client,
}

impl OpenErApiProvider {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, FetchError> {
        Ok(OpenErApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: build_client(timeout_secs)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    result: String,
    base_code: Option<String>,
    time_last_update_unix: Option<i64>,
    rates: Option<HashMap<String, f64>>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
}

impl LatestResponse {
    fn into_snapshot(self) -> Result<RateSnapshot, FetchError> {
        if self.result != "success" {
            return Err(FetchError::Upstream(
                self.error_type.unwrap_or_else(|| "API error".to_string()),
            ));
        }

        let base = self
            .base_code
            .ok_or_else(|| FetchError::Malformed("missing base_code".to_string()))?;
        let observed_at = self
            .time_last_update_unix
            .ok_or_else(|| FetchError::Malformed("missing time_last_update_unix".to_string()))?;
        let mut rates = self
            .rates
            .ok_or_else(|| FetchError::Malformed("missing rates".to_string()))?;

        // The upstream always quotes the base against itself
        let pivot = normalize_code(&base);
        rates.retain(|code, _| normalize_code(code) != pivot);

        RateSnapshot::new(&base, observed_at, rates)
            .map_err(|e| FetchError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl RateSnapshotProvider for OpenErApiProvider {
    #[instrument(name = "OpenErApiLatest", skip(self), fields(base = %base))]
    async fn latest(&self, base: &str) -> Result<RateSnapshot, FetchError> {
        let base = normalize_code(base);
        let url = format!("{}/{}", self.base_url, base);
        debug!("Requesting latest rates from {}", url);

        let response = with_retry(
            || async {
                self.client
                    .get(&url)
                    .send()
                    .await
                    .map_err(FetchError::from)
            },
            3,
            500,
        )
        .await?;
        let response = check_status(response)?;

        let text = response.text().await?;
        let data: LatestResponse = serde_json::from_str(&text).map_err(|e| {
            FetchError::Malformed(format!("Failed to parse rates response for {base}: {e}"))
        })?;

        let snapshot = data.into_snapshot()?;
        debug!(
            pivot = snapshot.pivot(),
            count = snapshot.rates().len(),
            "Received rate snapshot"
        );
        Ok(snapshot)
    }
}
