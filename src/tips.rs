// ============================================================================
// Generative Tip Service Client
// ============================================================================
//
// Stateless request/response client for the hosted model that turns a food
// item name into a food-safety and sustainability tip. No retries: a
// failure surfaces to the user, who may re-invoke the action.
//
// ============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::TipServiceConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TipRequest<'a> {
    food_item: &'a str,
}

#[derive(Debug, Deserialize)]
struct TipResponse {
    tip: String,
}

pub struct TipClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl TipClient {
    pub fn new(config: &TipServiceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build tip service HTTP client")?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Generate a tip for `food_item`.
    pub async fn generate(&self, food_item: &str) -> AppResult<String> {
        if self.endpoint.is_empty() {
            return Err(AppError::TipService(
                "Tip generation is not configured".to_string(),
            ));
        }

        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&TipRequest { food_item });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        let body: TipResponse = response.json().await?;

        if body.tip.trim().is_empty() {
            return Err(AppError::TipService(
                "The model returned an empty tip".to_string(),
            ));
        }
        Ok(body.tip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_endpoint_fails_fast() {
        let client = TipClient::new(&TipServiceConfig {
            endpoint: String::new(),
            api_key: None,
            timeout_secs: 5,
        })
        .unwrap();

        let err = client.generate("Bread").await.unwrap_err();
        assert!(matches!(err, AppError::TipService(_)));
    }

    #[test]
    fn client_builds_with_configured_timeout() {
        assert!(TipClient::new(&TipServiceConfig {
            endpoint: "http://localhost:9999/tips".to_string(),
            api_key: Some("key".to_string()),
            timeout_secs: 20,
        })
        .is_ok());
    }
}
