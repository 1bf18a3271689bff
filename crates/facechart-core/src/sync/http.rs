//! HTTP/JSON remote.

use super::remote::{BatchError, BatchReceipt, BoxFuture, RemoteError, RemoteSync};
use crate::config::SyncConfig;
use crate::model::TreatmentSession;
use serde::Serialize;
use std::time::Duration;

/// Health check path.
pub const HEALTH_PATH: &str = "/health";
/// Batch submit path.
pub const BATCH_PATH: &str = "/api/sessions/batch";
/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Request body of a batch submit.
#[derive(Debug, Serialize)]
pub struct BatchRequest<'a> {
    pub sessions: &'a [TreatmentSession],
}

/// Remote reached over HTTP.
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RemoteError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    /// Remote for the configured endpoint, or `None` if sync is not configured.
    pub fn from_config(config: &SyncConfig) -> Result<Option<Self>, RemoteError> {
        if !config.is_configured() {
            return Ok(None);
        }
        Self::with_timeout(config.endpoint.trim(), config.request_timeout()).map(Some)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl RemoteSync for HttpRemote {
    fn health_check(&self) -> BoxFuture<'_, bool> {
        let url = self.url(HEALTH_PATH);
        Box::pin(async move {
            match self.client.get(&url).send().await {
                Ok(resp) => resp.status().is_success(),
                Err(e) => {
                    log::warn!("Health check to {} failed: {}", url, e);
                    false
                }
            }
        })
    }

    fn submit_batch<'a>(
        &'a self,
        sessions: &'a [TreatmentSession],
    ) -> BoxFuture<'a, Result<BatchReceipt, RemoteError>> {
        let url = self.url(BATCH_PATH);
        Box::pin(async move {
            let resp = self
                .client
                .post(&url)
                .json(&BatchRequest { sessions })
                .send()
                .await
                .map_err(|e| RemoteError::Transport(e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                let reason = match resp.json::<BatchError>().await {
                    Ok(body) => body.error,
                    Err(_) => format!("HTTP {}", status),
                };
                return Err(RemoteError::Rejected(reason));
            }

            resp.json::<BatchReceipt>()
                .await
                .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
        })
    }
}
