//! The status surface of the staleness protocol.
//!
//! The server side publishes its global write clock as a [`SystemStatus`]
//! payload; polling clients consume it through a [`StatusSource`], either
//! in-process (the store itself) or over HTTP.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::sheets::RowStore;
use crate::data::store::CrmStore;

/// HTTP request timeout for status checks, in seconds.
/// Status payloads are tiny; a check that takes longer than this is as good
/// as a failed one and will be retried next tick.
const STATUS_TIMEOUT_SECS: u64 = 10;

/// Payload of `GET /api/system/status`.
///
/// `last_write_timestamp` is the server's global write clock in epoch
/// millis. Clients tolerate its absence by skipping the check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub success: bool,
    #[serde(
        rename = "lastWriteTimestamp",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_write_timestamp: Option<i64>,
}

/// Where a polling client reads the server's write clock from.
pub trait StatusSource: Send + Sync + 'static {
    fn fetch_status(&self) -> impl Future<Output = Result<SystemStatus, ApiError>> + Send;
}

/// In-process source: a client embedded in the server process reads the
/// clock straight off the shared cache.
impl<S: RowStore> StatusSource for CrmStore<S> {
    async fn fetch_status(&self) -> Result<SystemStatus, ApiError> {
        Ok(self.system_status())
    }
}

/// Remote source for browser-style clients: polls the status endpoint of a
/// running server.
#[derive(Clone)]
pub struct HttpStatusSource {
    client: Client,
    url: String,
    token: Option<Arc<String>>,
}

impl HttpStatusSource {
    pub fn new(url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(STATUS_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(Arc::new(token.into()));
        self
    }
}

impl StatusSource for HttpStatusSource {
    async fn fetch_status(&self) -> Result<SystemStatus, ApiError> {
        let mut request = self.client.get(&self.url);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token.as_str());
        }

        let response = request.send().await?;
        let response = crate::api::check_response(response).await?;

        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        let status: SystemStatus =
            serde_json::from_str(r#"{"success": true, "lastWriteTimestamp": 1700000000000}"#)
                .unwrap();
        assert!(status.success);
        assert_eq!(status.last_write_timestamp, Some(1_700_000_000_000));
    }

    #[test]
    fn test_missing_timestamp_is_tolerated() {
        let status: SystemStatus = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert_eq!(status.last_write_timestamp, None);
    }
}
