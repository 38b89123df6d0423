//! Remote row store client for the Google Sheets REST API.
//!
//! The data layer only ever sees the [`RowStore`] trait: an opaque tabular
//! service addressed by A1 ranges that can read, append, overwrite and clear
//! rows. `SheetsClient` is the production implementation over the Sheets v4
//! `values` endpoints; tests substitute an in-memory store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the Sheets API
const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// HTTP request timeout in seconds.
/// 30s allows for slow spreadsheet responses while failing fast enough that
/// the cache fallback path stays responsive.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Input option for writes. USER_ENTERED lets the spreadsheet parse dates
/// and numbers the same way the web editor would.
const VALUE_INPUT_OPTION: &str = "USER_ENTERED";

// ============================================================================
// Row store abstraction
// ============================================================================

/// A remote tabular store addressed by sheet-qualified A1 ranges.
///
/// `get_range` returns rows as ordered sequences of cell strings, header row
/// included. All operations can fail with [`ApiError`]; a missing sheet or
/// range surfaces as [`ApiError::RangeNotFound`].
pub trait RowStore: Send + Sync + 'static {
    fn get_range(
        &self,
        range: &str,
    ) -> impl Future<Output = Result<Vec<Vec<String>>, ApiError>> + Send;

    fn append_row(
        &self,
        range: &str,
        row: Vec<String>,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn update_range(
        &self,
        range: &str,
        rows: Vec<Vec<String>>,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn clear_range(&self, range: &str) -> impl Future<Output = Result<(), ApiError>> + Send;
}

// ============================================================================
// Wire types
// ============================================================================

/// Body of `values.get` responses and `values.update`/`values.append`
/// requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ValueRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    range: Option<String>,
    #[serde(default)]
    values: Option<Vec<Vec<String>>>,
}

// ============================================================================
// Sheets client
// ============================================================================

/// Client for one spreadsheet.
/// Clone is cheap - reqwest::Client uses Arc internally for connection
/// pooling, and the token is shared.
#[derive(Clone)]
pub struct SheetsClient {
    client: Client,
    token: Arc<String>,
    spreadsheet_id: String,
}

impl SheetsClient {
    /// Create a client for the given spreadsheet with a bearer token.
    pub fn new(spreadsheet_id: impl Into<String>, token: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            token: Arc::new(token.into()),
            spreadsheet_id: spreadsheet_id.into(),
        })
    }

    /// Create a client for a different spreadsheet, sharing the connection
    /// pool and token.
    pub fn for_spreadsheet(&self, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            token: Arc::clone(&self.token),
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    fn values_url(&self, range: &str, suffix: &str) -> String {
        format!(
            "{}/{}/values/{}{}",
            SHEETS_BASE_URL,
            self.spreadsheet_id,
            encode_range(range),
            suffix
        )
    }
}

/// Percent-encode the characters that are not safe inside a URL path
/// segment. A1 ranges keep `!` and `:` literal; sheet names may contain
/// spaces and quotes.
fn encode_range(range: &str) -> String {
    let mut out = String::with_capacity(range.len());
    for c in range.chars() {
        match c {
            ' ' => out.push_str("%20"),
            '\'' => out.push_str("%27"),
            '"' => out.push_str("%22"),
            '#' => out.push_str("%23"),
            '%' => out.push_str("%25"),
            '?' => out.push_str("%3F"),
            _ => out.push(c),
        }
    }
    out
}

impl RowStore for SheetsClient {
    async fn get_range(&self, range: &str) -> Result<Vec<Vec<String>>, ApiError> {
        let url = self.values_url(range, "");

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.token.as_str())
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        let response = super::check_response(response).await?;

        let body: ValueRange = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

        let rows = body.values.unwrap_or_default();
        debug!(range, rows = rows.len(), "Range fetched");
        Ok(rows)
    }

    async fn append_row(&self, range: &str, row: Vec<String>) -> Result<(), ApiError> {
        let url = self.values_url(range, ":append");
        let body = ValueRange {
            range: None,
            values: Some(vec![row]),
        };

        let response = self
            .client
            .post(&url)
            .query(&[("valueInputOption", VALUE_INPUT_OPTION)])
            .bearer_auth(self.token.as_str())
            .json(&body)
            .send()
            .await?;
        super::check_response(response).await?;

        debug!(range, "Row appended");
        Ok(())
    }

    async fn update_range(&self, range: &str, rows: Vec<Vec<String>>) -> Result<(), ApiError> {
        let url = self.values_url(range, "");
        let body = ValueRange {
            range: Some(range.to_string()),
            values: Some(rows),
        };

        let response = self
            .client
            .put(&url)
            .query(&[("valueInputOption", VALUE_INPUT_OPTION)])
            .bearer_auth(self.token.as_str())
            .json(&body)
            .send()
            .await?;
        super::check_response(response).await?;

        debug!(range, "Range updated");
        Ok(())
    }

    async fn clear_range(&self, range: &str) -> Result<(), ApiError> {
        let url = self.values_url(range, ":clear");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token.as_str())
            .send()
            .await?;
        super::check_response(response).await?;

        debug!(range, "Range cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_range_keeps_a1_punctuation() {
        assert_eq!(encode_range("Opportunities!A:K"), "Opportunities!A:K");
        assert_eq!(encode_range("'Weekly Business'!A2:F"), "%27Weekly%20Business%27!A2:F");
    }
}
