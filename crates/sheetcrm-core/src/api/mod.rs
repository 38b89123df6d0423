//! Remote service clients for the CRM data layer.
//!
//! This module provides the [`RowStore`] abstraction over the backing
//! spreadsheet together with its Sheets API implementation, and the
//! [`CalendarClient`] for event scheduling.
//!
//! Both clients authenticate with a pre-issued OAuth bearer token; token
//! acquisition and refresh happen outside this crate.

pub mod calendar;
pub mod error;
pub mod sheets;

pub use calendar::{CalendarClient, CalendarEvent, CalendarEventInput, EventWhen, WeekSummary};
pub use error::ApiError;
pub use sheets::{RowStore, SheetsClient};

/// Map a non-success HTTP response to an [`ApiError`] carrying its body.
pub(crate) async fn check_response(
    response: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::from_status(status, &body))
}
