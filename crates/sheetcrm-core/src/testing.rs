//! In-memory test doubles for the remote services.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::api::{ApiError, RowStore};

enum MockResponse {
    Rows(Vec<Vec<String>>),
    Missing,
    Failing,
}

/// Scriptable in-memory [`RowStore`]. Ranges respond with configured rows,
/// a missing-range error or a server error; every read and write is
/// recorded for assertions.
#[derive(Default)]
pub(crate) struct MockRowStore {
    responses: Mutex<HashMap<String, MockResponse>>,
    calls: Mutex<HashMap<String, usize>>,
    appends: Mutex<Vec<(String, Vec<String>)>>,
    updates: Mutex<Vec<(String, Vec<Vec<String>>)>>,
    clears: Mutex<Vec<String>>,
    fail_writes: AtomicBool,
}

impl MockRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rows(&self, range: &str, rows: Vec<Vec<String>>) {
        self.responses
            .lock()
            .insert(range.to_string(), MockResponse::Rows(rows));
    }

    pub fn set_missing(&self, range: &str) {
        self.responses
            .lock()
            .insert(range.to_string(), MockResponse::Missing);
    }

    pub fn set_failing(&self, range: &str) {
        self.responses
            .lock()
            .insert(range.to_string(), MockResponse::Failing);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `get_range` calls issued for `range`
    pub fn calls_for(&self, range: &str) -> usize {
        self.calls.lock().get(range).copied().unwrap_or(0)
    }

    pub fn appended(&self) -> Vec<(String, Vec<String>)> {
        self.appends.lock().clone()
    }

    pub fn updated(&self) -> Vec<(String, Vec<Vec<String>>)> {
        self.updates.lock().clone()
    }

    pub fn cleared(&self) -> Vec<String> {
        self.clears.lock().clone()
    }

    fn write_result(&self) -> Result<(), ApiError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(ApiError::ServerError("mock write failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl RowStore for MockRowStore {
    async fn get_range(&self, range: &str) -> Result<Vec<Vec<String>>, ApiError> {
        *self.calls.lock().entry(range.to_string()).or_default() += 1;

        match self.responses.lock().get(range) {
            Some(MockResponse::Rows(rows)) => Ok(rows.clone()),
            Some(MockResponse::Failing) => {
                Err(ApiError::ServerError("mock fetch failure".to_string()))
            }
            Some(MockResponse::Missing) | None => Err(ApiError::RangeNotFound(format!(
                "Unable to parse range: {range}"
            ))),
        }
    }

    async fn append_row(&self, range: &str, row: Vec<String>) -> Result<(), ApiError> {
        self.write_result()?;
        self.appends.lock().push((range.to_string(), row));
        Ok(())
    }

    async fn update_range(&self, range: &str, rows: Vec<Vec<String>>) -> Result<(), ApiError> {
        self.write_result()?;
        self.updates.lock().push((range.to_string(), rows));
        Ok(())
    }

    async fn clear_range(&self, range: &str) -> Result<(), ApiError> {
        self.write_result()?;
        self.clears.lock().push(range.to_string());
        Ok(())
    }
}
