use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The requested sheet or A1 range does not exist. Readers treat this
    /// as an empty dataset, never as a failure.
    #[error("Range not found: {0}")]
    RangeNotFound(String),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Marker the Sheets API puts in 400 bodies when a sheet or range is missing
const RANGE_PARSE_MARKER: &str = "Unable to parse range";

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..MAX_ERROR_BODY_LENGTH],
                body.len()
            )
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            400 if body.contains(RANGE_PARSE_MARKER) => ApiError::RangeNotFound(truncated),
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::RangeNotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// An addressing error: the sheet or range simply is not there.
    pub fn is_addressing(&self) -> bool {
        matches!(self, ApiError::RangeNotFound(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// Everything that is neither an addressing error nor an auth failure is
    /// considered transient: quota, network, server-side hiccups.
    pub fn is_transient(&self) -> bool {
        !self.is_addressing() && !self.is_unauthorized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_range_parse_error_maps_to_range_not_found() {
        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            "Unable to parse range: Opportunities!A:K",
        );
        assert!(err.is_addressing());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_other_400_is_invalid_response() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, "malformed values payload");
        assert!(matches!(err, ApiError::InvalidResponse(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_unauthorized_is_not_transient() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, "");
        assert!(err.is_unauthorized());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_rate_limit_and_server_errors_are_transient() {
        assert!(ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom").is_transient());
    }
}
