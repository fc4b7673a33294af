use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Unexpected upstream response: {0}")]
    Format(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            429 | 500..=599 => ApiError::Unavailable(format!("Status {}: {}", status, truncated)),
            _ => ApiError::Format(format!("Status {}: {}", status, truncated)),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, ApiError::Unavailable(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Format(err.to_string())
        } else {
            ApiError::Unavailable(err.to_string())
        }
    }
}
