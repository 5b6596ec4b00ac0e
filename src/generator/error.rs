//! Text generator error types.
//!
//! Separates transport failures (the request never produced a usable
//! response) from failures reading a response that did arrive.

use thiserror::Error;

/// Error from a text generation request.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Connection failure, timeout, or any other error before a response arrived.
    #[error("Network error: {0}")]
    Network(String),

    /// The endpoint answered with a non-success status.
    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },

    /// A success response whose body could not be read.
    #[error("Failed to read response body: {0}")]
    Body(String),
}

impl GenerationError {
    /// Whether the request failed in transit rather than while reading a success response.
    pub fn is_transport(&self) -> bool {
        matches!(self, GenerationError::Network(_) | GenerationError::Status { .. })
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GenerationError::Network(format!("Request timeout: {}", e))
        } else if e.is_connect() {
            GenerationError::Network(format!("Connection failed: {}", e))
        } else {
            GenerationError::Network(format!("Request failed: {}", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(GenerationError::Network("refused".into()).is_transport());
        assert!(GenerationError::Status { code: 503, body: String::new() }.is_transport());
        assert!(!GenerationError::Body("truncated".into()).is_transport());
    }

    #[test]
    fn test_status_display() {
        let e = GenerationError::Status { code: 401, body: "unauthorized".into() };
        assert_eq!(e.to_string(), "HTTP 401: unauthorized");
    }
}
