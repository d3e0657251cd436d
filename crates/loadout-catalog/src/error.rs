//! Error types for catalog API access.

use thiserror::Error;

/// Primary error type for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog client is not configured.
    #[error("catalog not configured")]
    NotConfigured {
        /// Field that is missing or empty.
        field: &'static str,
    },
    /// The HTTP transport failed.
    #[error("catalog http request failed")]
    Http {
        /// Operation identifier.
        operation: &'static str,
        /// URL used for the request.
        url: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with a non-success status.
    #[error("catalog response status error")]
    Status {
        /// Operation identifier.
        operation: &'static str,
        /// URL used for the request.
        url: String,
        /// HTTP status code returned by the server.
        status: u16,
    },
}

/// Convenience alias for catalog results.
pub type CatalogResult<T> = Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_stay_constant_with_context_in_fields() {
        let status = CatalogError::Status {
            operation: "login",
            url: "http://catalog/auth/login".to_string(),
            status: 401,
        };
        assert_eq!(status.to_string(), "catalog response status error");
        assert!(matches!(status, CatalogError::Status { status: 401, .. }));
    }
}
