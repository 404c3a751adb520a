//! Error types for the headless admin SDK.

use thiserror::Error;

/// Result type for SDK operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the headless admin SDK.
#[derive(Error, Debug)]
pub enum Error {
    /// One or more required arguments were not set on the request.
    #[error("Missing required arguments: {}", missing.join(", "))]
    MissingArguments {
        /// The argument keys that were declared required but absent.
        missing: Vec<String>,
    },

    /// The endpoint does not support the requested operation.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The API answered with a non-success status.
    ///
    /// Only produced by [`EndpointResponse::error_for_status`](crate::EndpointResponse::error_for_status),
    /// the SDK never interprets status codes on its own.
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// A filter tree or filter mapping is malformed.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Network or HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request timeout.
    #[error("Request timed out")]
    Timeout,
}

impl Error {
    /// Build a [`Error::MissingArguments`] from the absent keys.
    pub(crate) fn missing_arguments<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Error::MissingArguments {
            missing: keys.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_arguments_message() {
        let err = Error::missing_arguments(["id", "lang"]);
        assert_eq!(err.to_string(), "Missing required arguments: id, lang");
    }

    #[test]
    fn test_api_error_message() {
        let err = Error::Api {
            status: 404,
            body: "not found".into(),
        };
        assert_eq!(err.to_string(), "API error (404): not found");
    }
}
