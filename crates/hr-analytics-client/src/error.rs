//! Client error types.

/// Errors that can occur when using the hr-analytics client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// The server rejected the credentials.
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Error message.
        message: String,
    },

    /// The request needs credentials the client was not given.
    #[error("missing credentials: {0}")]
    MissingCredentials(&'static str),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}
