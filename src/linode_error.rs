//! Linode client error type.
//!
//! Unique responsibility: one error taxonomy shared by configuration, query
//! flattening, list-option hashing, pagination and HTTP transport.

use std::fmt;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Linode client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing required environment variable.
    #[error("missing required env var: {0}")]
    MissingEnv(&'static str),

    /// Invalid environment variable value.
    #[error("invalid env var {key}={value:?}: {reason}")]
    InvalidEnv {
        /// The environment variable key.
        key: &'static str,
        /// The environment variable value.
        value: String,
        /// The reason for invalidity.
        reason: &'static str,
    },

    /// Query params are absent, not a struct, or otherwise unusable.
    #[error("{0}")]
    InvalidInput(String),

    /// A query param field holds a type that cannot be stringified.
    #[error("unsupported query param type for field {field:?}: {type_name}")]
    UnsupportedType {
        /// Serialized name of the offending field.
        field: &'static str,
        /// Name of the unsupported type.
        type_name: &'static str,
    },

    /// A value could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Endpoint template and ids do not line up.
    #[error("invalid endpoint {template:?}: {reason}")]
    InvalidEndpoint {
        /// The endpoint template or path.
        template: String,
        /// Why resolution failed.
        reason: String,
    },

    /// List options could not be applied to an outbound request.
    #[error("failed to apply list options: {0}")]
    ListOptions(#[source] Box<Error>),

    /// HTTP client error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// API error response.
    #[error("linode api error: status={status}, body={body}")]
    Api {
        /// HTTP status code.
        status: reqwest::StatusCode,
        /// Response body.
        body: String,
    },

    /// JSON deserialization error.
    #[error("json decode error: {source}")]
    Json {
        /// The JSON parsing error.
        source: serde_json::Error,
        /// The response body.
        body: String,
    },
}

impl Error {
    /// Strip `ListOptions` context wrappers and return the underlying error.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::ListOptions(inner) => inner.root(),
            other => other,
        }
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::Serialization(msg.to_string())
    }
}
