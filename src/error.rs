//! Errors surfaced through the stub transport.
//!
//! Every variant except [`StubError::ConfiguredFault`] and
//! [`StubError::Cancelled`] points at a defect in the test setup or in the
//! code under test; none of them are retried.

use http::Method;
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// A fault configured with `throws`, shared so every interception raises
/// the same instance.
pub type Fault = Arc<dyn StdError + Send + Sync + 'static>;

#[derive(Error, Debug, Clone)]
pub enum StubError {
    #[error("http stub was not set up")]
    NotConfigured,

    #[error("incorrect request URI, expected {expected} but was {actual}")]
    UriMismatch { expected: String, actual: String },

    #[error("incorrect HTTP method, expected {expected} but was {actual}")]
    MethodMismatch { expected: Method, actual: Method },

    #[error("the validation function passed in during setup returned false for the request content")]
    ContentValidationFailed,

    #[error("cannot decode request content as {expected}: {reason}")]
    ContentDecode {
        expected: &'static str,
        reason: String,
    },

    #[error("unknown media type specified in accept header: {accept}")]
    UnsupportedMediaType { accept: String },

    #[error("configured fault: {0}")]
    ConfiguredFault(#[source] Fault),

    #[error("cannot serialize {format} payload: {reason}")]
    Serialization {
        format: &'static str,
        reason: String,
    },

    #[error("invalid request URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("invalid header value for {name}: {reason}")]
    InvalidHeader { name: &'static str, reason: String },

    #[error("request was cancelled before a response was produced")]
    Cancelled,
}

/// A fault that only carries a message, for stubs built from configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SimulatedFault(pub String);

impl StubError {
    /// The configured fault, if this error is one.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            StubError::ConfiguredFault(fault) => Some(fault),
            _ => None,
        }
    }
}
