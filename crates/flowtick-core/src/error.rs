use flowtick_warehouse::WarehouseError;
use thiserror::Error;

use crate::http_client::HttpError;

/// Failures from the login endpoint or from reading the held credential.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("login transport failure: {0}")]
    Transport(#[from] HttpError),
    #[error("login rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("malformed login response: {0}")]
    Malformed(String),
    #[error("no credential held; login has not succeeded yet")]
    NotAuthenticated,
}

/// Failures from one flow fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("flow transport failure: {0}")]
    Transport(#[source] HttpError),
    #[error("flow endpoint returned status {status}")]
    UpstreamStatus { status: u16 },
    #[error("flow endpoint rejected the credential after re-login")]
    Unauthorized,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("failed to encode flow request: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode flow response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failures that abort a single record inside a batch.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("invalid creation date '{value}'")]
    InvalidCreationDate { value: String },
    #[error("invalid expiration '{value}'")]
    InvalidExpiration { value: String },
    #[error("field '{field}' must be finite")]
    NonFiniteNumber { field: &'static str },
    #[error("field '{field}' value {value} is outside the decimal range")]
    NumberOutOfRange { field: &'static str, value: f64 },
    #[error(transparent)]
    Store(#[from] WarehouseError),
}

/// Conditions that stop the poller before its first cycle.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("initial login failed: {0}")]
    Login(#[source] AuthError),
}
