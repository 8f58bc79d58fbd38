//! Error handling for the registry proxy
//!
//! Every failure inside a request ends up as a [`ProxyError`]. Authorization
//! failures are not errors: the dispatcher answers them with a 401 challenge.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProxyError>;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("unexpected authorization scheme: {0}")]
    UnexpectedAuthorizationScheme(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid Www-Authenticate header: {0}")]
    MalformedChallenge(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    /// Status code used when this error terminates an inbound request
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<base64::DecodeError> for ProxyError {
    fn from(err: base64::DecodeError) -> Self {
        ProxyError::Decode(format!("invalid base64: {}", err))
    }
}

impl From<std::string::FromUtf8Error> for ProxyError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        ProxyError::Decode(format!("UTF-8 conversion error: {}", err))
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::Decode(format!("invalid token bundle: {}", err))
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        ProxyError::Upstream(err.to_string())
    }
}

impl From<url::ParseError> for ProxyError {
    fn from(err: url::ParseError) -> Self {
        ProxyError::Upstream(format!("invalid upstream URL: {}", err))
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(status = %status, error = %self, "request failed");
        let body = serde_json::json!({ "message": self.to_string() }).to_string();
        (status, [("Content-Type", "application/json")], body).into_response()
    }
}
