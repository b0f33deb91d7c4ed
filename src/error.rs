//! Error type shared by the routing, invocation and dispatch layers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// No region is configured for the API id (the API does not exist).
    #[error("API not found: {0}")]
    ApiNotFound(String),

    /// The API exists but no resource/method matched the invocation.
    #[error("Not found")]
    NotFound,

    #[error("Method {0} not allowed")]
    MethodNotAllowed(String),

    /// The client body could not be read (connection reset, malformed chunking).
    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    #[error("Invocation path is not set")]
    MissingInvocationPath,

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// Opaque failure reported by the integration collaborator.
    #[error("Integration error: {0}")]
    Integration(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::ApiNotFound(_) | GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::BodyRead(_) => StatusCode::BAD_REQUEST,
            GatewayError::MissingInvocationPath | GatewayError::Integration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Gateway request failed");
            return (status, "Internal server error").into_response();
        }
        (status, self.to_string()).into_response()
    }
}
