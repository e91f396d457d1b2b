//! HTTP mapping of `Text2SqlError`.

use crate::types::Text2SqlError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Body returned for inference failures; the backend message is only logged.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to generate SQL query";

/// Error response format.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned by handlers.
#[derive(Debug)]
pub struct ApiError(pub Text2SqlError);

impl From<Text2SqlError> for ApiError {
    fn from(err: Text2SqlError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(Text2SqlError::invalid_input(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl ApiError {
    /// Status code and public message for the wrapped error.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match &self.0 {
            Text2SqlError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Text2SqlError::InferenceTimeout(_) => {
                (StatusCode::GATEWAY_TIMEOUT, self.0.to_string())
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                GENERIC_FAILURE_MESSAGE.to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if self.0.is_client_error() {
            warn!(error = %self.0, status = status.as_u16(), "rejected request");
        } else {
            error!(error = %self.0, status = status.as_u16(), "request failed");
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
