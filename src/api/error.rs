//! API error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::error;

use crate::error::DiscoveryError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),

    /// Opaque message for the client; the cause is only logged
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    /// Log `err` and hide it behind `message`
    pub fn internal(message: &'static str) -> impl FnOnce(DiscoveryError) -> ApiError {
        move |err| {
            error!(error = %err, "{}", message);
            ApiError::Internal(message)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
