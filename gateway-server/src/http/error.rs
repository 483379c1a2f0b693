//! Maps [`GatewayError`] to an HTTP status code and error body in one
//! place, so the mapping cannot drift between handlers.

use super::dto::ErrorResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gateway_core::{ErrorCode, GatewayError};

pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.code() {
            ErrorCode::SessionNotFound => StatusCode::NOT_FOUND,
            ErrorCode::SessionAlreadyDone => StatusCode::CONFLICT,
            ErrorCode::NoSlots => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::ContainerError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse {
            detail: self.0.to_string(),
            error_code: self.0.code().as_str(),
        };
        (status, Json(body)).into_response()
    }
}
