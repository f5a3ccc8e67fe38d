use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::TravelError;
use crate::geolocation::GeoError;

/// Body of every non-2xx response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub success: bool,
    pub kind: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(kind: &str, message: &str) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            success: false,
            kind: kind.to_string(),
            message: message.to_string(),
        }
    }

    pub fn bad_request(message: &str) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("validation_error", message)),
        )
            .into_response()
    }
}

pub fn status_for(error: &TravelError) -> StatusCode {
    if error.is_timeout() {
        return StatusCode::GATEWAY_TIMEOUT;
    }
    match error {
        TravelError::Validation(_) => StatusCode::BAD_REQUEST,
        TravelError::Geolocation(GeoError::FileNotFound(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        TravelError::Geolocation(_) => StatusCode::BAD_GATEWAY,
        TravelError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for TravelError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            log::error!("Request failed ({}): {}", self.kind(), self);
        } else {
            log::info!("Request rejected ({}): {}", self.kind(), self);
        }
        (
            status,
            Json(ErrorResponse::new(self.kind(), &self.to_string())),
        )
            .into_response()
    }
}
