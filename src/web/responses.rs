//! HTTP response types and utilities
//!
//! Every endpoint answers with the same `{ success, data, error, timestamp }`
//! envelope; failures are mapped from [`AppError`] to a status code here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult, FetchError, ReadError, SessionError};

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Helper function to convert AppResult to HTTP response
pub fn handle_result<T>(result: AppResult<T>) -> Response
where
    T: Serialize,
{
    match result {
        Ok(data) => ok(data),
        Err(error) => handle_error(error),
    }
}

/// Convert AppError to appropriate HTTP response
pub fn handle_error(error: AppError) -> Response {
    let status = match &error {
        AppError::Fetch(FetchError::InvalidUrl { .. }) => StatusCode::BAD_REQUEST,
        AppError::Fetch(_) => StatusCode::BAD_GATEWAY,
        AppError::Read(ReadError::Upload { status, .. }) => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
        }
        AppError::Read(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AppError::Import(_) => StatusCode::BAD_GATEWAY,
        AppError::Session(session_error) => match session_error {
            SessionError::Busy { .. } | SessionError::NotStaged => StatusCode::CONFLICT,
            SessionError::IndexOutOfRange { .. } => StatusCode::NOT_FOUND,
            SessionError::NothingSelected => StatusCode::BAD_REQUEST,
        },
        AppError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(ApiResponse::<()>::error(error.to_string()))).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        handle_error(self)
    }
}

/// Success response helper
pub fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_errors_map_to_client_statuses() {
        let cases = [
            (SessionError::busy("parsing"), StatusCode::CONFLICT),
            (SessionError::NotStaged, StatusCode::CONFLICT),
            (
                SessionError::IndexOutOfRange { index: 3, len: 1 },
                StatusCode::NOT_FOUND,
            ),
            (SessionError::NothingSelected, StatusCode::BAD_REQUEST),
        ];

        for (error, expected) in cases {
            assert_eq!(handle_error(error.into()).status(), expected);
        }
    }

    #[test]
    fn test_invalid_url_is_bad_request() {
        let error = AppError::Fetch(FetchError::invalid_url("nope", "relative URL"));
        assert_eq!(handle_error(error).status(), StatusCode::BAD_REQUEST);

        let error = AppError::Fetch(FetchError::Status {
            url: "http://x".to_string(),
            status: 404,
        });
        assert_eq!(handle_error(error).status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_rejected_upload_keeps_its_status() {
        let error = AppError::Read(ReadError::Upload {
            name: "big.m3u".to_string(),
            status: 413,
            message: "length limit exceeded".to_string(),
        });
        assert_eq!(handle_error(error).status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
