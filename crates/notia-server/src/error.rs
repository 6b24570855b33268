//! Response envelope and the mapping from service errors to HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use notia::NotiaError;

/// Response wrapper for API calls.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler result: a JSON envelope on success, an error envelope otherwise.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

#[derive(Debug)]
pub struct ApiError(pub NotiaError);

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self(NotiaError::Validation(message.into()))
    }

    /// A request the JSON, path or query extractor refused.
    pub fn rejected(rejection: impl std::fmt::Display) -> Self {
        Self::validation(rejection.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            NotiaError::Validation(_) => StatusCode::BAD_REQUEST,
            NotiaError::NotFound { .. } => StatusCode::NOT_FOUND,
            NotiaError::Busy => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl<E: Into<NotiaError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        (status, Json(ApiResponse::<()>::err(self.0.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::validation("bad").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(NotiaError::NotFound {
                resource: "Task",
                id: 1
            })
            .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError(NotiaError::Busy).status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_error_envelope_omits_data() {
        let json = serde_json::to_value(ApiResponse::<()>::err("boom")).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "error": "boom"}));
    }
}
