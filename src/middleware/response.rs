// middleware/response.rs - the single error -> HTTP status translation
//
// Internal error text is logged here and never sent to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{error, warn};

use crate::api::dtos::ErrorResponse;
use crate::error::{codes, AppError, ErrorKind};

pub const GENERIC_SERVER_ERROR_DESCRIPTION: &str =
    "Something went wrong, please try again in some time.";

/// Map any error to its JSON response. Only `AppError` values of the
/// BadRequest and Authorization kinds surface their message; everything else
/// is a 500 with a generic description.
pub fn error_response(err: &(dyn std::error::Error + 'static)) -> Response {
    let app_error = err.downcast_ref::<AppError>();

    let (status, code, description) = match app_error.map(|e| (e.kind(), e)) {
        Some((ErrorKind::BadRequest, e)) => (
            StatusCode::BAD_REQUEST,
            codes::BAD_REQUEST_ERROR,
            e.message().to_string(),
        ),
        Some((ErrorKind::Authorization, e)) => (
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            e.message().to_string(),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::SERVER_ERROR,
            GENERIC_SERVER_ERROR_DESCRIPTION.to_string(),
        ),
    };

    let detail = app_error.map(AppError::detailed).unwrap_or_else(|| err.to_string());
    if status.is_server_error() {
        error!(status = status.as_u16(), error = %detail, "request failed");
    } else {
        warn!(status = status.as_u16(), error = %detail, "request rejected");
    }

    let body = ErrorResponse {
        code: code.to_string(),
        description,
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error_response(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn parts(response: Response) -> (StatusCode, ErrorResponse) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn bad_request_surfaces_message() {
        let (status, body) = parts(error_response(&AppError::bad_request("file_name: cannot be blank"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "bad_request_error");
        assert_eq!(body.description, "file_name: cannot be blank");
    }

    #[tokio::test]
    async fn authorization_is_401() {
        let (status, body) = parts(AppError::authorization(codes::UNAUTHORIZED).into_response()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.code, "unauthorized");
    }

    #[tokio::test]
    async fn internal_errors_hide_their_text() {
        let err = AppError::server_error(codes::DB_CREATE_ERROR)
            .wrap(std::io::Error::new(std::io::ErrorKind::Other, "password authentication failed"));
        let (status, body) = parts(error_response(&err)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "server_error");
        assert_eq!(body.description, GENERIC_SERVER_ERROR_DESCRIPTION);
    }

    #[tokio::test]
    async fn foreign_errors_are_500() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let (status, body) = parts(error_response(&err)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.description, GENERIC_SERVER_ERROR_DESCRIPTION);
    }
}
