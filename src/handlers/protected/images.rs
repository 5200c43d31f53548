use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Extension, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{error, info};

use crate::api::dtos::{CreateImageMetadataRequest, ImageMetadataResponse};
use crate::context::RequestContext;
use crate::error::{codes, AppError};
use crate::handlers::AppState;
use crate::middleware::error_response;

pub const REQUEST_BODY_TOO_LARGE: &str = "request body too large";

/// POST /v1/images - record a new upload for the calling user
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let tracker = RequestTracker::start();
    let result = create_image(&state, &ctx, &body).await;
    tracker.finish(result.as_ref().err());

    match result {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn create_image(
    state: &AppState,
    ctx: &RequestContext,
    body: &Result<Bytes, BytesRejection>,
) -> Result<ImageMetadataResponse, AppError> {
    let body = body.as_ref().map_err(|rejection| {
        error!(error = %rejection.body_text(), "INVALID_REQUEST");
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::bad_request(REQUEST_BODY_TOO_LARGE)
        } else {
            AppError::server_error(codes::SERVER_ERROR).wrap(rejection.body_text())
        }
    })?;

    // Undecodable bodies are reported as internal errors, not 400s.
    let request: CreateImageMetadataRequest = serde_json::from_slice(body).map_err(|err| {
        error!(error = %err, "INVALID_REQUEST");
        AppError::server_error(codes::SERVER_ERROR).wrap(err)
    })?;

    request.validate().map_err(|err| {
        error!(error = %err, "VALIDATION_FAILURE");
        err
    })?;

    if !ctx.has_user() {
        return Err(AppError::authorization(codes::UNAUTHORIZED));
    }

    let (image, result) = state.images.create_image_metadata(ctx, &request).await;
    result?;

    Ok(ImageMetadataResponse::from_model(&image))
}

/// Logs the start of an action and, on finish, its outcome and latency.
struct RequestTracker {
    started: Instant,
}

impl RequestTracker {
    fn start() -> Self {
        info!("ACTION_STARTED");
        Self {
            started: Instant::now(),
        }
    }

    fn finish(self, err: Option<&AppError>) {
        let latency_ms = self.started.elapsed().as_millis() as u64;
        match err {
            Some(err) => error!(latency_ms, error = %err.detailed(), "ACTION_FAILED"),
            None => info!(latency_ms, "ACTION_SUCCESS"),
        }
    }
}
