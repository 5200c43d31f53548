use axum::{extract::MatchedPath, extract::Request, middleware::Next, response::Response};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::context::RequestContext;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Seed a `RequestContext` for the request and run the rest of the chain in a
/// span carrying its request ID and path.
pub async fn request_context(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let request_path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let span = info_span!("request", request_id = %request_id, request_path = %request_path);

    let ctx = RequestContext::new()
        .with_request_id(request_id)
        .with_request_path(request_path);
    request.extensions_mut().insert(ctx);

    next.run(request).instrument(span).await
}
