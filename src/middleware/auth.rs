use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{info, warn};

use crate::context::RequestContext;
use crate::error::{codes, AppError};
use crate::middleware::response::error_response;

/// Header carrying the caller's user ID, set by the upstream gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Require a non-empty `x-user-id` header and record it on the request
/// context. Requests without one get a 401 and never reach the handler.
pub async fn token_auth(mut request: Request, next: Next) -> Response {
    info!("AUTH_VALIDATION");

    let user_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_owned);

    let Some(user_id) = user_id else {
        warn!("USER_ID_NOT_FOUND");
        return error_response(&AppError::authorization(codes::UNAUTHORIZED));
    };

    let ctx = request
        .extensions_mut()
        .remove::<RequestContext>()
        .unwrap_or_default()
        .with_user_id(user_id);
    request.extensions_mut().insert(ctx);

    info!("AUTH_VALIDATION_SUCCESS");
    next.run(request).await
}
