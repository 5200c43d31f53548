// database/errors.rs - classification of driver failures
//
// Driver errors are classified exactly once, here. Upper layers may re-tag
// with a domain code but keep the kind decided below.

use crate::error::{codes, AppError};

/// Classify a `sqlx` failure: a missing row is the caller's fault, anything
/// else is ours. The driver error is kept as the cause.
pub fn db_error(err: sqlx::Error) -> AppError {
    let classified = match err {
        sqlx::Error::RowNotFound => AppError::bad_request(codes::RECORD_NOT_FOUND),
        _ => AppError::server_error(codes::DB_ERROR),
    };
    classified.wrap(err)
}

/// Local validation failure for an entity about to be persisted.
pub fn validation_error(detail: impl Into<String>) -> AppError {
    AppError::bad_request(codes::VALIDATION_FAILURE).wrap(detail.into())
}
