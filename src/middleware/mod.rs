pub mod auth;
pub mod context;
pub mod response;

pub use auth::{token_auth, USER_ID_HEADER};
pub use context::{request_context, REQUEST_ID_HEADER};
pub use response::{error_response, GENERIC_SERVER_ERROR_DESCRIPTION};
