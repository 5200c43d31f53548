// repositories - domain persistence seams
//
// Services depend on these traits, never on `Repo` directly, so the SQL
// implementation can be swapped for an in-memory one in tests.

pub mod sql;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::context::RequestContext;
use crate::database::models::ImageMetadata;
use crate::error::AppError;

pub use sql::SqlImageMetadataRepo;

/// Unit of work handed to [`Transactional::transaction`]. It receives the
/// context carrying the transaction and must use it for every call.
pub type TxFn = Box<dyn FnOnce(RequestContext) -> BoxFuture<'static, Result<(), AppError>> + Send>;

#[async_trait]
pub trait Transactional: Send + Sync {
    /// Run `f` in a transaction, joining the one already on `ctx` if any.
    async fn transaction(&self, ctx: &RequestContext, f: TxFn) -> Result<(), AppError>;

    fn is_active(&self, ctx: &RequestContext) -> bool;
}

#[async_trait]
pub trait ImageMetadataRepo: Transactional {
    /// Persist a new record. Failures come back as `db_create_error`.
    async fn create_image_metadata(
        &self,
        ctx: &RequestContext,
        image: &mut ImageMetadata,
    ) -> Result<(), AppError>;
}
