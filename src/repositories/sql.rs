use async_trait::async_trait;
use tracing::error;

use crate::context::RequestContext;
use crate::database::models::ImageMetadata;
use crate::database::Repo;
use crate::error::{codes, AppError, ErrorKind};
use crate::repositories::{ImageMetadataRepo, Transactional, TxFn};

/// `ImageMetadataRepo` backed by the generic SQL repository.
#[derive(Clone, Debug)]
pub struct SqlImageMetadataRepo {
    store: Repo,
}

impl SqlImageMetadataRepo {
    pub fn new(store: Repo) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Transactional for SqlImageMetadataRepo {
    async fn transaction(&self, ctx: &RequestContext, f: TxFn) -> Result<(), AppError> {
        self.store.transaction(ctx, f).await
    }

    fn is_active(&self, ctx: &RequestContext) -> bool {
        self.store.is_transaction_active(ctx)
    }
}

#[async_trait]
impl ImageMetadataRepo for SqlImageMetadataRepo {
    async fn create_image_metadata(
        &self,
        ctx: &RequestContext,
        image: &mut ImageMetadata,
    ) -> Result<(), AppError> {
        self.store.create(ctx, image).await.map_err(|err| {
            error!(error = %err.detailed(), "IMAGE_METADATA_CREATE_ERROR");
            // Local failures keep their kind; only internal ones get the domain tag.
            if err.is_of_kind(ErrorKind::InternalServerError) {
                AppError::server_error(codes::DB_CREATE_ERROR).wrap(err)
            } else {
                err
            }
        })
    }
}
