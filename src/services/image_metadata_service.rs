use std::sync::Arc;

use tracing::debug;

use crate::api::dtos::CreateImageMetadataRequest;
use crate::context::RequestContext;
use crate::database::models::ImageMetadata;
use crate::error::AppError;
use crate::repositories::ImageMetadataRepo;

/// Dependencies for [`ImageMetadataService`].
#[derive(Clone)]
pub struct ServiceConfig {
    pub repo: Arc<dyn ImageMetadataRepo>,
}

#[derive(Clone)]
pub struct ImageMetadataService {
    repo: Arc<dyn ImageMetadataRepo>,
}

impl ImageMetadataService {
    pub fn new(config: ServiceConfig) -> Self {
        Self { repo: config.repo }
    }

    /// Record a new upload for the user on `ctx`.
    ///
    /// The entity comes back even when persisting fails; in that case it must
    /// be treated as not stored.
    pub async fn create_image_metadata(
        &self,
        ctx: &RequestContext,
        request: &CreateImageMetadataRequest,
    ) -> (ImageMetadata, Result<(), AppError>) {
        let mut image = ImageMetadata::new(ctx.user_id(), request.file_name.as_str());
        let result = self.repo.create_image_metadata(ctx, &mut image).await;

        if result.is_ok() {
            debug!(id = %image.public_id(), user_id = %image.user_id, "image metadata recorded");
        }
        (image, result)
    }
}
