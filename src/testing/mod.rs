// testing - repository doubles for router and integration tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::database::models::ImageMetadata;
use crate::database::Entity;
use crate::error::{codes, AppError};
use crate::handlers::AppState;
use crate::repositories::{ImageMetadataRepo, Transactional, TxFn};
use crate::services::{ImageMetadataService, ServiceConfig};

/// Keeps created records in memory. Applies the same defaults and validation
/// as the SQL repository.
#[derive(Clone, Default)]
pub struct MemoryImageMetadataRepo {
    records: Arc<Mutex<Vec<ImageMetadata>>>,
}

impl MemoryImageMetadataRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ImageMetadata> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Transactional for MemoryImageMetadataRepo {
    async fn transaction(&self, ctx: &RequestContext, f: TxFn) -> Result<(), AppError> {
        f(ctx.clone()).await
    }

    fn is_active(&self, _ctx: &RequestContext) -> bool {
        false
    }
}

#[async_trait]
impl ImageMetadataRepo for MemoryImageMetadataRepo {
    async fn create_image_metadata(
        &self,
        _ctx: &RequestContext,
        image: &mut ImageMetadata,
    ) -> Result<(), AppError> {
        image.set_defaults()?;
        image.validate()?;

        let mut records = self
            .records
            .lock()
            .map_err(|_| AppError::server_error(codes::DB_CREATE_ERROR))?;
        records.push(image.clone());
        Ok(())
    }
}

/// Fails every write the way an unreachable database would.
#[derive(Clone, Copy, Default)]
pub struct FailingImageMetadataRepo;

#[async_trait]
impl Transactional for FailingImageMetadataRepo {
    async fn transaction(&self, _ctx: &RequestContext, _f: TxFn) -> Result<(), AppError> {
        Err(AppError::server_error(codes::DB_ERROR))
    }

    fn is_active(&self, _ctx: &RequestContext) -> bool {
        false
    }
}

#[async_trait]
impl ImageMetadataRepo for FailingImageMetadataRepo {
    async fn create_image_metadata(
        &self,
        _ctx: &RequestContext,
        _image: &mut ImageMetadata,
    ) -> Result<(), AppError> {
        Err(AppError::server_error(codes::DB_CREATE_ERROR)
            .wrap(AppError::server_error(codes::DB_ERROR).wrap("connection refused")))
    }
}

/// Handler state over any repository.
pub fn app_state(repo: Arc<dyn ImageMetadataRepo>) -> AppState {
    AppState::new(ImageMetadataService::new(ServiceConfig { repo }))
}
