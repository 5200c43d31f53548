// handlers/mod.rs - HTTP endpoints grouped by security tier
//
// Public (no auth) -> Protected (x-user-id required)

pub mod protected;
pub mod public;

use crate::services::ImageMetadataService;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub images: ImageMetadataService,
}

impl AppState {
    pub fn new(images: ImageMetadataService) -> Self {
        Self { images }
    }
}
