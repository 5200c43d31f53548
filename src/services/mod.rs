pub mod image_metadata_service;

pub use image_metadata_service::{ImageMetadataService, ServiceConfig};
