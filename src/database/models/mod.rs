pub mod image_metadata;

pub use image_metadata::ImageMetadata;
