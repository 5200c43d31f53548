// api - wire shapes for the HTTP surface

pub mod dtos;

pub use dtos::{CreateImageMetadataRequest, ErrorResponse, ImageMetadataResponse};
