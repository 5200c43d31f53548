use serde::{Deserialize, Serialize};

use crate::database::models::image_metadata::{ImageMetadata, FILENAME_MAX_LENGTH};
use crate::error::AppError;

/// Body of `POST /v1/images`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateImageMetadataRequest {
    #[serde(default)]
    pub file_name: String,
}

impl CreateImageMetadataRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.file_name.is_empty() {
            return Err(AppError::bad_request("file_name: cannot be blank"));
        }
        if self.file_name.chars().count() > FILENAME_MAX_LENGTH {
            return Err(AppError::bad_request(format!(
                "file_name: the length must be between 1 and {}",
                FILENAME_MAX_LENGTH
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadataResponse {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    pub file_type: String,
    pub file_size: i64,
    pub width: i32,
    pub height: i32,
    pub status: String,
    pub analysis_result: String,
    pub upload_url: String,
    pub download_url: String,
}

impl ImageMetadataResponse {
    /// Upload and download URLs are not issued yet and stay empty.
    pub fn from_model(image: &ImageMetadata) -> Self {
        Self {
            id: image.public_id(),
            user_id: image.user_id.clone(),
            filename: image.filename.clone(),
            file_type: image.file_type.clone(),
            file_size: image.file_size,
            width: image.width,
            height: image.height,
            status: image.status.clone(),
            analysis_result: image.analysis_result.clone().unwrap_or_default(),
            upload_url: String::new(),
            download_url: String::new(),
        }
    }
}

/// `{code, description}` body sent for every failed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Entity;
    use crate::error::ErrorKind;

    fn req(name: &str) -> CreateImageMetadataRequest {
        CreateImageMetadataRequest {
            file_name: name.to_string(),
        }
    }

    #[test]
    fn blank_file_name_is_rejected() {
        let err = req("").validate().unwrap_err();
        assert!(err.is_of_kind(ErrorKind::BadRequest));
        assert_eq!(err.message(), "file_name: cannot be blank");
    }

    #[test]
    fn length_bounds() {
        assert!(req("a").validate().is_ok());
        assert!(req(&"a".repeat(255)).validate().is_ok());

        let err = req(&"a".repeat(256)).validate().unwrap_err();
        assert_eq!(err.message(), "file_name: the length must be between 1 and 255");
    }

    #[test]
    fn missing_field_decodes_as_blank() {
        let request: CreateImageMetadataRequest = serde_json::from_str("{}").unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn response_exposes_public_id_and_empty_placeholders() {
        let mut image = ImageMetadata::new("u1", "cat.png");
        image.set_defaults().unwrap();

        let response = ImageMetadataResponse::from_model(&image);
        let json = serde_json::to_value(&response).unwrap();

        assert!(response.id.starts_with("image_"));
        assert_eq!(json["status"], "INITIATED");
        assert_eq!(json["analysis_result"], "");
        assert_eq!(json["upload_url"], "");
        assert_eq!(json["download_url"], "");
        assert_eq!(json["file_size"], 0);
    }
}
