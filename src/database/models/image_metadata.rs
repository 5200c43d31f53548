use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::entity::{Entity, Model, SqlValue};
use crate::database::errors::validation_error;
use crate::error::AppError;

pub const ENTITY_IMAGE_METADATA: &str = "images_metadata";
pub const IMAGE_METADATA_ID_PREFIX: &str = "image_";

/// Lifecycle state given to every newly recorded upload.
pub const STATUS_INITIATED: &str = "INITIATED";

pub const FILENAME_MAX_LENGTH: usize = 255;
pub const USER_ID_MAX_LENGTH: usize = 255;

/// One uploaded image as recorded in `images_metadata`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ImageMetadata {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub model: Model,
    pub user_id: String,
    pub filename: String,
    pub file_type: String,
    pub file_size: i64,
    pub width: i32,
    pub height: i32,
    pub status: String,
    /// Not populated yet; stored as NULL.
    pub analysis_result: Option<String>,
}

impl ImageMetadata {
    /// A fresh upload record owned by `user_id`, in the `INITIATED` state.
    pub fn new(user_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            filename: filename.into(),
            status: STATUS_INITIATED.to_string(),
            ..Self::default()
        }
    }

    /// Stored ID with the `image_` prefix, or `""` before an ID is assigned.
    pub fn public_id(&self) -> String {
        self.model
            .id()
            .map(|id| public_id_with_prefix(&id.to_string()))
            .unwrap_or_default()
    }

    /// `"<width>x<height>"`
    pub fn dimensions(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Prefix `id` with `image_` unless it already carries it.
pub fn public_id_with_prefix(id: &str) -> String {
    if id.starts_with(IMAGE_METADATA_ID_PREFIX) {
        id.to_string()
    } else {
        format!("{}{}", IMAGE_METADATA_ID_PREFIX, id)
    }
}

impl Entity for ImageMetadata {
    fn table_name(&self) -> &'static str {
        ENTITY_IMAGE_METADATA
    }

    fn entity_name(&self) -> &'static str {
        ENTITY_IMAGE_METADATA
    }

    fn id(&self) -> Option<Uuid> {
        self.model.id()
    }

    fn validate(&self) -> Result<(), AppError> {
        self.model.validate()?;

        if self.user_id.is_empty() {
            return Err(validation_error("user_id: cannot be blank"));
        }
        if self.user_id.chars().count() > USER_ID_MAX_LENGTH {
            return Err(validation_error(format!(
                "user_id: the length must be no more than {}",
                USER_ID_MAX_LENGTH
            )));
        }
        if self.filename.is_empty() {
            return Err(validation_error("filename: cannot be blank"));
        }
        if self.filename.chars().count() > FILENAME_MAX_LENGTH {
            return Err(validation_error(format!(
                "filename: the length must be no more than {}",
                FILENAME_MAX_LENGTH
            )));
        }
        Ok(())
    }

    fn set_defaults(&mut self) -> Result<(), AppError> {
        self.model.set_defaults();
        Ok(())
    }

    fn columns(&self) -> Vec<(&'static str, SqlValue)> {
        let mut columns = self.model.columns();
        columns.extend([
            ("user_id", SqlValue::Text(self.user_id.clone())),
            ("filename", SqlValue::Text(self.filename.clone())),
            ("file_type", SqlValue::Text(self.file_type.clone())),
            ("file_size", SqlValue::BigInt(self.file_size)),
            ("width", SqlValue::Int(self.width)),
            ("height", SqlValue::Int(self.height)),
            ("status", SqlValue::Text(self.status.clone())),
            ("analysis_result", SqlValue::NullableText(self.analysis_result.clone())),
        ]);
        columns
    }
}
