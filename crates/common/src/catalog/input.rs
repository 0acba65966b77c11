//! Validated inputs for catalog writes

use crate::db::models::{FootprintAttachment, FootprintImage};
use serde::Deserialize;
use std::path::Path;
use uuid::Uuid;
use validator::Validate;

/// Footprint fields accepted on create and full update
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FootprintInput {
    #[validate(length(min = 1, max = 64))]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub category_id: Option<Uuid>,
}

/// Category fields accepted on create
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 128))]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

/// Category fields accepted on update (the parent changes through a move)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CategoryUpdate {
    #[validate(length(min = 1, max = 128))]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// Metadata of an already-uploaded file attached to a footprint
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UploadInput {
    #[validate(length(min = 1, max = 255))]
    pub original_filename: String,

    #[validate(length(min = 3, max = 127))]
    pub mimetype: String,

    #[validate(range(min = 0))]
    pub size: i64,

    #[serde(default)]
    pub description: Option<String>,
}

impl UploadInput {
    /// Lower-cased extension of the original file name
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.original_filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
    }

    /// Storage name: the row id plus the original extension
    fn stored_filename(&self, id: Uuid) -> String {
        match self.extension() {
            Some(ext) => format!("{}.{}", id, ext),
            None => id.to_string(),
        }
    }

    pub fn into_image(self, footprint_id: Uuid) -> FootprintImage {
        let id = Uuid::new_v4();
        FootprintImage {
            id,
            footprint_id,
            filename: self.stored_filename(id),
            extension: self.extension(),
            original_filename: self.original_filename,
            mimetype: self.mimetype,
            size: self.size,
            description: self.description,
            created_at: chrono::Utc::now().into(),
        }
    }

    /// Build a detached attachment row; ownership is set when it is added
    /// to a footprint.
    pub fn into_attachment(self) -> FootprintAttachment {
        let id = Uuid::new_v4();
        FootprintAttachment {
            id,
            footprint_id: None,
            filename: self.stored_filename(id),
            extension: self.extension(),
            original_filename: self.original_filename,
            mimetype: self.mimetype,
            size: self.size,
            description: self.description,
            created_at: chrono::Utc::now().into(),
        }
    }
}
