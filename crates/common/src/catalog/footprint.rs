//! Footprint aggregate
//!
//! A footprint row together with the rows it owns (image, attachments)
//! and the category it belongs to.

use super::category_tree::CategoryTree;
use crate::db::models::{Footprint, FootprintAttachment, FootprintCategory, FootprintImage};
use crate::errors::{AppError, Result};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct FootprintAggregate {
    footprint: Footprint,
    category: Option<FootprintCategory>,
    image: Option<FootprintImage>,
    attachments: Vec<FootprintAttachment>,

    /// Attachments detached since load, pending deletion
    orphans: Vec<FootprintAttachment>,
}

impl FootprintAggregate {
    pub fn new(footprint: Footprint) -> Self {
        Self {
            footprint,
            category: None,
            image: None,
            attachments: Vec::new(),
            orphans: Vec::new(),
        }
    }

    /// Assemble an aggregate from rows loaded by the repository
    pub fn from_parts(
        footprint: Footprint,
        category: Option<FootprintCategory>,
        image: Option<FootprintImage>,
        attachments: Vec<FootprintAttachment>,
    ) -> Self {
        Self {
            footprint,
            category,
            image,
            attachments,
            orphans: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.footprint.id
    }

    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    pub fn name(&self) -> &str {
        &self.footprint.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.footprint.name = name.into();
    }

    pub fn description(&self) -> Option<&str> {
        self.footprint.description.as_deref()
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.footprint.description = description;
    }

    pub fn category(&self) -> Option<&FootprintCategory> {
        self.category.as_ref()
    }

    /// Assign the footprint to a category
    pub fn set_category(&mut self, category: FootprintCategory) {
        self.footprint.category_id = Some(category.id);
        self.category = Some(category);
    }

    pub fn clear_category(&mut self) {
        self.footprint.category_id = None;
        self.category = None;
    }

    /// Path of the assigned category, or `""` when there is none
    pub fn category_path(&self, tree: &CategoryTree) -> Result<String> {
        match self.category {
            Some(ref category) => tree.generate_category_path(category.id),
            None => Ok(String::new()),
        }
    }

    pub fn image(&self) -> Option<&FootprintImage> {
        self.image.as_ref()
    }

    /// Replace the image, pointing it at this footprint. Returns the previous one.
    pub fn set_image(&mut self, mut image: FootprintImage) -> Option<FootprintImage> {
        image.footprint_id = self.footprint.id;
        self.image.replace(image)
    }

    /// Attachments in insertion order
    pub fn attachments(&self) -> &[FootprintAttachment] {
        &self.attachments
    }

    /// Append an attachment and point its back-reference at this footprint
    pub fn add_attachment(&mut self, mut attachment: FootprintAttachment) -> &FootprintAttachment {
        attachment.footprint_id = Some(self.footprint.id);
        self.attachments.push(attachment);
        &self.attachments[self.attachments.len() - 1]
    }

    /// Detach an attachment: its back-reference is nulled first, then it is
    /// taken out of the collection and kept as an orphan for deletion.
    pub fn remove_attachment(&mut self, attachment_id: Uuid) -> Result<FootprintAttachment> {
        let index = self
            .attachments
            .iter()
            .position(|a| a.id == attachment_id)
            .ok_or_else(|| AppError::AttachmentNotFound { id: attachment_id.to_string() })?;

        self.attachments[index].footprint_id = None;
        let detached = self.attachments.remove(index);
        self.orphans.push(detached.clone());

        Ok(detached)
    }

    /// Drain the attachments detached since the aggregate was loaded
    pub fn take_orphans(&mut self) -> Vec<FootprintAttachment> {
        std::mem::take(&mut self.orphans)
    }

    pub fn into_footprint(self) -> Footprint {
        self.footprint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::category_tree::tests::category;

    fn footprint(name: &str) -> Footprint {
        let now = chrono::Utc::now();
        Footprint {
            id: Uuid::from_u128(100),
            name: name.to_string(),
            description: None,
            category_id: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn attachment(id: u128, name: &str) -> FootprintAttachment {
        FootprintAttachment {
            id: Uuid::from_u128(id),
            footprint_id: None,
            filename: format!("{}.pdf", id),
            original_filename: name.to_string(),
            mimetype: "application/pdf".to_string(),
            size: 1024,
            extension: Some("pdf".to_string()),
            description: None,
            created_at: chrono::Utc::now().into(),
        }
    }

    #[test]
    fn test_no_category_gives_empty_path() {
        let aggregate = FootprintAggregate::new(footprint("SOT-23"));
        let tree = CategoryTree::default();
        assert_eq!(aggregate.category_path(&tree).unwrap(), "");
    }

    #[test]
    fn test_category_path_delegates_to_tree() {
        let tree = CategoryTree::from_categories(vec![
            category(1, "SMD", None),
            category(2, "SOT", Some(1)),
        ]);

        let mut aggregate = FootprintAggregate::new(footprint("SOT-23"));
        aggregate.set_category(tree.get(Uuid::from_u128(2)).unwrap().clone());

        assert_eq!(aggregate.footprint().category_id, Some(Uuid::from_u128(2)));
        assert_eq!(aggregate.category_path(&tree).unwrap(), "SMD / SOT");

        aggregate.clear_category();
        assert_eq!(aggregate.category_path(&tree).unwrap(), "");
    }

    #[test]
    fn test_add_attachment_sets_back_reference() {
        let mut aggregate = FootprintAggregate::new(footprint("TO-220"));

        let added = aggregate.add_attachment(attachment(1, "datasheet.pdf"));
        assert_eq!(added.footprint_id, Some(Uuid::from_u128(100)));

        aggregate.add_attachment(attachment(2, "drawing.pdf"));
        let order: Vec<&str> = aggregate
            .attachments()
            .iter()
            .map(|a| a.original_filename.as_str())
            .collect();
        assert_eq!(order, vec!["datasheet.pdf", "drawing.pdf"]);
    }

    #[test]
    fn test_remove_attachment_nulls_back_reference() {
        let mut aggregate = FootprintAggregate::new(footprint("TO-220"));
        aggregate.add_attachment(attachment(1, "datasheet.pdf"));
        aggregate.add_attachment(attachment(2, "drawing.pdf"));

        let removed = aggregate.remove_attachment(Uuid::from_u128(1)).unwrap();
        assert_eq!(removed.footprint_id, None);
        assert!(removed.is_orphan());
        assert_eq!(aggregate.attachments().len(), 1);
        assert_eq!(aggregate.attachments()[0].id, Uuid::from_u128(2));

        let orphans = aggregate.take_orphans();
        assert_eq!(orphans.len(), 1);
        assert!(aggregate.take_orphans().is_empty());
    }

    #[test]
    fn test_remove_unknown_attachment() {
        let mut aggregate = FootprintAggregate::new(footprint("DIP-8"));
        let err = aggregate.remove_attachment(Uuid::from_u128(9)).unwrap_err();
        assert!(matches!(err, AppError::AttachmentNotFound { .. }));
    }

    #[test]
    fn test_set_image_points_at_footprint() {
        let mut aggregate = FootprintAggregate::new(footprint("DIP-8"));
        let image = FootprintImage {
            id: Uuid::from_u128(7),
            footprint_id: Uuid::nil(),
            filename: "7.png".to_string(),
            original_filename: "dip8.png".to_string(),
            mimetype: "image/png".to_string(),
            size: 2048,
            extension: Some("png".to_string()),
            description: None,
            created_at: chrono::Utc::now().into(),
        };

        assert!(aggregate.set_image(image).is_none());
        assert_eq!(aggregate.image().unwrap().footprint_id, Uuid::from_u128(100));
    }
}
