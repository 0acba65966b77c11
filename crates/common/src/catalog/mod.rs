//! Footprint catalog domain logic
//!
//! - Category tree: path resolution, ancestry and nested-set bounds
//! - Footprint aggregate: category association and owned attachments
//! - Validated write inputs

mod category_tree;
mod footprint;
mod input;

pub use category_tree::{CategoryTree, NestedBounds, CATEGORY_PATH_SEPARATOR};
pub use footprint::FootprintAggregate;
pub use input::{CategoryInput, CategoryUpdate, FootprintInput, UploadInput};
