//! SeaORM entity models
//!
//! Database entities for the footprint catalog

mod footprint;
mod footprint_attachment;
mod footprint_category;
mod footprint_image;

pub use footprint::{
    Entity as FootprintEntity,
    Model as Footprint,
    ActiveModel as FootprintActiveModel,
    Column as FootprintColumn,
};

pub use footprint_category::{
    Entity as FootprintCategoryEntity,
    Model as FootprintCategory,
    ActiveModel as FootprintCategoryActiveModel,
    Column as FootprintCategoryColumn,
    ParentCategory,
};

pub use footprint_image::{
    Entity as FootprintImageEntity,
    Model as FootprintImage,
    ActiveModel as FootprintImageActiveModel,
    Column as FootprintImageColumn,
};

pub use footprint_attachment::{
    Entity as FootprintAttachmentEntity,
    Model as FootprintAttachment,
    ActiveModel as FootprintAttachmentActiveModel,
    Column as FootprintAttachmentColumn,
};
