//! Footprint category entity
//!
//! Categories form a nested-set tree: `parent_id` is the source of truth,
//! `lft`/`rgt`/`lvl` and `category_path` are derived and rewritten by the
//! repository whenever the tree changes.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "footprint_categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Parent category (null for a root)
    #[sea_orm(nullable, indexed)]
    pub parent_id: Option<Uuid>,

    #[sea_orm(column_type = "String(StringLen::N(128))")]
    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Left nested-set bound, also the sibling order key
    #[sea_orm(indexed)]
    pub lft: i32,

    /// Right nested-set bound
    #[sea_orm(indexed)]
    pub rgt: i32,

    /// Depth, 0 for roots
    pub lvl: i32,

    /// Cached root-to-node path
    #[sea_orm(column_type = "Text", nullable)]
    pub category_path: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id",
        on_delete = "Cascade"
    )]
    Parent,

    #[sea_orm(has_many = "super::footprint::Entity")]
    Footprints,
}

impl Related<super::footprint::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Footprints.def()
    }
}

/// Self-referencing link from a category to its parent
pub struct ParentCategory;

impl Linked for ParentCategory {
    type FromEntity = Entity;
    type ToEntity = Entity;

    fn link(&self) -> Vec<RelationDef> {
        vec![Relation::Parent.def()]
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// True when the category has no parent
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Whether the nested-set bounds have been assigned yet
    pub fn is_ranked(&self) -> bool {
        self.lft > 0 && self.rgt > self.lft
    }
}
