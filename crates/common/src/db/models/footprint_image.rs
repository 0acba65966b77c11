//! Footprint image entity (one per footprint, owned)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "footprint_images")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub footprint_id: Uuid,

    /// Stored file name
    #[sea_orm(column_type = "Text")]
    pub filename: String,

    #[sea_orm(column_type = "Text")]
    pub original_filename: String,

    #[sea_orm(column_type = "Text")]
    pub mimetype: String,

    /// Size in bytes
    pub size: i64,

    #[sea_orm(column_type = "Text", nullable)]
    pub extension: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::footprint::Entity",
        from = "Column::FootprintId",
        to = "super::footprint::Column::Id",
        on_delete = "Cascade"
    )]
    Footprint,
}

impl Related<super::footprint::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Footprint.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
