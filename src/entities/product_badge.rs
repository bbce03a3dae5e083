use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Schedules a badge on a product for a time window.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_badges")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub badge_type_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::badge_type::Entity",
        from = "Column::BadgeTypeId",
        to = "super::badge_type::Column::Id"
    )]
    BadgeType,
}

impl Related<super::badge_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BadgeType.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
