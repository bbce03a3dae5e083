use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
    pub combo_id: Option<Uuid>,
    pub promotion_id: Option<Uuid>,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    /// `Vec<SelectedSection>` serialized as JSON.
    pub selected_options: Json,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Options chosen for one customization section of an item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SelectedSection {
    pub section_id: Uuid,
    pub section_name: String,
    pub options: Vec<SelectedOption>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SelectedOption {
    pub option_id: Uuid,
    pub name: String,
    #[schema(value_type = String)]
    pub price_adjustment: Decimal,
}

impl Model {
    /// Decodes the stored options; malformed rows read as no options.
    pub fn sections(&self) -> Vec<SelectedSection> {
        serde_json::from_value(self.selected_options.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
