use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a promotion applies to. Exactly one of the three targets is set.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "promotion_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub promotion_id: Uuid,
    pub product_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub combo_id: Option<Uuid>,
    pub special_price: Option<Decimal>,
    pub sort_order: i32,
}

impl Model {
    pub fn matches(&self, product_id: Option<Uuid>, category_id: Option<Uuid>, combo_id: Option<Uuid>) -> bool {
        (self.product_id.is_some() && self.product_id == product_id)
            || (self.category_id.is_some() && self.category_id == category_id)
            || (self.combo_id.is_some() && self.combo_id == combo_id)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::promotion::Entity",
        from = "Column::PromotionId",
        to = "super::promotion::Column::Id"
    )]
    Promotion,
}

impl Related<super::promotion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Promotion.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
