use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::Display;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PromotionType {
    #[sea_orm(string_value = "daily_special")]
    DailySpecial,
    #[sea_orm(string_value = "bundle_special")]
    BundleSpecial,
    #[sea_orm(string_value = "discount")]
    Discount,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DiscountType {
    #[sea_orm(string_value = "percentage")]
    Percentage,
    #[sea_orm(string_value = "fixed_amount")]
    FixedAmount,
    #[sea_orm(string_value = "fixed_price")]
    FixedPrice,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ValidityType {
    #[sea_orm(string_value = "permanent")]
    Permanent,
    #[sea_orm(string_value = "date_range")]
    DateRange,
    #[sea_orm(string_value = "time_range")]
    TimeRange,
    #[sea_orm(string_value = "date_time_range")]
    DateTimeRange,
    #[sea_orm(string_value = "weekdays")]
    Weekdays,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "promotions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub promotion_type: PromotionType,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub validity_type: ValidityType,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub time_from: Option<NaiveTime>,
    pub time_until: Option<NaiveTime>,
    /// ISO weekday numbers (1 = Monday) as a JSON array.
    pub weekdays: Option<Json>,
    pub badge_type_id: Option<Uuid>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn weekday_set(&self) -> Option<Vec<u8>> {
        self.weekdays
            .as_ref()
            .and_then(|raw| serde_json::from_value::<Vec<u8>>(raw.clone()).ok())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::promotion_item::Entity")]
    Items,
    #[sea_orm(has_many = "super::bundle_promotion_item::Entity")]
    BundleItems,
}

impl Related<super::promotion_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::bundle_promotion_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BundleItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
