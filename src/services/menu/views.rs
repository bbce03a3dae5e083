//! Serialized shapes of menu records, shared by staff and public endpoints.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::promotion::{DiscountType, PromotionType, ValidityType};
use crate::entities::{
    badge_type, bundle_promotion_item, category, combo, combo_item, combo_item_option, product,
    product_badge, product_variant, promotion, promotion_item, section, section_option,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
}

impl From<category::Model> for CategoryView {
    fn from(m: category::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            image_url: m.image_url,
            is_active: m.is_active,
            sort_order: m.sort_order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VariantView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub is_active: bool,
    pub sort_order: i32,
}

impl From<product_variant::Model> for VariantView {
    fn from(m: product_variant::Model) -> Self {
        Self {
            id: m.id,
            product_id: m.product_id,
            name: m.name,
            price: m.price,
            is_active: m.is_active,
            sort_order: m.sort_order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SectionOptionView {
    pub id: Uuid,
    pub section_id: Uuid,
    pub name: String,
    #[schema(value_type = String)]
    pub price_adjustment: Decimal,
    pub is_active: bool,
    pub sort_order: i32,
}

impl From<section_option::Model> for SectionOptionView {
    fn from(m: section_option::Model) -> Self {
        Self {
            id: m.id,
            section_id: m.section_id,
            name: m.name,
            price_adjustment: m.price_adjustment,
            is_active: m.is_active,
            sort_order: m.sort_order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SectionView {
    pub id: Uuid,
    pub name: String,
    pub min_selections: i32,
    /// 0 means no upper bound
    pub max_selections: i32,
    pub is_active: bool,
    pub sort_order: i32,
    pub options: Vec<SectionOptionView>,
}

impl SectionView {
    pub fn new(m: section::Model, options: Vec<section_option::Model>) -> Self {
        Self {
            id: m.id,
            name: m.name,
            min_selections: m.min_selections,
            max_selections: m.max_selections,
            is_active: m.is_active,
            sort_order: m.sort_order,
            options: options.into_iter().map(SectionOptionView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BadgeTypeView {
    pub id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
}

impl From<badge_type::Model> for BadgeTypeView {
    fn from(m: badge_type::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            color: m.color,
            icon: m.icon,
            is_active: m.is_active,
            sort_order: m.sort_order,
        }
    }
}

/// A badge scheduled on a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductBadgeView {
    pub id: Uuid,
    pub badge_type_id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl ProductBadgeView {
    pub fn new(m: product_badge::Model, badge: &badge_type::Model) -> Self {
        Self {
            id: m.id,
            badge_type_id: m.badge_type_id,
            name: badge.name.clone(),
            color: badge.color.clone(),
            icon: badge.icon.clone(),
            starts_at: m.starts_at,
            ends_at: m.ends_at,
        }
    }
}

/// The promotion currently lowering an item's price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AppliedPromotionView {
    pub promotion_id: Uuid,
    pub name: String,
    pub promotion_type: PromotionType,
    #[schema(value_type = String)]
    pub discount: Decimal,
    #[schema(value_type = String)]
    pub final_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductView {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub is_available: bool,
    pub sort_order: i32,
    pub variants: Vec<VariantView>,
    pub sections: Vec<SectionView>,
    pub badges: Vec<ProductBadgeView>,
    pub promotion: Option<AppliedPromotionView>,
}

impl ProductView {
    /// Bare product without its related collections.
    pub fn basic(m: product::Model) -> Self {
        Self {
            id: m.id,
            category_id: m.category_id,
            name: m.name,
            description: m.description,
            price: m.price,
            image_url: m.image_url,
            is_active: m.is_active,
            is_available: m.is_available,
            sort_order: m.sort_order,
            variants: Vec::new(),
            sections: Vec::new(),
            badges: Vec::new(),
            promotion: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ComboItemOptionView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    #[schema(value_type = String)]
    pub price_adjustment: Decimal,
    pub sort_order: i32,
}

impl From<combo_item_option::Model> for ComboItemOptionView {
    fn from(m: combo_item_option::Model) -> Self {
        Self {
            id: m.id,
            product_id: m.product_id,
            variant_id: m.variant_id,
            price_adjustment: m.price_adjustment,
            sort_order: m.sort_order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ComboItemView {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    pub is_choice_group: bool,
    pub group_name: Option<String>,
    pub sort_order: i32,
    pub options: Vec<ComboItemOptionView>,
}

impl ComboItemView {
    pub fn new(m: combo_item::Model, options: Vec<combo_item_option::Model>) -> Self {
        Self {
            id: m.id,
            product_id: m.product_id,
            variant_id: m.variant_id,
            quantity: m.quantity,
            is_choice_group: m.is_choice_group,
            group_name: m.group_name,
            sort_order: m.sort_order,
            options: options.into_iter().map(ComboItemOptionView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ComboView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
    pub items: Vec<ComboItemView>,
    pub promotion: Option<AppliedPromotionView>,
}

impl ComboView {
    pub fn new(m: combo::Model, items: Vec<ComboItemView>) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            price: m.price,
            image_url: m.image_url,
            is_active: m.is_active,
            sort_order: m.sort_order,
            items,
            promotion: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PromotionItemView {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub combo_id: Option<Uuid>,
    #[schema(value_type = Option<String>)]
    pub special_price: Option<Decimal>,
    pub sort_order: i32,
}

impl From<promotion_item::Model> for PromotionItemView {
    fn from(m: promotion_item::Model) -> Self {
        Self {
            id: m.id,
            product_id: m.product_id,
            category_id: m.category_id,
            combo_id: m.combo_id,
            special_price: m.special_price,
            sort_order: m.sort_order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BundleItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    pub sort_order: i32,
}

impl From<bundle_promotion_item::Model> for BundleItemView {
    fn from(m: bundle_promotion_item::Model) -> Self {
        Self {
            id: m.id,
            product_id: m.product_id,
            variant_id: m.variant_id,
            quantity: m.quantity,
            sort_order: m.sort_order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PromotionView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub promotion_type: PromotionType,
    pub discount_type: DiscountType,
    #[schema(value_type = String)]
    pub discount_value: Decimal,
    pub validity_type: ValidityType,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    #[schema(value_type = Option<String>, example = "11:00:00")]
    pub time_from: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "15:00:00")]
    pub time_until: Option<NaiveTime>,
    /// ISO weekdays, Monday = 1
    pub weekdays: Option<Vec<u8>>,
    pub badge_type_id: Option<Uuid>,
    pub is_active: bool,
    pub sort_order: i32,
    pub items: Vec<PromotionItemView>,
    pub bundle_items: Vec<BundleItemView>,
}

impl PromotionView {
    pub fn new(
        m: promotion::Model,
        items: Vec<promotion_item::Model>,
        bundle_items: Vec<bundle_promotion_item::Model>,
    ) -> Self {
        let weekdays = m.weekday_set();
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            promotion_type: m.promotion_type,
            discount_type: m.discount_type,
            discount_value: m.discount_value,
            validity_type: m.validity_type,
            valid_from: m.valid_from,
            valid_until: m.valid_until,
            time_from: m.time_from,
            time_until: m.time_until,
            weekdays,
            badge_type_id: m.badge_type_id,
            is_active: m.is_active,
            sort_order: m.sort_order,
            items: items.into_iter().map(PromotionItemView::from).collect(),
            bundle_items: bundle_items.into_iter().map(BundleItemView::from).collect(),
        }
    }
}
