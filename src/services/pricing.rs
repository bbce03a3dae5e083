use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::order_item::{SelectedOption, SelectedSection};
use crate::entities::promotion::PromotionType;
use crate::entities::{
    category, combo, combo_item, combo_item_option, product, product_section, product_variant,
    promotion, promotion_item, restaurant, section, section_option,
};
use crate::errors::ServiceError;
use crate::models::pricing::{best_discount, round_money, selection_count_ok, DiscountRule};
use crate::models::promotion_validity::is_valid_now;

/// One line of a customer order as submitted.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderItemInput {
    pub product_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
    pub combo_id: Option<Uuid>,
    /// Set to order a bundle special.
    pub promotion_id: Option<Uuid>,
    #[validate(range(min = 1, max = 99, message = "Quantity must be between 1 and 99"))]
    pub quantity: i32,
    #[serde(default)]
    pub option_ids: Vec<Uuid>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedItem {
    pub product_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
    pub combo_id: Option<Uuid>,
    pub promotion_id: Option<Uuid>,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub unit_discount: Decimal,
    pub sections: Vec<SelectedSection>,
    pub notes: Option<String>,
}

impl PricedItem {
    pub fn line(&self) -> crate::models::pricing::PricedLine {
        crate::models::pricing::PricedLine {
            unit_price: self.unit_price,
            unit_discount: self.unit_discount,
            quantity: self.quantity,
        }
    }
}

/// A currently valid promotion together with what it targets.
#[derive(Debug, Clone)]
pub struct ActivePromotion {
    pub promotion: promotion::Model,
    pub items: Vec<promotion_item::Model>,
}

impl ActivePromotion {
    /// Discount rule for a line, when this promotion targets it.
    pub fn rule_for(
        &self,
        product_id: Option<Uuid>,
        category_id: Option<Uuid>,
        combo_id: Option<Uuid>,
    ) -> Option<DiscountRule> {
        if self.promotion.promotion_type == PromotionType::BundleSpecial {
            return None;
        }
        self.items
            .iter()
            .find(|item| item.matches(product_id, category_id, combo_id))
            .map(|item| DiscountRule {
                promotion_id: self.promotion.id,
                discount_type: self.promotion.discount_type,
                discount_value: self.promotion.discount_value,
                special_price: item.special_price,
            })
    }
}

/// Loads the restaurant's promotions that are valid at `now`, in display order.
pub async fn active_promotions<C: ConnectionTrait>(
    conn: &C,
    restaurant: &restaurant::Model,
    now: DateTime<Utc>,
) -> Result<Vec<ActivePromotion>, ServiceError> {
    let promotions = promotion::Entity::find()
        .filter(promotion::Column::RestaurantId.eq(restaurant.id))
        .filter(promotion::Column::IsActive.eq(true))
        .order_by_asc(promotion::Column::SortOrder)
        .all(conn)
        .await?
        .into_iter()
        .filter(|p| is_valid_now(p, restaurant.utc_offset_minutes, now))
        .collect::<Vec<_>>();

    if promotions.is_empty() {
        return Ok(Vec::new());
    }

    let mut items_by_promotion: HashMap<Uuid, Vec<promotion_item::Model>> = HashMap::new();
    for item in promotion_item::Entity::find()
        .filter(promotion_item::Column::PromotionId.is_in(promotions.iter().map(|p| p.id)))
        .order_by_asc(promotion_item::Column::SortOrder)
        .all(conn)
        .await?
    {
        items_by_promotion
            .entry(item.promotion_id)
            .or_default()
            .push(item);
    }

    Ok(promotions
        .into_iter()
        .map(|promotion| ActivePromotion {
            items: items_by_promotion.remove(&promotion.id).unwrap_or_default(),
            promotion,
        })
        .collect())
}

/// Best promotional unit discount for a line among `promotions`.
pub fn discount_for(
    promotions: &[ActivePromotion],
    base: Decimal,
    product_id: Option<Uuid>,
    category_id: Option<Uuid>,
    combo_id: Option<Uuid>,
) -> Option<(Uuid, Decimal)> {
    let rules: Vec<DiscountRule> = promotions
        .iter()
        .filter_map(|p| p.rule_for(product_id, category_id, combo_id))
        .collect();
    best_discount(base, rules.iter())
}

/// Prices every requested line against the live catalog.
#[instrument(skip(conn, restaurant, items), fields(restaurant_id = %restaurant.id, lines = items.len()))]
pub async fn price_items<C: ConnectionTrait>(
    conn: &C,
    restaurant: &restaurant::Model,
    items: &[OrderItemInput],
    now: DateTime<Utc>,
) -> Result<Vec<PricedItem>, ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::field("items", "An order needs at least one item"));
    }

    let promotions = active_promotions(conn, restaurant, now).await?;
    let mut priced = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let key = |field: &str| format!("items[{}].{}", index, field);
        if item.quantity < 1 {
            return Err(ServiceError::field(&key("quantity"), "Quantity must be at least 1"));
        }

        let line = match (item.product_id, item.combo_id, item.promotion_id) {
            (Some(product_id), None, None) => {
                price_product(conn, restaurant, &promotions, item, product_id, &key).await?
            }
            (None, Some(combo_id), None) => {
                price_combo(conn, restaurant, &promotions, item, combo_id, &key).await?
            }
            (None, None, Some(promotion_id)) => {
                price_bundle(conn, restaurant, now, item, promotion_id, &key).await?
            }
            _ => {
                return Err(ServiceError::field(
                    &key("product_id"),
                    "Each item must reference exactly one of product_id, combo_id or promotion_id",
                ))
            }
        };
        debug!(index, name = %line.name, unit_price = %line.unit_price, unit_discount = %line.unit_discount, "priced line");
        priced.push(line);
    }

    Ok(priced)
}

async fn price_product<C: ConnectionTrait>(
    conn: &C,
    restaurant: &restaurant::Model,
    promotions: &[ActivePromotion],
    item: &OrderItemInput,
    product_id: Uuid,
    key: &(dyn Fn(&str) -> String + Sync),
) -> Result<PricedItem, ServiceError> {
    let product = product::Entity::find_by_id(product_id)
        .filter(product::Column::RestaurantId.eq(restaurant.id))
        .one(conn)
        .await?
        .filter(product::Model::is_orderable)
        .ok_or_else(|| ServiceError::field(&key("product_id"), "Product is not available"))?;
    let category_active = category::Entity::find_by_id(product.category_id)
        .filter(category::Column::IsActive.eq(true))
        .one(conn)
        .await?
        .is_some();
    if !category_active {
        return Err(ServiceError::field(&key("product_id"), "Product is not available"));
    }

    let (mut base, name) = match item.variant_id {
        Some(variant_id) => {
            let variant = product_variant::Entity::find_by_id(variant_id)
                .filter(product_variant::Column::ProductId.eq(product.id))
                .filter(product_variant::Column::IsActive.eq(true))
                .one(conn)
                .await?
                .ok_or_else(|| {
                    ServiceError::field(&key("variant_id"), "Variant is not available for this product")
                })?;
            (variant.price, format!("{} - {}", product.name, variant.name))
        }
        None => (product.price, product.name.clone()),
    };

    let sections = selected_sections(conn, &product, &item.option_ids, key).await?;
    base += sections
        .iter()
        .flat_map(|s| s.options.iter())
        .map(|o| o.price_adjustment)
        .sum::<Decimal>();
    let base = round_money(base);

    let discount = discount_for(
        promotions,
        base,
        Some(product.id),
        Some(product.category_id),
        None,
    );

    Ok(PricedItem {
        product_id: Some(product.id),
        variant_id: item.variant_id,
        combo_id: None,
        promotion_id: discount.map(|(id, _)| id),
        name,
        quantity: item.quantity,
        unit_price: base,
        unit_discount: discount.map(|(_, d)| d).unwrap_or(Decimal::ZERO),
        sections,
        notes: item.notes.clone(),
    })
}

/// Resolves chosen options into sections, enforcing min/max per section.
async fn selected_sections<C: ConnectionTrait>(
    conn: &C,
    product: &product::Model,
    option_ids: &[Uuid],
    key: &(dyn Fn(&str) -> String + Sync),
) -> Result<Vec<SelectedSection>, ServiceError> {
    let links = product_section::Entity::find()
        .filter(product_section::Column::ProductId.eq(product.id))
        .order_by_asc(product_section::Column::SortOrder)
        .all(conn)
        .await?;
    if links.is_empty() {
        if option_ids.is_empty() {
            return Ok(Vec::new());
        }
        return Err(ServiceError::field(
            &key("option_ids"),
            "This product has no customization options",
        ));
    }

    let sections = section::Entity::find()
        .filter(section::Column::Id.is_in(links.iter().map(|l| l.section_id)))
        .filter(section::Column::IsActive.eq(true))
        .all(conn)
        .await?;

    let options = if option_ids.is_empty() {
        Vec::new()
    } else {
        section_option::Entity::find()
            .filter(section_option::Column::Id.is_in(option_ids.iter().copied()))
            .filter(section_option::Column::IsActive.eq(true))
            .order_by_asc(section_option::Column::SortOrder)
            .all(conn)
            .await?
    };

    let mut chosen: BTreeMap<Uuid, Vec<&section_option::Model>> = BTreeMap::new();
    for option_id in option_ids {
        let option = options
            .iter()
            .find(|o| o.id == *option_id)
            .filter(|o| sections.iter().any(|s| s.id == o.section_id))
            .ok_or_else(|| {
                ServiceError::field(
                    &key("option_ids"),
                    format!("Option {} is not available for this product", option_id),
                )
            })?;
        chosen.entry(option.section_id).or_default().push(option);
    }

    let mut result = Vec::new();
    for link in &links {
        let Some(section) = sections.iter().find(|s| s.id == link.section_id) else {
            continue;
        };
        let picked = chosen.remove(&section.id).unwrap_or_default();
        if !selection_count_ok(picked.len(), section.min_selections, section.max_selections) {
            return Err(ServiceError::field(
                &key("option_ids"),
                format!(
                    "{} requires between {} and {} selections",
                    section.name, section.min_selections, section.max_selections
                ),
            ));
        }
        if picked.is_empty() {
            continue;
        }
        result.push(SelectedSection {
            section_id: section.id,
            section_name: section.name.clone(),
            options: picked
                .into_iter()
                .map(|o| SelectedOption {
                    option_id: o.id,
                    name: o.name.clone(),
                    price_adjustment: o.price_adjustment,
                })
                .collect(),
        });
    }
    Ok(result)
}

async fn price_combo<C: ConnectionTrait>(
    conn: &C,
    restaurant: &restaurant::Model,
    promotions: &[ActivePromotion],
    item: &OrderItemInput,
    combo_id: Uuid,
    key: &(dyn Fn(&str) -> String + Sync),
) -> Result<PricedItem, ServiceError> {
    let combo = combo::Entity::find_by_id(combo_id)
        .filter(combo::Column::RestaurantId.eq(restaurant.id))
        .filter(combo::Column::IsActive.eq(true))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::field(&key("combo_id"), "Combo is not available"))?;

    let sections = combo_choices(conn, &combo, &item.option_ids, key).await?;
    let base = round_money(
        combo.price
            + sections
                .iter()
                .flat_map(|s| s.options.iter())
                .map(|o| o.price_adjustment)
                .sum::<Decimal>(),
    );
    let discount = discount_for(promotions, base, None, None, Some(combo.id));

    Ok(PricedItem {
        product_id: None,
        variant_id: None,
        combo_id: Some(combo.id),
        promotion_id: discount.map(|(id, _)| id),
        name: combo.name,
        quantity: item.quantity,
        unit_price: base,
        unit_discount: discount.map(|(_, d)| d).unwrap_or(Decimal::ZERO),
        sections,
        notes: item.notes.clone(),
    })
}

/// Resolves one pick per choice group of a combo, in group order.
async fn combo_choices<C: ConnectionTrait>(
    conn: &C,
    combo: &combo::Model,
    option_ids: &[Uuid],
    key: &(dyn Fn(&str) -> String + Sync),
) -> Result<Vec<SelectedSection>, ServiceError> {
    let groups = combo_item::Entity::find()
        .filter(combo_item::Column::ComboId.eq(combo.id))
        .filter(combo_item::Column::IsChoiceGroup.eq(true))
        .order_by_asc(combo_item::Column::SortOrder)
        .all(conn)
        .await?;
    if groups.is_empty() {
        if option_ids.is_empty() {
            return Ok(Vec::new());
        }
        return Err(ServiceError::field(
            &key("option_ids"),
            "This combo has no choices to make",
        ));
    }

    let options = if option_ids.is_empty() {
        Vec::new()
    } else {
        combo_item_option::Entity::find()
            .filter(combo_item_option::Column::Id.is_in(option_ids.iter().copied()))
            .filter(combo_item_option::Column::ComboItemId.is_in(groups.iter().map(|g| g.id)))
            .all(conn)
            .await?
    };

    let mut chosen: HashMap<Uuid, &combo_item_option::Model> = HashMap::new();
    for option_id in option_ids {
        let option = options
            .iter()
            .find(|o| o.id == *option_id)
            .ok_or_else(|| {
                ServiceError::field(
                    &key("option_ids"),
                    format!("Option {} is not a choice of this combo", option_id),
                )
            })?;
        if chosen.insert(option.combo_item_id, option).is_some() {
            return Err(ServiceError::field(
                &key("option_ids"),
                format!("{} takes exactly one choice", group_label(&groups, option.combo_item_id)),
            ));
        }
    }

    let products = if chosen.is_empty() {
        Vec::new()
    } else {
        product::Entity::find()
            .filter(product::Column::Id.is_in(chosen.values().map(|o| o.product_id)))
            .all(conn)
            .await?
    };
    let variant_ids: Vec<Uuid> = chosen.values().filter_map(|o| o.variant_id).collect();
    let variants = if variant_ids.is_empty() {
        Vec::new()
    } else {
        product_variant::Entity::find()
            .filter(product_variant::Column::Id.is_in(variant_ids))
            .all(conn)
            .await?
    };

    let mut result = Vec::with_capacity(groups.len());
    for group in &groups {
        let label = group_label(&groups, group.id);
        let option = chosen.get(&group.id).ok_or_else(|| {
            ServiceError::field(&key("option_ids"), format!("{} requires a choice", label))
        })?;
        let product = products
            .iter()
            .find(|p| p.id == option.product_id)
            .filter(|p| p.is_orderable())
            .ok_or_else(|| {
                ServiceError::field(
                    &key("option_ids"),
                    format!("The {} choice is not available", label),
                )
            })?;
        let name = match option.variant_id {
            Some(variant_id) => {
                let variant = variants
                    .iter()
                    .find(|v| v.id == variant_id && v.is_active)
                    .ok_or_else(|| {
                        ServiceError::field(
                            &key("option_ids"),
                            format!("The {} choice is not available", label),
                        )
                    })?;
                format!("{} - {}", product.name, variant.name)
            }
            None => product.name.clone(),
        };
        result.push(SelectedSection {
            section_id: group.id,
            section_name: label,
            options: vec![SelectedOption {
                option_id: option.id,
                name,
                price_adjustment: option.price_adjustment,
            }],
        });
    }
    Ok(result)
}

fn group_label(groups: &[combo_item::Model], group_id: Uuid) -> String {
    groups
        .iter()
        .find(|g| g.id == group_id)
        .and_then(|g| g.group_name.clone())
        .unwrap_or_else(|| "Choice".to_string())
}

async fn price_bundle<C: ConnectionTrait>(
    conn: &C,
    restaurant: &restaurant::Model,
    now: DateTime<Utc>,
    item: &OrderItemInput,
    promotion_id: Uuid,
    key: &(dyn Fn(&str) -> String + Sync),
) -> Result<PricedItem, ServiceError> {
    let bundle = promotion::Entity::find_by_id(promotion_id)
        .filter(promotion::Column::RestaurantId.eq(restaurant.id))
        .filter(promotion::Column::PromotionType.eq(PromotionType::BundleSpecial))
        .one(conn)
        .await?
        .filter(|p| is_valid_now(p, restaurant.utc_offset_minutes, now))
        .ok_or_else(|| {
            ServiceError::field(
                &key("promotion_id"),
                "Bundle special is not currently available",
            )
        })?;

    Ok(PricedItem {
        product_id: None,
        variant_id: None,
        combo_id: None,
        promotion_id: Some(bundle.id),
        name: bundle.name,
        quantity: item.quantity,
        unit_price: round_money(bundle.discount_value),
        unit_discount: Decimal::ZERO,
        sections: Vec::new(),
        notes: item.notes.clone(),
    })
}
