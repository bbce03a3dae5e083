use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::views::{ComboItemView, ComboView};
use super::{default_true, non_negative, MenuService};
use crate::entities::{combo, combo_item, combo_item_option, product};
use crate::errors::ServiceError;
use crate::services::reorder::{compact_in, next_sort_order};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ComboRequest {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(custom = "non_negative")]
    #[schema(value_type = String)]
    pub price: Decimal,
    #[validate(url)]
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[validate(length(min = 1, message = "A combo needs at least one item"))]
    pub items: Vec<ComboItemRequest>,
}

/// A fixed product, or a choice group the customer picks one option from.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_combo_item"))]
pub struct ComboItemRequest {
    pub product_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
    #[validate(range(min = 1, max = 20))]
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub is_choice_group: bool,
    #[validate(length(min = 1, max = 120))]
    pub group_name: Option<String>,
    #[serde(default)]
    pub options: Vec<ComboItemOptionRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComboItemOptionRequest {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    #[serde(default)]
    #[schema(value_type = String)]
    pub price_adjustment: Decimal,
}

fn default_quantity() -> i32 {
    1
}

fn validate_combo_item(item: &ComboItemRequest) -> Result<(), ValidationError> {
    let fail = |code: &'static str, message: &'static str| {
        let mut err = ValidationError::new(code);
        err.message = Some(message.into());
        Err(err)
    };
    if item.is_choice_group {
        if item.group_name.is_none() {
            return fail("group_name_required", "A choice group needs a group_name");
        }
        if item.options.is_empty() {
            return fail("options_required", "A choice group needs at least one option");
        }
        if item.product_id.is_some() {
            return fail("product_not_allowed", "A choice group takes options, not a product_id");
        }
    } else {
        if item.product_id.is_none() {
            return fail("product_required", "A fixed combo item needs a product_id");
        }
        if !item.options.is_empty() {
            return fail("options_not_allowed", "Only choice groups take options");
        }
    }
    Ok(())
}

impl MenuService {
    pub async fn list_combos(&self, restaurant_id: Uuid) -> Result<Vec<ComboView>, ServiceError> {
        let combos = combo::Entity::find()
            .filter(combo::Column::RestaurantId.eq(restaurant_id))
            .order_by_asc(combo::Column::SortOrder)
            .all(&*self.db_pool)
            .await?;
        let mut views = Vec::with_capacity(combos.len());
        for found in combos {
            views.push(combo_view(&*self.db_pool, found).await?);
        }
        Ok(views)
    }

    async fn find_combo<C: ConnectionTrait>(
        &self,
        conn: &C,
        restaurant_id: Uuid,
        combo_id: Uuid,
    ) -> Result<combo::Model, ServiceError> {
        combo::Entity::find_by_id(combo_id)
            .filter(combo::Column::RestaurantId.eq(restaurant_id))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Combo {} not found", combo_id)))
    }

    pub async fn get_combo(&self, restaurant_id: Uuid, combo_id: Uuid) -> Result<ComboView, ServiceError> {
        let found = self.find_combo(&*self.db_pool, restaurant_id, combo_id).await?;
        combo_view(&*self.db_pool, found).await
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_combo(
        &self,
        restaurant_id: Uuid,
        request: ComboRequest,
    ) -> Result<ComboView, ServiceError> {
        validate_combo(&request)?;

        let txn = self.db_pool.begin().await?;
        ensure_products(&txn, restaurant_id, &request.items).await?;
        let sort_order = next_sort_order::<combo::Entity, _>(&txn, restaurant_id).await?;
        let created = combo::ActiveModel {
            id: Set(Uuid::new_v4()),
            restaurant_id: Set(restaurant_id),
            name: Set(request.name.trim().to_string()),
            description: Set(request.description),
            price: Set(request.price),
            image_url: Set(request.image_url),
            is_active: Set(request.is_active),
            sort_order: Set(sort_order),
        }
        .insert(&txn)
        .await?;
        insert_items(&txn, created.id, request.items).await?;
        txn.commit().await?;

        info!(combo_id = %created.id, "Combo created");
        self.get_combo(restaurant_id, created.id).await
    }

    /// Replaces the combo's fields and its full item list.
    #[instrument(skip(self, request))]
    pub async fn update_combo(
        &self,
        restaurant_id: Uuid,
        combo_id: Uuid,
        request: ComboRequest,
    ) -> Result<ComboView, ServiceError> {
        validate_combo(&request)?;

        let txn = self.db_pool.begin().await?;
        let current = self.find_combo(&txn, restaurant_id, combo_id).await?;
        ensure_products(&txn, restaurant_id, &request.items).await?;

        let mut active = current.into_active_model();
        active.name = Set(request.name.trim().to_string());
        active.description = Set(request.description);
        active.price = Set(request.price);
        active.image_url = Set(request.image_url);
        active.is_active = Set(request.is_active);
        active.update(&txn).await?;

        combo_item::Entity::delete_many()
            .filter(combo_item::Column::ComboId.eq(combo_id))
            .exec(&txn)
            .await?;
        insert_items(&txn, combo_id, request.items).await?;
        txn.commit().await?;

        self.get_combo(restaurant_id, combo_id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_combo(&self, restaurant_id: Uuid, combo_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        let existing = self.find_combo(&txn, restaurant_id, combo_id).await?;
        combo::Entity::delete_by_id(existing.id).exec(&txn).await?;
        compact_in::<combo::Entity, _>(&txn, restaurant_id).await?;
        txn.commit().await?;

        info!(combo_id = %existing.id, "Combo deleted");
        Ok(())
    }
}

fn validate_combo(request: &ComboRequest) -> Result<(), ServiceError> {
    request.validate()?;
    let mut fields = BTreeMap::new();
    for (index, item) in request.items.iter().enumerate() {
        let Err(errors) = item.validate() else {
            continue;
        };
        if let ServiceError::ValidationFailed(item_fields) = ServiceError::from(errors) {
            for (field, messages) in item_fields {
                // Struct-level checks report under "__all__".
                let key = match field.as_str() {
                    "__all__" => format!("items[{}]", index),
                    _ => format!("items[{}].{}", index, field),
                };
                fields.insert(key, messages);
            }
        }
    }
    if fields.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::ValidationFailed(fields))
    }
}

/// Every product a combo refers to must belong to the same restaurant.
async fn ensure_products<C: ConnectionTrait>(
    conn: &C,
    restaurant_id: Uuid,
    items: &[ComboItemRequest],
) -> Result<(), ServiceError> {
    let ids: BTreeSet<Uuid> = items
        .iter()
        .flat_map(|item| {
            item.product_id
                .into_iter()
                .chain(item.options.iter().map(|o| o.product_id))
        })
        .collect();
    if ids.is_empty() {
        return Ok(());
    }
    let found = product::Entity::find()
        .filter(product::Column::RestaurantId.eq(restaurant_id))
        .filter(product::Column::Id.is_in(ids.iter().copied()))
        .count(conn)
        .await?;
    if found as usize == ids.len() {
        Ok(())
    } else {
        Err(ServiceError::field("items", "Combo refers to an unknown product"))
    }
}

async fn insert_items<C: ConnectionTrait>(
    conn: &C,
    combo_id: Uuid,
    items: Vec<ComboItemRequest>,
) -> Result<(), ServiceError> {
    for (item, position) in items.into_iter().zip(1..) {
        let created = combo_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            combo_id: Set(combo_id),
            product_id: Set(item.product_id),
            variant_id: Set(item.variant_id),
            quantity: Set(item.quantity),
            is_choice_group: Set(item.is_choice_group),
            group_name: Set(item.group_name),
            sort_order: Set(position),
        }
        .insert(conn)
        .await?;

        for (option, option_position) in item.options.into_iter().zip(1..) {
            combo_item_option::ActiveModel {
                id: Set(Uuid::new_v4()),
                combo_item_id: Set(created.id),
                product_id: Set(option.product_id),
                variant_id: Set(option.variant_id),
                price_adjustment: Set(option.price_adjustment),
                sort_order: Set(option_position),
            }
            .insert(conn)
            .await?;
        }
    }
    Ok(())
}

pub(crate) async fn combo_view<C: ConnectionTrait>(
    conn: &C,
    found: combo::Model,
) -> Result<ComboView, ServiceError> {
    let items = found
        .find_related(combo_item::Entity)
        .order_by_asc(combo_item::Column::SortOrder)
        .all(conn)
        .await?;
    let mut views = Vec::with_capacity(items.len());
    for item in items {
        let options = item
            .find_related(combo_item_option::Entity)
            .order_by_asc(combo_item_option::Column::SortOrder)
            .all(conn)
            .await?;
        views.push(ComboItemView::new(item, options));
    }
    Ok(ComboView::new(found, views))
}
