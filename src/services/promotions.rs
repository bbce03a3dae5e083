use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    db::DbPool,
    entities::promotion::{DiscountType, PromotionType, ValidityType},
    entities::{
        badge_type, bundle_promotion_item, category, combo, product, promotion, promotion_item,
        restaurant,
    },
    errors::ServiceError,
    models::promotion_validity::is_valid_now,
    services::menu::views::PromotionView,
    services::reorder::{compact_in, next_sort_order},
};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_promotion"))]
pub struct PromotionRequest {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub promotion_type: PromotionType,
    pub discount_type: DiscountType,
    /// Percentage, amount off, or the fixed price, depending on `discount_type`.
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
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub items: Vec<PromotionItemRequest>,
    #[serde(default)]
    pub bundle_items: Vec<BundleItemRequest>,
}

/// What a daily special or discount applies to: one product, a whole
/// category, or a combo.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PromotionItemRequest {
    pub product_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub combo_id: Option<Uuid>,
    #[schema(value_type = Option<String>)]
    pub special_price: Option<Decimal>,
}

impl PromotionItemRequest {
    fn target_count(&self) -> usize {
        [
            self.product_id.is_some(),
            self.category_id.is_some(),
            self.combo_id.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BundleItemRequest {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

fn invalid(code: &'static str, message: &'static str) -> Result<(), ValidationError> {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    Err(err)
}

fn validate_promotion(request: &PromotionRequest) -> Result<(), ValidationError> {
    if request.discount_value.is_sign_negative() && !request.discount_value.is_zero() {
        return invalid("negative_discount", "discount_value must not be negative");
    }
    if request.discount_type == DiscountType::Percentage && request.discount_value > Decimal::ONE_HUNDRED {
        return invalid("percentage_too_large", "A percentage discount cannot exceed 100");
    }
    if let (Some(from), Some(until)) = (request.valid_from, request.valid_until) {
        if from > until {
            return invalid("date_range_reversed", "valid_from must not be after valid_until");
        }
    }
    if request.time_from.is_some() != request.time_until.is_some() {
        return invalid("time_window_incomplete", "time_from and time_until must be set together");
    }

    let has_dates = request.valid_from.is_some() || request.valid_until.is_some();
    let has_times = request.time_from.is_some();
    let has_weekdays = request.weekdays.as_ref().is_some_and(|days| !days.is_empty());
    match request.validity_type {
        ValidityType::DateRange if !has_dates => {
            return invalid("dates_required", "A date range promotion needs valid_from or valid_until")
        }
        ValidityType::TimeRange if !has_times => {
            return invalid("times_required", "A time range promotion needs time_from and time_until")
        }
        ValidityType::DateTimeRange if !(has_dates && has_times) => {
            return invalid("dates_and_times_required", "A date and time range promotion needs both a date bound and a time window")
        }
        ValidityType::Weekdays if !has_weekdays => {
            return invalid("weekdays_required", "A weekday promotion needs at least one weekday")
        }
        _ => {}
    }
    if let Some(days) = &request.weekdays {
        if days.iter().any(|day| !(1..=7).contains(day)) {
            return invalid("weekday_out_of_range", "Weekdays are numbered 1 (Monday) to 7 (Sunday)");
        }
    }

    if request.promotion_type == PromotionType::BundleSpecial {
        if request.bundle_items.is_empty() {
            return invalid("bundle_items_required", "A bundle special needs at least one bundle item");
        }
        if request.bundle_items.iter().any(|item| item.quantity < 1) {
            return invalid("bundle_quantity", "Bundle item quantities must be at least 1");
        }
    } else {
        if request.items.is_empty() {
            return invalid("items_required", "A promotion needs at least one target item");
        }
        if request.items.iter().any(|item| item.target_count() != 1) {
            return invalid(
                "item_target",
                "Each promotion item targets exactly one of product_id, category_id or combo_id",
            );
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct PromotionService {
    db_pool: Arc<DbPool>,
}

impl PromotionService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    pub async fn list(&self, restaurant_id: Uuid) -> Result<Vec<PromotionView>, ServiceError> {
        let promotions = promotion::Entity::find()
            .filter(promotion::Column::RestaurantId.eq(restaurant_id))
            .order_by_asc(promotion::Column::SortOrder)
            .all(&*self.db_pool)
            .await?;
        let mut views = Vec::with_capacity(promotions.len());
        for found in promotions {
            views.push(promotion_view(&*self.db_pool, found).await?);
        }
        Ok(views)
    }

    /// Promotions a customer can use right now, in display order.
    #[instrument(skip(self, restaurant), fields(restaurant_id = %restaurant.id))]
    pub async fn active_now(
        &self,
        restaurant: &restaurant::Model,
        now: DateTime<Utc>,
    ) -> Result<Vec<PromotionView>, ServiceError> {
        let promotions = promotion::Entity::find()
            .filter(promotion::Column::RestaurantId.eq(restaurant.id))
            .filter(promotion::Column::IsActive.eq(true))
            .order_by_asc(promotion::Column::SortOrder)
            .all(&*self.db_pool)
            .await?;
        let mut views = Vec::new();
        for found in promotions
            .into_iter()
            .filter(|p| is_valid_now(p, restaurant.utc_offset_minutes, now))
        {
            views.push(promotion_view(&*self.db_pool, found).await?);
        }
        Ok(views)
    }

    async fn find<C: ConnectionTrait>(
        &self,
        conn: &C,
        restaurant_id: Uuid,
        promotion_id: Uuid,
    ) -> Result<promotion::Model, ServiceError> {
        promotion::Entity::find_by_id(promotion_id)
            .filter(promotion::Column::RestaurantId.eq(restaurant_id))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Promotion {} not found", promotion_id)))
    }

    pub async fn get(&self, restaurant_id: Uuid, promotion_id: Uuid) -> Result<PromotionView, ServiceError> {
        let found = self.find(&*self.db_pool, restaurant_id, promotion_id).await?;
        promotion_view(&*self.db_pool, found).await
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(
        &self,
        restaurant_id: Uuid,
        request: PromotionRequest,
    ) -> Result<PromotionView, ServiceError> {
        request.validate()?;

        let txn = self.db_pool.begin().await?;
        ensure_references(&txn, restaurant_id, &request).await?;
        let now = Utc::now();
        let sort_order = next_sort_order::<promotion::Entity, _>(&txn, restaurant_id).await?;
        let id = Uuid::new_v4();
        promotion::ActiveModel {
            id: Set(id),
            restaurant_id: Set(restaurant_id),
            name: Set(request.name.trim().to_string()),
            description: Set(request.description.clone()),
            promotion_type: Set(request.promotion_type),
            discount_type: Set(request.discount_type),
            discount_value: Set(request.discount_value),
            validity_type: Set(request.validity_type),
            valid_from: Set(request.valid_from),
            valid_until: Set(request.valid_until),
            time_from: Set(request.time_from),
            time_until: Set(request.time_until),
            weekdays: Set(weekdays_json(&request.weekdays)?),
            badge_type_id: Set(request.badge_type_id),
            is_active: Set(request.is_active),
            sort_order: Set(sort_order),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        insert_targets(&txn, id, &request).await?;
        txn.commit().await?;

        info!(promotion_id = %id, promotion_type = %request.promotion_type, "Promotion created");
        self.get(restaurant_id, id).await
    }

    /// Replaces the promotion and all of its targets.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        restaurant_id: Uuid,
        promotion_id: Uuid,
        request: PromotionRequest,
    ) -> Result<PromotionView, ServiceError> {
        request.validate()?;

        let txn = self.db_pool.begin().await?;
        let current = self.find(&txn, restaurant_id, promotion_id).await?;
        ensure_references(&txn, restaurant_id, &request).await?;

        let mut active = current.into_active_model();
        active.name = Set(request.name.trim().to_string());
        active.description = Set(request.description.clone());
        active.promotion_type = Set(request.promotion_type);
        active.discount_type = Set(request.discount_type);
        active.discount_value = Set(request.discount_value);
        active.validity_type = Set(request.validity_type);
        active.valid_from = Set(request.valid_from);
        active.valid_until = Set(request.valid_until);
        active.time_from = Set(request.time_from);
        active.time_until = Set(request.time_until);
        active.weekdays = Set(weekdays_json(&request.weekdays)?);
        active.badge_type_id = Set(request.badge_type_id);
        active.is_active = Set(request.is_active);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        promotion_item::Entity::delete_many()
            .filter(promotion_item::Column::PromotionId.eq(promotion_id))
            .exec(&txn)
            .await?;
        bundle_promotion_item::Entity::delete_many()
            .filter(bundle_promotion_item::Column::PromotionId.eq(promotion_id))
            .exec(&txn)
            .await?;
        insert_targets(&txn, promotion_id, &request).await?;
        txn.commit().await?;

        self.get(restaurant_id, promotion_id).await
    }

    #[instrument(skip(self))]
    pub async fn toggle_active(
        &self,
        restaurant_id: Uuid,
        promotion_id: Uuid,
    ) -> Result<PromotionView, ServiceError> {
        let current = self.find(&*self.db_pool, restaurant_id, promotion_id).await?;
        let is_active = !current.is_active;
        let mut active = current.into_active_model();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db_pool).await?;
        info!(promotion_id = %updated.id, is_active, "Promotion toggled");
        promotion_view(&*self.db_pool, updated).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, restaurant_id: Uuid, promotion_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        let existing = self.find(&txn, restaurant_id, promotion_id).await?;
        promotion::Entity::delete_by_id(existing.id).exec(&txn).await?;
        compact_in::<promotion::Entity, _>(&txn, restaurant_id).await?;
        txn.commit().await?;
        info!(promotion_id = %existing.id, "Promotion deleted");
        Ok(())
    }
}

fn weekdays_json(weekdays: &Option<Vec<u8>>) -> Result<Option<serde_json::Value>, ServiceError> {
    match weekdays {
        Some(days) if !days.is_empty() => {
            let mut days = days.clone();
            days.sort_unstable();
            days.dedup();
            Ok(Some(serde_json::to_value(days)?))
        }
        _ => Ok(None),
    }
}

/// Targets and the badge must belong to the same restaurant.
async fn ensure_references<C: ConnectionTrait>(
    conn: &C,
    restaurant_id: Uuid,
    request: &PromotionRequest,
) -> Result<(), ServiceError> {
    let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut missing = |field: String, message: &str| {
        errors.entry(field).or_default().push(message.to_string());
    };

    if let Some(badge_id) = request.badge_type_id {
        let found = badge_type::Entity::find_by_id(badge_id)
            .filter(badge_type::Column::RestaurantId.eq(restaurant_id))
            .count(conn)
            .await?;
        if found == 0 {
            missing("badge_type_id".into(), "Badge type not found");
        }
    }

    for (index, item) in request.items.iter().enumerate() {
        let found = if let Some(id) = item.product_id {
            product::Entity::find_by_id(id)
                .filter(product::Column::RestaurantId.eq(restaurant_id))
                .count(conn)
                .await?
        } else if let Some(id) = item.category_id {
            category::Entity::find_by_id(id)
                .filter(category::Column::RestaurantId.eq(restaurant_id))
                .count(conn)
                .await?
        } else if let Some(id) = item.combo_id {
            combo::Entity::find_by_id(id)
                .filter(combo::Column::RestaurantId.eq(restaurant_id))
                .count(conn)
                .await?
        } else {
            0
        };
        if found == 0 {
            missing(format!("items[{}]", index), "Target not found");
        }
    }

    for (index, item) in request.bundle_items.iter().enumerate() {
        let found = product::Entity::find_by_id(item.product_id)
            .filter(product::Column::RestaurantId.eq(restaurant_id))
            .count(conn)
            .await?;
        if found == 0 {
            missing(format!("bundle_items[{}].product_id", index), "Product not found");
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::ValidationFailed(errors))
    }
}

async fn insert_targets<C: ConnectionTrait>(
    conn: &C,
    promotion_id: Uuid,
    request: &PromotionRequest,
) -> Result<(), ServiceError> {
    if request.promotion_type == PromotionType::BundleSpecial {
        for (item, position) in request.bundle_items.iter().zip(1..) {
            bundle_promotion_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                promotion_id: Set(promotion_id),
                product_id: Set(item.product_id),
                variant_id: Set(item.variant_id),
                quantity: Set(item.quantity),
                sort_order: Set(position),
            }
            .insert(conn)
            .await?;
        }
        return Ok(());
    }

    for (item, position) in request.items.iter().zip(1..) {
        promotion_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            promotion_id: Set(promotion_id),
            product_id: Set(item.product_id),
            category_id: Set(item.category_id),
            combo_id: Set(item.combo_id),
            special_price: Set(item.special_price),
            sort_order: Set(position),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

pub(crate) async fn promotion_view<C: ConnectionTrait>(
    conn: &C,
    found: promotion::Model,
) -> Result<PromotionView, ServiceError> {
    let items = found
        .find_related(promotion_item::Entity)
        .order_by_asc(promotion_item::Column::SortOrder)
        .all(conn)
        .await?;
    let bundle_items = found
        .find_related(bundle_promotion_item::Entity)
        .order_by_asc(bundle_promotion_item::Column::SortOrder)
        .all(conn)
        .await?;
    Ok(PromotionView::new(found, items, bundle_items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn discount() -> PromotionRequest {
        PromotionRequest {
            name: "Lunch deal".into(),
            description: None,
            promotion_type: PromotionType::Discount,
            discount_type: DiscountType::Percentage,
            discount_value: dec!(15),
            validity_type: ValidityType::Permanent,
            valid_from: None,
            valid_until: None,
            time_from: None,
            time_until: None,
            weekdays: None,
            badge_type_id: None,
            is_active: true,
            items: vec![PromotionItemRequest {
                product_id: Some(Uuid::new_v4()),
                category_id: None,
                combo_id: None,
                special_price: None,
            }],
            bundle_items: Vec::new(),
        }
    }

    #[test]
    fn percentage_is_capped_at_one_hundred() {
        assert!(discount().validate().is_ok());
        let too_much = PromotionRequest {
            discount_value: dec!(120),
            ..discount()
        };
        assert!(too_much.validate().is_err());
    }

    #[test]
    fn weekday_promotions_need_valid_days() {
        let mut request = PromotionRequest {
            validity_type: ValidityType::Weekdays,
            ..discount()
        };
        assert!(request.validate().is_err());

        request.weekdays = Some(vec![1, 3, 5]);
        assert!(request.validate().is_ok());

        request.weekdays = Some(vec![0, 8]);
        assert!(request.validate().is_err());
    }

    #[test]
    fn time_window_needs_both_ends() {
        let request = PromotionRequest {
            validity_type: ValidityType::TimeRange,
            time_from: NaiveTime::from_hms_opt(11, 0, 0),
            ..discount()
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn items_target_exactly_one_thing() {
        let mut request = discount();
        request.items[0].category_id = Some(Uuid::new_v4());
        assert!(request.validate().is_err());
    }

    #[test]
    fn bundles_list_their_products() {
        let request = PromotionRequest {
            promotion_type: PromotionType::BundleSpecial,
            discount_type: DiscountType::FixedPrice,
            discount_value: dec!(199),
            items: Vec::new(),
            ..discount()
        };
        assert!(request.validate().is_err());
    }
}
