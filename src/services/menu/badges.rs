use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::views::{BadgeTypeView, ProductBadgeView};
use super::{default_true, MenuService};
use crate::entities::{badge_type, product_badge};
use crate::errors::ServiceError;
use crate::services::reorder::{compact_in, next_sort_order};

/// Label such as "New" or "Spicy" shown on products.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct BadgeTypeRequest {
    #[validate(length(min = 1, max = 60, message = "Name is required"))]
    pub name: String,
    #[validate(length(max = 32))]
    pub color: Option<String>,
    #[validate(length(max = 60))]
    pub icon: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Schedules a badge on a product; an open end keeps it indefinitely.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_badge_window"))]
pub struct ProductBadgeRequest {
    pub badge_type_id: Uuid,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

fn validate_badge_window(request: &ProductBadgeRequest) -> Result<(), ValidationError> {
    match (request.starts_at, request.ends_at) {
        (Some(starts), Some(ends)) if ends < starts => {
            let mut err = ValidationError::new("ends_before_start");
            err.message = Some("ends_at must not be before starts_at".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

impl MenuService {
    pub async fn list_badge_types(&self, restaurant_id: Uuid) -> Result<Vec<BadgeTypeView>, ServiceError> {
        let rows = badge_type::Entity::find()
            .filter(badge_type::Column::RestaurantId.eq(restaurant_id))
            .order_by_asc(badge_type::Column::SortOrder)
            .all(&*self.db_pool)
            .await?;
        Ok(rows.into_iter().map(BadgeTypeView::from).collect())
    }

    async fn find_badge_type(
        &self,
        restaurant_id: Uuid,
        badge_type_id: Uuid,
    ) -> Result<badge_type::Model, ServiceError> {
        badge_type::Entity::find_by_id(badge_type_id)
            .filter(badge_type::Column::RestaurantId.eq(restaurant_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Badge type {} not found", badge_type_id)))
    }

    #[instrument(skip(self, request))]
    pub async fn create_badge_type(
        &self,
        restaurant_id: Uuid,
        request: BadgeTypeRequest,
    ) -> Result<BadgeTypeView, ServiceError> {
        request.validate()?;
        let txn = self.db_pool.begin().await?;
        let sort_order = next_sort_order::<badge_type::Entity, _>(&txn, restaurant_id).await?;
        let created = badge_type::ActiveModel {
            id: Set(Uuid::new_v4()),
            restaurant_id: Set(restaurant_id),
            name: Set(request.name.trim().to_string()),
            color: Set(request.color),
            icon: Set(request.icon),
            is_active: Set(request.is_active),
            sort_order: Set(sort_order),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(created.into())
    }

    #[instrument(skip(self, request))]
    pub async fn update_badge_type(
        &self,
        restaurant_id: Uuid,
        badge_type_id: Uuid,
        request: BadgeTypeRequest,
    ) -> Result<BadgeTypeView, ServiceError> {
        request.validate()?;
        let mut active = self
            .find_badge_type(restaurant_id, badge_type_id)
            .await?
            .into_active_model();
        active.name = Set(request.name.trim().to_string());
        active.color = Set(request.color);
        active.icon = Set(request.icon);
        active.is_active = Set(request.is_active);
        Ok(active.update(&*self.db_pool).await?.into())
    }

    /// Also removes the badge from every product carrying it.
    #[instrument(skip(self))]
    pub async fn delete_badge_type(
        &self,
        restaurant_id: Uuid,
        badge_type_id: Uuid,
    ) -> Result<(), ServiceError> {
        let existing = self.find_badge_type(restaurant_id, badge_type_id).await?;
        let txn = self.db_pool.begin().await?;
        badge_type::Entity::delete_by_id(existing.id).exec(&txn).await?;
        compact_in::<badge_type::Entity, _>(&txn, restaurant_id).await?;
        txn.commit().await?;
        info!(badge_type_id = %existing.id, "Badge type deleted");
        Ok(())
    }

    #[instrument(skip(self, request))]
    pub async fn add_product_badge(
        &self,
        restaurant_id: Uuid,
        product_id: Uuid,
        request: ProductBadgeRequest,
    ) -> Result<ProductBadgeView, ServiceError> {
        request.validate()?;
        let owner = self
            .find_product(&*self.db_pool, restaurant_id, product_id)
            .await?;
        let kind = self
            .find_badge_type(restaurant_id, request.badge_type_id)
            .await
            .map_err(|_| ServiceError::field("badge_type_id", "Badge type not found"))?;

        let created = product_badge::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(owner.id),
            badge_type_id: Set(kind.id),
            starts_at: Set(request.starts_at.unwrap_or_else(Utc::now)),
            ends_at: Set(request.ends_at),
        }
        .insert(&*self.db_pool)
        .await?;
        Ok(ProductBadgeView::new(created, &kind))
    }

    #[instrument(skip(self))]
    pub async fn remove_product_badge(
        &self,
        restaurant_id: Uuid,
        product_id: Uuid,
        badge_id: Uuid,
    ) -> Result<(), ServiceError> {
        let owner = self
            .find_product(&*self.db_pool, restaurant_id, product_id)
            .await?;
        let removed = product_badge::Entity::delete_many()
            .filter(product_badge::Column::Id.eq(badge_id))
            .filter(product_badge::Column::ProductId.eq(owner.id))
            .exec(&*self.db_pool)
            .await?
            .rows_affected;
        if removed == 0 {
            return Err(ServiceError::NotFound(format!("Badge {} not found", badge_id)));
        }
        Ok(())
    }
}
