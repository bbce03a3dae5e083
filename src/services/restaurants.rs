use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    db::DbPool, entities::restaurant, errors::ServiceError, services::menu::non_negative,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RestaurantView {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    #[schema(value_type = String)]
    pub delivery_fee: Decimal,
    pub utc_offset_minutes: i32,
    pub order_prefix: String,
    pub created_at: DateTime<Utc>,
}

impl From<restaurant::Model> for RestaurantView {
    fn from(m: restaurant::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            slug: m.slug,
            phone: m.phone,
            address: m.address,
            is_active: m.is_active,
            delivery_fee: m.delivery_fee,
            utc_offset_minutes: m.utc_offset_minutes,
            order_prefix: m.order_prefix,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RestaurantRequest {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    /// Lowercase letters, digits and dashes
    #[validate(length(min = 2, max = 60), custom = "validate_slug")]
    pub slug: String,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[serde(default = "crate::services::menu::default_true")]
    pub is_active: bool,
    #[validate(custom = "non_negative")]
    #[serde(default)]
    #[schema(value_type = String)]
    pub delivery_fee: Decimal,
    #[validate(range(min = -720, max = 840))]
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[validate(length(min = 1, max = 8), custom = "validate_prefix")]
    pub order_prefix: String,
}

fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let well_formed = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-');
    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_slug"))
    }
}

fn validate_prefix(prefix: &str) -> Result<(), ValidationError> {
    if prefix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_order_prefix"))
    }
}

#[derive(Clone)]
pub struct RestaurantService {
    db_pool: Arc<DbPool>,
}

impl RestaurantService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    pub async fn list(&self) -> Result<Vec<RestaurantView>, ServiceError> {
        let rows = restaurant::Entity::find()
            .order_by_asc(restaurant::Column::Name)
            .all(&*self.db_pool)
            .await?;
        Ok(rows.into_iter().map(RestaurantView::from).collect())
    }

    pub async fn get(&self, restaurant_id: Uuid) -> Result<restaurant::Model, ServiceError> {
        restaurant::Entity::find_by_id(restaurant_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Restaurant {} not found", restaurant_id)))
    }

    /// Inactive restaurants read as missing to customers.
    pub async fn find_active_by_slug(&self, slug: &str) -> Result<restaurant::Model, ServiceError> {
        restaurant::Entity::find()
            .filter(restaurant::Column::Slug.eq(slug))
            .filter(restaurant::Column::IsActive.eq(true))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Restaurant {} not found", slug)))
    }

    #[instrument(skip(self, request), fields(slug = %request.slug))]
    pub async fn create(&self, request: RestaurantRequest) -> Result<RestaurantView, ServiceError> {
        request.validate()?;
        self.ensure_slug_free(&request.slug, None).await?;

        let now = Utc::now();
        let created = restaurant::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            slug: Set(request.slug),
            phone: Set(request.phone),
            address: Set(request.address),
            is_active: Set(request.is_active),
            delivery_fee: Set(request.delivery_fee),
            utc_offset_minutes: Set(request.utc_offset_minutes),
            order_prefix: Set(request.order_prefix),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(restaurant_id = %created.id, "Restaurant created");
        Ok(created.into())
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        restaurant_id: Uuid,
        request: RestaurantRequest,
    ) -> Result<RestaurantView, ServiceError> {
        request.validate()?;
        let current = self.get(restaurant_id).await?;
        self.ensure_slug_free(&request.slug, Some(current.id)).await?;

        let mut active = current.into_active_model();
        active.name = Set(request.name.trim().to_string());
        active.slug = Set(request.slug);
        active.phone = Set(request.phone);
        active.address = Set(request.address);
        active.is_active = Set(request.is_active);
        active.delivery_fee = Set(request.delivery_fee);
        active.utc_offset_minutes = Set(request.utc_offset_minutes);
        active.order_prefix = Set(request.order_prefix);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db_pool).await?.into())
    }

    async fn ensure_slug_free(&self, slug: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
        let taken = restaurant::Entity::find()
            .filter(restaurant::Column::Slug.eq(slug))
            .one(&*self.db_pool)
            .await?
            .is_some_and(|existing| Some(existing.id) != except);
        if taken {
            Err(ServiceError::field("slug", "Slug is already in use"))
        } else {
            Ok(())
        }
    }
}
