use crate::{
    db::DbPool,
    entities::{driver, order},
    errors::ServiceError,
    models::order_status::OrderStatus,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateDriverRequest {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 5, max = 32, message = "Phone must be between 5 and 32 characters"))]
    pub phone: String,
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateDriverRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(min = 5, max = 32))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

/// Coordinates reported by a driver's device.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_coordinates"))]
pub struct LocationUpdate {
    #[schema(value_type = String)]
    pub latitude: Decimal,
    #[schema(value_type = String)]
    pub longitude: Decimal,
}

fn validate_coordinates(location: &LocationUpdate) -> Result<(), ValidationError> {
    let lat_ok = location.latitude >= Decimal::from(-90) && location.latitude <= Decimal::from(90);
    let lng_ok =
        location.longitude >= Decimal::from(-180) && location.longitude <= Decimal::from(180);
    if lat_ok && lng_ok {
        Ok(())
    } else {
        Err(ValidationError::new("coordinates_out_of_range"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DriverView {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub is_active: bool,
    pub is_available: bool,
    #[schema(value_type = Option<String>)]
    pub current_latitude: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub current_longitude: Option<Decimal>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<driver::Model> for DriverView {
    fn from(m: driver::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            phone: m.phone,
            email: m.email,
            is_active: m.is_active,
            is_available: m.is_available,
            current_latitude: m.current_latitude,
            current_longitude: m.current_longitude,
            last_login_at: m.last_login_at,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
pub struct DriverFilter {
    pub active: Option<bool>,
    pub available: Option<bool>,
}

fn default_true() -> bool {
    true
}

/// Statuses in which an order still holds on to its driver.
const ACTIVE_DELIVERY_STATUSES: [OrderStatus; 2] = [OrderStatus::Ready, OrderStatus::OutForDelivery];

#[derive(Clone)]
pub struct DriverService {
    db_pool: Arc<DbPool>,
}

impl DriverService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        restaurant_id: Uuid,
        request: CreateDriverRequest,
    ) -> Result<driver::Model, ServiceError> {
        request.validate()?;
        let now = Utc::now();
        let created = driver::ActiveModel {
            id: Set(Uuid::new_v4()),
            restaurant_id: Set(restaurant_id),
            name: Set(request.name.trim().to_string()),
            phone: Set(request.phone.trim().to_string()),
            email: Set(request.email),
            is_active: Set(request.is_active),
            is_available: Set(request.is_active),
            current_latitude: Set(None),
            current_longitude: Set(None),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(driver_id = %created.id, "Driver created");
        Ok(created)
    }

    pub async fn get(&self, restaurant_id: Uuid, driver_id: Uuid) -> Result<driver::Model, ServiceError> {
        driver::Entity::find_by_id(driver_id)
            .filter(driver::Column::RestaurantId.eq(restaurant_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Driver {} not found", driver_id)))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        restaurant_id: Uuid,
        filter: &DriverFilter,
    ) -> Result<Vec<driver::Model>, ServiceError> {
        let mut query = driver::Entity::find().filter(driver::Column::RestaurantId.eq(restaurant_id));
        if let Some(active) = filter.active {
            query = query.filter(driver::Column::IsActive.eq(active));
        }
        if let Some(available) = filter.available {
            query = query.filter(driver::Column::IsAvailable.eq(available));
        }
        Ok(query
            .order_by_asc(driver::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        restaurant_id: Uuid,
        driver_id: Uuid,
        request: UpdateDriverRequest,
    ) -> Result<driver::Model, ServiceError> {
        request.validate()?;
        let mut active = self.get(restaurant_id, driver_id).await?.into_active_model();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(phone) = request.phone {
            active.phone = Set(phone.trim().to_string());
        }
        if request.email.is_some() {
            active.email = Set(request.email);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db_pool).await?)
    }

    /// Deactivating a driver also takes them off the available pool.
    #[instrument(skip(self))]
    pub async fn toggle_active(
        &self,
        restaurant_id: Uuid,
        driver_id: Uuid,
    ) -> Result<driver::Model, ServiceError> {
        let current = self.get(restaurant_id, driver_id).await?;
        let is_active = !current.is_active;
        let mut active = current.into_active_model();
        active.is_active = Set(is_active);
        if !is_active {
            active.is_available = Set(false);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db_pool).await?;
        info!(driver_id = %updated.id, is_active, "Driver active flag toggled");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn toggle_available(
        &self,
        restaurant_id: Uuid,
        driver_id: Uuid,
    ) -> Result<driver::Model, ServiceError> {
        let current = self.get(restaurant_id, driver_id).await?;
        if !current.is_active && !current.is_available {
            return Err(ServiceError::Conflict(
                "An inactive driver cannot be made available".to_string(),
            ));
        }
        if !current.is_available {
            let active_orders = self.active_order_count(current.id).await?;
            if active_orders > 0 {
                return Err(ServiceError::Conflict(format!(
                    "Driver has {} active order(s) and cannot be made available",
                    active_orders
                )));
            }
        }
        let is_available = !current.is_available;
        let mut active = current.into_active_model();
        active.is_available = Set(is_available);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db_pool).await?;
        info!(driver_id = %updated.id, is_available, "Driver availability toggled");
        Ok(updated)
    }

    /// Refused while the driver still holds an undelivered order.
    #[instrument(skip(self))]
    pub async fn delete(&self, restaurant_id: Uuid, driver_id: Uuid) -> Result<(), ServiceError> {
        let driver = self.get(restaurant_id, driver_id).await?;
        let active_orders = self.active_order_count(driver.id).await?;
        if active_orders > 0 {
            return Err(ServiceError::Conflict(format!(
                "Driver has {} active order(s) and cannot be deleted",
                active_orders
            )));
        }

        driver::Entity::delete_by_id(driver.id)
            .exec(&*self.db_pool)
            .await?;
        info!(driver_id = %driver.id, "Driver deleted");
        Ok(())
    }

    async fn active_order_count(&self, driver_id: Uuid) -> Result<u64, ServiceError> {
        Ok(order::Entity::find()
            .filter(order::Column::DriverId.eq(driver_id))
            .filter(order::Column::Status.is_in(ACTIVE_DELIVERY_STATUSES))
            .count(&*self.db_pool)
            .await?)
    }

    /// Records a shift start and, when given, the driver's position.
    #[instrument(skip(self, location))]
    pub async fn check_in(
        &self,
        restaurant_id: Uuid,
        driver_id: Uuid,
        location: Option<LocationUpdate>,
    ) -> Result<driver::Model, ServiceError> {
        if let Some(location) = &location {
            location.validate()?;
        }
        let current = self.get(restaurant_id, driver_id).await?;
        if !current.is_active {
            return Err(ServiceError::Forbidden("Driver account is inactive".to_string()));
        }

        let now = Utc::now();
        let mut active = current.into_active_model();
        active.last_login_at = Set(Some(now));
        if let Some(location) = location {
            active.current_latitude = Set(Some(location.latitude));
            active.current_longitude = Set(Some(location.longitude));
        }
        active.updated_at = Set(now);
        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self, location))]
    pub async fn update_location(
        &self,
        restaurant_id: Uuid,
        driver_id: Uuid,
        location: LocationUpdate,
    ) -> Result<driver::Model, ServiceError> {
        location.validate()?;
        let mut active = self.get(restaurant_id, driver_id).await?.into_active_model();
        active.current_latitude = Set(Some(location.latitude));
        active.current_longitude = Set(Some(location.longitude));
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db_pool).await?)
    }
}
