use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::views::CategoryView;
use super::{default_true, MenuService};
use crate::entities::category;
use crate::errors::ServiceError;
use crate::services::reorder::{compact_in, next_sort_order};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl MenuService {
    pub async fn list_categories(&self, restaurant_id: Uuid) -> Result<Vec<CategoryView>, ServiceError> {
        let rows = category::Entity::find()
            .filter(category::Column::RestaurantId.eq(restaurant_id))
            .order_by_asc(category::Column::SortOrder)
            .all(&*self.db_pool)
            .await?;
        Ok(rows.into_iter().map(CategoryView::from).collect())
    }

    pub(crate) async fn find_category(
        &self,
        restaurant_id: Uuid,
        category_id: Uuid,
    ) -> Result<category::Model, ServiceError> {
        category::Entity::find_by_id(category_id)
            .filter(category::Column::RestaurantId.eq(restaurant_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", category_id)))
    }

    #[instrument(skip(self, request))]
    pub async fn create_category(
        &self,
        restaurant_id: Uuid,
        request: CategoryRequest,
    ) -> Result<CategoryView, ServiceError> {
        request.validate()?;
        let txn = self.db_pool.begin().await?;
        let sort_order = next_sort_order::<category::Entity, _>(&txn, restaurant_id).await?;
        let created = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            restaurant_id: Set(restaurant_id),
            name: Set(request.name.trim().to_string()),
            description: Set(request.description),
            image_url: Set(request.image_url),
            is_active: Set(request.is_active),
            sort_order: Set(sort_order),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(category_id = %created.id, "Category created");
        Ok(created.into())
    }

    #[instrument(skip(self, request))]
    pub async fn update_category(
        &self,
        restaurant_id: Uuid,
        category_id: Uuid,
        request: CategoryRequest,
    ) -> Result<CategoryView, ServiceError> {
        request.validate()?;
        let mut active = self
            .find_category(restaurant_id, category_id)
            .await?
            .into_active_model();
        active.name = Set(request.name.trim().to_string());
        active.description = Set(request.description);
        active.image_url = Set(request.image_url);
        active.is_active = Set(request.is_active);
        Ok(active.update(&*self.db_pool).await?.into())
    }

    /// Deletes the category with its products.
    #[instrument(skip(self))]
    pub async fn delete_category(
        &self,
        restaurant_id: Uuid,
        category_id: Uuid,
    ) -> Result<(), ServiceError> {
        let existing = self.find_category(restaurant_id, category_id).await?;
        let txn = self.db_pool.begin().await?;
        category::Entity::delete_by_id(existing.id).exec(&txn).await?;
        compact_in::<category::Entity, _>(&txn, restaurant_id).await?;
        txn.commit().await?;

        info!(category_id = %existing.id, "Category deleted");
        Ok(())
    }
}
