use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::views::{SectionOptionView, SectionView};
use super::{default_true, MenuService};
use crate::entities::{product_section, section, section_option};
use crate::errors::ServiceError;
use crate::services::reorder::{compact_in, next_sort_order};

/// A customization group such as "Size" or "Extras".
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_selection_bounds"))]
pub struct SectionRequest {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    #[validate(range(min = 0, max = 50))]
    #[serde(default)]
    pub min_selections: i32,
    /// 0 means no upper bound
    #[validate(range(min = 0, max = 50))]
    #[serde(default)]
    pub max_selections: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn validate_selection_bounds(request: &SectionRequest) -> Result<(), ValidationError> {
    if request.max_selections > 0 && request.min_selections > request.max_selections {
        let mut err = ValidationError::new("min_exceeds_max");
        err.message = Some("min_selections cannot exceed max_selections".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateSectionRequest {
    #[serde(flatten)]
    #[validate]
    pub section: SectionRequest,
    #[serde(default)]
    pub options: Vec<SectionOptionRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SectionOptionRequest {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    /// May be negative for "no cheese" style options.
    #[serde(default)]
    #[schema(value_type = String)]
    pub price_adjustment: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl MenuService {
    pub async fn list_sections(&self, restaurant_id: Uuid) -> Result<Vec<SectionView>, ServiceError> {
        let db = &*self.db_pool;
        let sections = section::Entity::find()
            .filter(section::Column::RestaurantId.eq(restaurant_id))
            .order_by_asc(section::Column::SortOrder)
            .all(db)
            .await?;
        if sections.is_empty() {
            return Ok(Vec::new());
        }

        let mut options: HashMap<Uuid, Vec<section_option::Model>> = HashMap::new();
        for option in section_option::Entity::find()
            .filter(section_option::Column::SectionId.is_in(sections.iter().map(|s| s.id)))
            .order_by_asc(section_option::Column::SortOrder)
            .all(db)
            .await?
        {
            options.entry(option.section_id).or_default().push(option);
        }

        Ok(sections
            .into_iter()
            .map(|s| {
                let opts = options.remove(&s.id).unwrap_or_default();
                SectionView::new(s, opts)
            })
            .collect())
    }

    async fn find_section<C: ConnectionTrait>(
        &self,
        conn: &C,
        restaurant_id: Uuid,
        section_id: Uuid,
    ) -> Result<section::Model, ServiceError> {
        section::Entity::find_by_id(section_id)
            .filter(section::Column::RestaurantId.eq(restaurant_id))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Section {} not found", section_id)))
    }

    pub async fn get_section(
        &self,
        restaurant_id: Uuid,
        section_id: Uuid,
    ) -> Result<SectionView, ServiceError> {
        let db = &*self.db_pool;
        let found = self.find_section(db, restaurant_id, section_id).await?;
        let options = found
            .find_related(section_option::Entity)
            .order_by_asc(section_option::Column::SortOrder)
            .all(db)
            .await?;
        Ok(SectionView::new(found, options))
    }

    #[instrument(skip(self, request), fields(name = %request.section.name))]
    pub async fn create_section(
        &self,
        restaurant_id: Uuid,
        request: CreateSectionRequest,
    ) -> Result<SectionView, ServiceError> {
        request.validate()?;
        for option in &request.options {
            option.validate()?;
        }

        let txn = self.db_pool.begin().await?;
        let sort_order = next_sort_order::<section::Entity, _>(&txn, restaurant_id).await?;
        let fields = request.section;
        let created = section::ActiveModel {
            id: Set(Uuid::new_v4()),
            restaurant_id: Set(restaurant_id),
            name: Set(fields.name.trim().to_string()),
            min_selections: Set(fields.min_selections),
            max_selections: Set(fields.max_selections),
            is_active: Set(fields.is_active),
            sort_order: Set(sort_order),
        }
        .insert(&txn)
        .await?;

        for (option, position) in request.options.into_iter().zip(1..) {
            insert_option(&txn, created.id, option, position).await?;
        }
        txn.commit().await?;

        info!(section_id = %created.id, "Section created");
        self.get_section(restaurant_id, created.id).await
    }

    #[instrument(skip(self, request))]
    pub async fn update_section(
        &self,
        restaurant_id: Uuid,
        section_id: Uuid,
        request: SectionRequest,
    ) -> Result<SectionView, ServiceError> {
        request.validate()?;
        let mut active = self
            .find_section(&*self.db_pool, restaurant_id, section_id)
            .await?
            .into_active_model();
        active.name = Set(request.name.trim().to_string());
        active.min_selections = Set(request.min_selections);
        active.max_selections = Set(request.max_selections);
        active.is_active = Set(request.is_active);
        active.update(&*self.db_pool).await?;
        self.get_section(restaurant_id, section_id).await
    }

    /// Refused while any product still offers the section.
    #[instrument(skip(self))]
    pub async fn delete_section(
        &self,
        restaurant_id: Uuid,
        section_id: Uuid,
    ) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        let existing = self.find_section(&txn, restaurant_id, section_id).await?;
        let in_use = product_section::Entity::find()
            .filter(product_section::Column::SectionId.eq(existing.id))
            .count(&txn)
            .await?;
        if in_use > 0 {
            return Err(ServiceError::Conflict(format!(
                "Section \"{}\" is used by {} product(s); unlink it before deleting",
                existing.name, in_use
            )));
        }

        section::Entity::delete_by_id(existing.id).exec(&txn).await?;
        compact_in::<section::Entity, _>(&txn, restaurant_id).await?;
        txn.commit().await?;

        info!(section_id = %existing.id, "Section deleted");
        Ok(())
    }

    #[instrument(skip(self, request))]
    pub async fn add_section_option(
        &self,
        restaurant_id: Uuid,
        section_id: Uuid,
        request: SectionOptionRequest,
    ) -> Result<SectionOptionView, ServiceError> {
        request.validate()?;
        let txn = self.db_pool.begin().await?;
        let owner = self.find_section(&txn, restaurant_id, section_id).await?;
        let position = next_sort_order::<section_option::Entity, _>(&txn, owner.id).await?;
        let created = insert_option(&txn, owner.id, request, position).await?;
        txn.commit().await?;
        Ok(created.into())
    }

    #[instrument(skip(self, request))]
    pub async fn update_section_option(
        &self,
        restaurant_id: Uuid,
        option_id: Uuid,
        request: SectionOptionRequest,
    ) -> Result<SectionOptionView, ServiceError> {
        request.validate()?;
        let option = self.find_section_option(restaurant_id, option_id).await?;
        let mut active = option.into_active_model();
        active.name = Set(request.name.trim().to_string());
        active.price_adjustment = Set(request.price_adjustment);
        active.is_active = Set(request.is_active);
        Ok(active.update(&*self.db_pool).await?.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_section_option(
        &self,
        restaurant_id: Uuid,
        option_id: Uuid,
    ) -> Result<(), ServiceError> {
        let option = self.find_section_option(restaurant_id, option_id).await?;
        let txn = self.db_pool.begin().await?;
        section_option::Entity::delete_by_id(option.id)
            .exec(&txn)
            .await?;
        compact_in::<section_option::Entity, _>(&txn, option.section_id).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn find_section_option(
        &self,
        restaurant_id: Uuid,
        option_id: Uuid,
    ) -> Result<section_option::Model, ServiceError> {
        let not_found = || ServiceError::NotFound(format!("Option {} not found", option_id));
        let option = section_option::Entity::find_by_id(option_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(not_found)?;
        self.find_section(&*self.db_pool, restaurant_id, option.section_id)
            .await
            .map_err(|_| not_found())?;
        Ok(option)
    }
}

async fn insert_option<C: ConnectionTrait>(
    conn: &C,
    section_id: Uuid,
    request: SectionOptionRequest,
    sort_order: i32,
) -> Result<section_option::Model, ServiceError> {
    Ok(section_option::ActiveModel {
        id: Set(Uuid::new_v4()),
        section_id: Set(section_id),
        name: Set(request.name.trim().to_string()),
        price_adjustment: Set(request.price_adjustment),
        is_active: Set(request.is_active),
        sort_order: Set(sort_order),
    }
    .insert(conn)
    .await?)
}
