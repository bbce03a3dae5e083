use chrono::Utc;
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
use validator::Validate;

use super::views::{ProductBadgeView, ProductView, SectionView, VariantView};
use super::{default_true, ensure_unique, non_negative, MenuService};
use crate::entities::{
    badge_type, category, product, product_badge, product_section, product_variant, section,
    section_option,
};
use crate::errors::ServiceError;
use crate::services::reorder::{compact_in, next_sort_order};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ProductRequest {
    pub category_id: Uuid,
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
    #[serde(default = "default_true")]
    pub is_available: bool,
}

/// A product created together with its variants and section links.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[serde(flatten)]
    #[validate]
    pub product: ProductRequest,
    #[serde(default)]
    pub variants: Vec<VariantRequest>,
    #[serde(default)]
    pub section_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct VariantRequest {
    #[validate(length(min = 1, max = 120, message = "Name is required"))]
    pub name: String,
    #[validate(custom = "non_negative")]
    #[schema(value_type = String)]
    pub price: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl MenuService {
    /// Products in display order, optionally within one category.
    pub async fn list_products(
        &self,
        restaurant_id: Uuid,
        category_id: Option<Uuid>,
    ) -> Result<Vec<ProductView>, ServiceError> {
        let mut query = product::Entity::find().filter(product::Column::RestaurantId.eq(restaurant_id));
        if let Some(category_id) = category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        let products = query
            .order_by_asc(product::Column::CategoryId)
            .order_by_asc(product::Column::SortOrder)
            .all(&*self.db_pool)
            .await?;

        let mut variants: HashMap<Uuid, Vec<VariantView>> = HashMap::new();
        if !products.is_empty() {
            for variant in product_variant::Entity::find()
                .filter(product_variant::Column::ProductId.is_in(products.iter().map(|p| p.id)))
                .order_by_asc(product_variant::Column::SortOrder)
                .all(&*self.db_pool)
                .await?
            {
                variants
                    .entry(variant.product_id)
                    .or_default()
                    .push(variant.into());
            }
        }

        Ok(products
            .into_iter()
            .map(|p| {
                let id = p.id;
                let mut view = ProductView::basic(p);
                view.variants = variants.remove(&id).unwrap_or_default();
                view
            })
            .collect())
    }

    pub(crate) async fn find_product<C: ConnectionTrait>(
        &self,
        conn: &C,
        restaurant_id: Uuid,
        product_id: Uuid,
    ) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(product_id)
            .filter(product::Column::RestaurantId.eq(restaurant_id))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Full staff view: all variants, linked sections with options and badges.
    pub async fn get_product(
        &self,
        restaurant_id: Uuid,
        product_id: Uuid,
    ) -> Result<ProductView, ServiceError> {
        let db = &*self.db_pool;
        let product = self.find_product(db, restaurant_id, product_id).await?;

        let variants = product
            .find_related(product_variant::Entity)
            .order_by_asc(product_variant::Column::SortOrder)
            .all(db)
            .await?;

        let links = product_section::Entity::find()
            .filter(product_section::Column::ProductId.eq(product.id))
            .order_by_asc(product_section::Column::SortOrder)
            .all(db)
            .await?;
        let mut sections = Vec::with_capacity(links.len());
        for link in links {
            let Some(linked) = section::Entity::find_by_id(link.section_id).one(db).await? else {
                continue;
            };
            let options = section_option::Entity::find()
                .filter(section_option::Column::SectionId.eq(linked.id))
                .order_by_asc(section_option::Column::SortOrder)
                .all(db)
                .await?;
            sections.push(SectionView::new(linked, options));
        }

        let badges = product_badge::Entity::find()
            .filter(product_badge::Column::ProductId.eq(product.id))
            .find_also_related(badge_type::Entity)
            .order_by_asc(product_badge::Column::StartsAt)
            .all(db)
            .await?
            .into_iter()
            .filter_map(|(badge, kind)| kind.map(|kind| ProductBadgeView::new(badge, &kind)))
            .collect();

        let mut view = ProductView::basic(product);
        view.variants = variants.into_iter().map(VariantView::from).collect();
        view.sections = sections;
        view.badges = badges;
        Ok(view)
    }

    #[instrument(skip(self, request), fields(name = %request.product.name))]
    pub async fn create_product(
        &self,
        restaurant_id: Uuid,
        request: CreateProductRequest,
    ) -> Result<ProductView, ServiceError> {
        request.validate()?;
        for variant in &request.variants {
            variant.validate()?;
        }
        ensure_unique("section_ids", &request.section_ids)?;

        let txn = self.db_pool.begin().await?;
        ensure_category(&txn, restaurant_id, request.product.category_id).await?;
        ensure_sections(&txn, restaurant_id, &request.section_ids).await?;

        let now = Utc::now();
        let sort_order =
            next_sort_order::<product::Entity, _>(&txn, request.product.category_id).await?;
        let fields = request.product;
        let created = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            restaurant_id: Set(restaurant_id),
            category_id: Set(fields.category_id),
            name: Set(fields.name.trim().to_string()),
            description: Set(fields.description),
            price: Set(fields.price),
            image_url: Set(fields.image_url),
            is_active: Set(fields.is_active),
            is_available: Set(fields.is_available),
            sort_order: Set(sort_order),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for (variant, position) in request.variants.into_iter().zip(1..) {
            insert_variant(&txn, created.id, variant, position).await?;
        }
        link_sections(&txn, created.id, &request.section_ids).await?;
        txn.commit().await?;

        info!(product_id = %created.id, "Product created");
        self.get_product(restaurant_id, created.id).await
    }

    /// Moving to another category appends the product there and closes the
    /// gap it leaves behind.
    #[instrument(skip(self, request))]
    pub async fn update_product(
        &self,
        restaurant_id: Uuid,
        product_id: Uuid,
        request: ProductRequest,
    ) -> Result<ProductView, ServiceError> {
        request.validate()?;
        let txn = self.db_pool.begin().await?;
        let current = self.find_product(&txn, restaurant_id, product_id).await?;
        let previous_category = current.category_id;
        let moved = previous_category != request.category_id;

        let mut active = current.into_active_model();
        if moved {
            ensure_category(&txn, restaurant_id, request.category_id).await?;
            active.category_id = Set(request.category_id);
            active.sort_order =
                Set(next_sort_order::<product::Entity, _>(&txn, request.category_id).await?);
        }
        active.name = Set(request.name.trim().to_string());
        active.description = Set(request.description);
        active.price = Set(request.price);
        active.image_url = Set(request.image_url);
        active.is_active = Set(request.is_active);
        active.is_available = Set(request.is_available);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        if moved {
            compact_in::<product::Entity, _>(&txn, previous_category).await?;
        }
        txn.commit().await?;
        self.get_product(restaurant_id, product_id).await
    }

    /// Flips the "sold out" switch staff use during service.
    #[instrument(skip(self))]
    pub async fn toggle_product_availability(
        &self,
        restaurant_id: Uuid,
        product_id: Uuid,
    ) -> Result<ProductView, ServiceError> {
        let current = self
            .find_product(&*self.db_pool, restaurant_id, product_id)
            .await?;
        let is_available = !current.is_available;
        let mut active = current.into_active_model();
        active.is_available = Set(is_available);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db_pool).await?;
        info!(product_id = %updated.id, is_available, "Product availability toggled");
        Ok(ProductView::basic(updated))
    }

    #[instrument(skip(self))]
    pub async fn delete_product(
        &self,
        restaurant_id: Uuid,
        product_id: Uuid,
    ) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        let existing = self.find_product(&txn, restaurant_id, product_id).await?;
        product::Entity::delete_by_id(existing.id).exec(&txn).await?;
        compact_in::<product::Entity, _>(&txn, existing.category_id).await?;
        txn.commit().await?;

        info!(product_id = %existing.id, "Product deleted");
        Ok(())
    }

    #[instrument(skip(self, request))]
    pub async fn add_variant(
        &self,
        restaurant_id: Uuid,
        product_id: Uuid,
        request: VariantRequest,
    ) -> Result<VariantView, ServiceError> {
        request.validate()?;
        let txn = self.db_pool.begin().await?;
        let owner = self.find_product(&txn, restaurant_id, product_id).await?;
        let position = next_sort_order::<product_variant::Entity, _>(&txn, owner.id).await?;
        let created = insert_variant(&txn, owner.id, request, position).await?;
        txn.commit().await?;
        Ok(created.into())
    }

    #[instrument(skip(self, request))]
    pub async fn update_variant(
        &self,
        restaurant_id: Uuid,
        variant_id: Uuid,
        request: VariantRequest,
    ) -> Result<VariantView, ServiceError> {
        request.validate()?;
        let variant = self.find_variant(restaurant_id, variant_id).await?;
        let mut active = variant.into_active_model();
        active.name = Set(request.name.trim().to_string());
        active.price = Set(request.price);
        active.is_active = Set(request.is_active);
        Ok(active.update(&*self.db_pool).await?.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_variant(
        &self,
        restaurant_id: Uuid,
        variant_id: Uuid,
    ) -> Result<(), ServiceError> {
        let variant = self.find_variant(restaurant_id, variant_id).await?;
        let txn = self.db_pool.begin().await?;
        product_variant::Entity::delete_by_id(variant.id)
            .exec(&txn)
            .await?;
        compact_in::<product_variant::Entity, _>(&txn, variant.product_id).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn find_variant(
        &self,
        restaurant_id: Uuid,
        variant_id: Uuid,
    ) -> Result<product_variant::Model, ServiceError> {
        let not_found = || ServiceError::NotFound(format!("Variant {} not found", variant_id));
        let variant = product_variant::Entity::find_by_id(variant_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(not_found)?;
        // Ownership goes through the parent product.
        self.find_product(&*self.db_pool, restaurant_id, variant.product_id)
            .await
            .map_err(|_| not_found())?;
        Ok(variant)
    }

    /// Replaces the product's customization sections, keeping the given order.
    #[instrument(skip(self, section_ids), fields(sections = section_ids.len()))]
    pub async fn set_product_sections(
        &self,
        restaurant_id: Uuid,
        product_id: Uuid,
        section_ids: Vec<Uuid>,
    ) -> Result<ProductView, ServiceError> {
        ensure_unique("section_ids", &section_ids)?;
        let txn = self.db_pool.begin().await?;
        let owner = self.find_product(&txn, restaurant_id, product_id).await?;
        ensure_sections(&txn, restaurant_id, &section_ids).await?;

        product_section::Entity::delete_many()
            .filter(product_section::Column::ProductId.eq(owner.id))
            .exec(&txn)
            .await?;
        link_sections(&txn, owner.id, &section_ids).await?;
        txn.commit().await?;

        self.get_product(restaurant_id, product_id).await
    }
}

async fn ensure_category<C: ConnectionTrait>(
    conn: &C,
    restaurant_id: Uuid,
    category_id: Uuid,
) -> Result<(), ServiceError> {
    let exists = category::Entity::find_by_id(category_id)
        .filter(category::Column::RestaurantId.eq(restaurant_id))
        .count(conn)
        .await?
        > 0;
    if exists {
        Ok(())
    } else {
        Err(ServiceError::field("category_id", "Category not found"))
    }
}

async fn ensure_sections<C: ConnectionTrait>(
    conn: &C,
    restaurant_id: Uuid,
    section_ids: &[Uuid],
) -> Result<(), ServiceError> {
    if section_ids.is_empty() {
        return Ok(());
    }
    let found = section::Entity::find()
        .filter(section::Column::RestaurantId.eq(restaurant_id))
        .filter(section::Column::Id.is_in(section_ids.iter().copied()))
        .count(conn)
        .await?;
    if found as usize == section_ids.len() {
        Ok(())
    } else {
        Err(ServiceError::field("section_ids", "Unknown section id"))
    }
}

async fn insert_variant<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    request: VariantRequest,
    sort_order: i32,
) -> Result<product_variant::Model, ServiceError> {
    Ok(product_variant::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        name: Set(request.name.trim().to_string()),
        price: Set(request.price),
        is_active: Set(request.is_active),
        sort_order: Set(sort_order),
    }
    .insert(conn)
    .await?)
}

async fn link_sections<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    section_ids: &[Uuid],
) -> Result<(), ServiceError> {
    for (section_id, position) in section_ids.iter().zip(1..) {
        product_section::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            section_id: Set(*section_id),
            sort_order: Set(position),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}
