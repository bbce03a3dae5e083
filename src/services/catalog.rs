//! Customer-facing read model of a restaurant's menu.
//!
//! Only active records are shown. Badges and promotions are filtered to the
//! ones in effect at the time of the request, in the restaurant's local time.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        badge_type, category, combo, product, product_badge, product_section, product_variant,
        restaurant, section, section_option,
    },
    errors::ServiceError,
    models::pricing::round_money,
    models::promotion_validity::badge_active_at,
    services::menu::combos::combo_view,
    services::menu::views::{
        AppliedPromotionView, CategoryView, ComboView, ProductBadgeView, ProductView,
        PromotionView, SectionView, VariantView,
    },
    services::pricing::{active_promotions, discount_for, ActivePromotion},
    services::promotions::promotion_view,
    services::restaurants::RestaurantView,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MenuCategoryView {
    #[serde(flatten)]
    pub category: CategoryView,
    pub products: Vec<ProductView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MenuView {
    pub restaurant: RestaurantView,
    pub categories: Vec<MenuCategoryView>,
    pub combos: Vec<ComboView>,
    pub promotions: Vec<PromotionView>,
}

#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// The full public menu of an active restaurant.
    #[instrument(skip(self, restaurant), fields(restaurant_id = %restaurant.id))]
    pub async fn menu(
        &self,
        restaurant: restaurant::Model,
        now: DateTime<Utc>,
    ) -> Result<MenuView, ServiceError> {
        let db = &*self.db_pool;
        let promotions = active_promotions(db, &restaurant, now).await?;

        let categories = category::Entity::find()
            .filter(category::Column::RestaurantId.eq(restaurant.id))
            .filter(category::Column::IsActive.eq(true))
            .order_by_asc(category::Column::SortOrder)
            .all(db)
            .await?;
        let products = product::Entity::find()
            .filter(product::Column::RestaurantId.eq(restaurant.id))
            .filter(product::Column::IsActive.eq(true))
            .order_by_asc(product::Column::SortOrder)
            .all(db)
            .await?;
        let mut products_by_category: HashMap<Uuid, Vec<ProductView>> = HashMap::new();
        for view in self.product_views(products, &promotions, now).await? {
            products_by_category
                .entry(view.category_id)
                .or_default()
                .push(view);
        }

        let categories = categories
            .into_iter()
            .map(|c| MenuCategoryView {
                products: products_by_category.remove(&c.id).unwrap_or_default(),
                category: c.into(),
            })
            .collect();

        let combos = combo::Entity::find()
            .filter(combo::Column::RestaurantId.eq(restaurant.id))
            .filter(combo::Column::IsActive.eq(true))
            .order_by_asc(combo::Column::SortOrder)
            .all(db)
            .await?;
        let mut combo_views = Vec::with_capacity(combos.len());
        for found in combos {
            combo_views.push(self.public_combo(found, &promotions).await?);
        }

        let mut promotion_views = Vec::with_capacity(promotions.len());
        for active in promotions {
            promotion_views.push(promotion_view(db, active.promotion).await?);
        }

        Ok(MenuView {
            restaurant: restaurant.into(),
            categories,
            combos: combo_views,
            promotions: promotion_views,
        })
    }

    /// A single active product in an active category of an active restaurant.
    #[instrument(skip(self))]
    pub async fn product(&self, product_id: Uuid, now: DateTime<Utc>) -> Result<ProductView, ServiceError> {
        let db = &*self.db_pool;
        let not_found = || ServiceError::NotFound(format!("Product {} not found", product_id));
        let found = product::Entity::find_by_id(product_id)
            .filter(product::Column::IsActive.eq(true))
            .one(db)
            .await?
            .ok_or_else(not_found)?;
        category::Entity::find_by_id(found.category_id)
            .filter(category::Column::IsActive.eq(true))
            .one(db)
            .await?
            .ok_or_else(not_found)?;
        let owner = self.active_restaurant(found.restaurant_id).await.map_err(|_| not_found())?;

        let promotions = active_promotions(db, &owner, now).await?;
        self.product_views(vec![found], &promotions, now)
            .await?
            .pop()
            .ok_or_else(not_found)
    }

    /// A single active combo of an active restaurant.
    #[instrument(skip(self))]
    pub async fn combo(&self, combo_id: Uuid, now: DateTime<Utc>) -> Result<ComboView, ServiceError> {
        let db = &*self.db_pool;
        let not_found = || ServiceError::NotFound(format!("Combo {} not found", combo_id));
        let found = combo::Entity::find_by_id(combo_id)
            .filter(combo::Column::IsActive.eq(true))
            .one(db)
            .await?
            .ok_or_else(not_found)?;
        let owner = self.active_restaurant(found.restaurant_id).await.map_err(|_| not_found())?;

        let promotions = active_promotions(db, &owner, now).await?;
        self.public_combo(found, &promotions).await
    }

    async fn active_restaurant(&self, restaurant_id: Uuid) -> Result<restaurant::Model, ServiceError> {
        restaurant::Entity::find_by_id(restaurant_id)
            .filter(restaurant::Column::IsActive.eq(true))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Restaurant {} not found", restaurant_id)))
    }

    async fn public_combo(
        &self,
        found: combo::Model,
        promotions: &[ActivePromotion],
    ) -> Result<ComboView, ServiceError> {
        let price = found.price;
        let id = found.id;
        let mut view = combo_view(&*self.db_pool, found).await?;
        view.promotion = applied(promotions, price, None, None, Some(id));
        Ok(view)
    }

    /// Expands products with their active variants, sections, current badges
    /// and best current promotion, loading each relation once.
    async fn product_views(
        &self,
        products: Vec<product::Model>,
        promotions: &[ActivePromotion],
        now: DateTime<Utc>,
    ) -> Result<Vec<ProductView>, ServiceError> {
        if products.is_empty() {
            return Ok(Vec::new());
        }
        let db = &*self.db_pool;
        let product_ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();

        let mut variants: HashMap<Uuid, Vec<VariantView>> = HashMap::new();
        for variant in product_variant::Entity::find()
            .filter(product_variant::Column::ProductId.is_in(product_ids.iter().copied()))
            .filter(product_variant::Column::IsActive.eq(true))
            .order_by_asc(product_variant::Column::SortOrder)
            .all(db)
            .await?
        {
            variants
                .entry(variant.product_id)
                .or_default()
                .push(variant.into());
        }

        let links = product_section::Entity::find()
            .filter(product_section::Column::ProductId.is_in(product_ids.iter().copied()))
            .order_by_asc(product_section::Column::SortOrder)
            .all(db)
            .await?;
        let sections: HashMap<Uuid, SectionView> = if links.is_empty() {
            HashMap::new()
        } else {
            let found = section::Entity::find()
                .filter(section::Column::Id.is_in(links.iter().map(|l| l.section_id)))
                .filter(section::Column::IsActive.eq(true))
                .all(db)
                .await?;
            let mut options: HashMap<Uuid, Vec<section_option::Model>> = HashMap::new();
            for option in section_option::Entity::find()
                .filter(section_option::Column::SectionId.is_in(found.iter().map(|s| s.id)))
                .filter(section_option::Column::IsActive.eq(true))
                .order_by_asc(section_option::Column::SortOrder)
                .all(db)
                .await?
            {
                options.entry(option.section_id).or_default().push(option);
            }
            found
                .into_iter()
                .map(|s| {
                    let opts = options.remove(&s.id).unwrap_or_default();
                    (s.id, SectionView::new(s, opts))
                })
                .collect()
        };
        let mut sections_by_product: HashMap<Uuid, Vec<SectionView>> = HashMap::new();
        for link in &links {
            if let Some(view) = sections.get(&link.section_id) {
                sections_by_product
                    .entry(link.product_id)
                    .or_default()
                    .push(view.clone());
            }
        }

        let mut badges: HashMap<Uuid, Vec<ProductBadgeView>> = HashMap::new();
        for (badge, kind) in product_badge::Entity::find()
            .filter(product_badge::Column::ProductId.is_in(product_ids.iter().copied()))
            .find_also_related(badge_type::Entity)
            .order_by_asc(product_badge::Column::StartsAt)
            .all(db)
            .await?
        {
            let Some(kind) = kind.filter(|k| k.is_active) else {
                continue;
            };
            if badge_active_at(badge.starts_at, badge.ends_at, now) {
                badges
                    .entry(badge.product_id)
                    .or_default()
                    .push(ProductBadgeView::new(badge, &kind));
            }
        }

        Ok(products
            .into_iter()
            .map(|p| {
                let promotion = applied(promotions, p.price, Some(p.id), Some(p.category_id), None);
                let id = p.id;
                let mut view = ProductView::basic(p);
                view.variants = variants.remove(&id).unwrap_or_default();
                view.sections = sections_by_product.remove(&id).unwrap_or_default();
                view.badges = badges.remove(&id).unwrap_or_default();
                view.promotion = promotion;
                view
            })
            .collect())
    }
}

/// The promotion a customer would get on the base price right now.
fn applied(
    promotions: &[ActivePromotion],
    base: Decimal,
    product_id: Option<Uuid>,
    category_id: Option<Uuid>,
    combo_id: Option<Uuid>,
) -> Option<AppliedPromotionView> {
    let (promotion_id, discount) = discount_for(promotions, base, product_id, category_id, combo_id)?;
    let promotion = promotions
        .iter()
        .find(|p| p.promotion.id == promotion_id)?
        .promotion
        .clone();
    Some(AppliedPromotionView {
        promotion_id,
        name: promotion.name,
        promotion_type: promotion.promotion_type,
        discount,
        final_price: round_money(base - discount),
    })
}
