//! Manual sort order for menu collections.
//!
//! Every sortable table keeps its `sort_order` column contiguous (`1..=n`)
//! within its parent: batches are rewritten whole, appends go to `max + 1`
//! and deletes compact the remaining siblings.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        badge_type, bundle_promotion_item, category, combo, combo_item, combo_item_option,
        product, product_section, product_variant, promotion, promotion_item, section,
        section_option,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics::REORDER_BATCHES,
    models::sort_order::{self, SortEntry},
};

/// A table whose rows are ordered manually within a parent row.
pub trait Sortable: EntityTrait {
    fn id_column() -> Self::Column;
    fn parent_column() -> Self::Column;
    fn sort_column() -> Self::Column;
}

macro_rules! sortable {
    ($($module:ident => $parent:ident),+ $(,)?) => {
        $(
            impl Sortable for $module::Entity {
                fn id_column() -> Self::Column {
                    $module::Column::Id
                }
                fn parent_column() -> Self::Column {
                    $module::Column::$parent
                }
                fn sort_column() -> Self::Column {
                    $module::Column::SortOrder
                }
            }
        )+
    };
}

sortable! {
    category => RestaurantId,
    product => CategoryId,
    product_variant => ProductId,
    section => RestaurantId,
    section_option => SectionId,
    product_section => ProductId,
    combo => RestaurantId,
    combo_item => ComboId,
    combo_item_option => ComboItemId,
    promotion => RestaurantId,
    promotion_item => PromotionId,
    bundle_promotion_item => PromotionId,
    badge_type => RestaurantId,
}

/// Current children of `parent_id` in display order.
pub async fn current_order<E: Sortable, C: ConnectionTrait>(
    conn: &C,
    parent_id: Uuid,
) -> Result<Vec<SortEntry>, ServiceError> {
    let rows: Vec<(Uuid, i32)> = E::find()
        .select_only()
        .column(E::id_column())
        .column(E::sort_column())
        .filter(E::parent_column().eq(parent_id))
        .order_by_asc(E::sort_column())
        .order_by_asc(E::id_column())
        .into_tuple()
        .all(conn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(id, sort_order)| SortEntry { id, sort_order })
        .collect())
}

/// Position for a child appended under `parent_id`.
pub async fn next_sort_order<E: Sortable, C: ConnectionTrait>(
    conn: &C,
    parent_id: Uuid,
) -> Result<i32, ServiceError> {
    let max: Option<Option<i32>> = E::find()
        .select_only()
        .column_as(E::sort_column().max(), "max_sort_order")
        .filter(E::parent_column().eq(parent_id))
        .into_tuple()
        .one(conn)
        .await?;
    Ok(max.flatten().unwrap_or(0) + 1)
}

async fn write_positions<E: Sortable, C: ConnectionTrait>(
    conn: &C,
    entries: &[SortEntry],
) -> Result<(), ServiceError> {
    for entry in entries {
        E::update_many()
            .col_expr(E::sort_column(), Expr::value(entry.sort_order))
            .filter(E::id_column().eq(entry.id))
            .exec(conn)
            .await?;
    }
    Ok(())
}

/// Validates `batch` against the parent's children and rewrites positions.
pub async fn reorder_in<E: Sortable, C: ConnectionTrait>(
    conn: &C,
    parent_id: Uuid,
    batch: &[SortEntry],
) -> Result<Vec<SortEntry>, ServiceError> {
    let current: Vec<Uuid> = current_order::<E, _>(conn, parent_id)
        .await?
        .into_iter()
        .map(|entry| entry.id)
        .collect();
    let planned = sort_order::plan(&current, batch)?;
    write_positions::<E, _>(conn, &planned).await?;
    Ok(planned)
}

/// Closes gaps left by a delete. Run in the deleting transaction.
pub async fn compact_in<E: Sortable, C: ConnectionTrait>(
    conn: &C,
    parent_id: Uuid,
) -> Result<usize, ServiceError> {
    let siblings = current_order::<E, _>(conn, parent_id).await?;
    let moved = sort_order::compact(&siblings);
    write_positions::<E, _>(conn, &moved).await?;
    Ok(moved.len())
}

/// Collections that accept a reorder batch, keyed by their URL segment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SortScope {
    /// Categories of a restaurant
    Categories,
    /// Products of a category
    Products,
    /// Variants of a product
    Variants,
    /// Sections of a restaurant
    Sections,
    /// Options of a section
    SectionOptions,
    /// Combos of a restaurant
    Combos,
    /// Items of a combo
    ComboItems,
    /// Promotions of a restaurant
    Promotions,
    /// Items of a promotion
    PromotionItems,
    /// Badge types of a restaurant
    BadgeTypes,
}

#[derive(Clone)]
pub struct ReorderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ReorderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Applies a full reorder batch for one parent, all or nothing.
    #[instrument(skip(self, batch), fields(items = batch.len()))]
    pub async fn reorder(
        &self,
        restaurant_id: Uuid,
        scope: SortScope,
        parent_id: Uuid,
        batch: &[SortEntry],
    ) -> Result<Vec<SortEntry>, ServiceError> {
        let txn = self.db_pool.begin().await?;
        ensure_parent_owned(&txn, scope, parent_id, restaurant_id).await?;

        let applied = match scope {
            SortScope::Categories => reorder_in::<category::Entity, _>(&txn, parent_id, batch).await?,
            SortScope::Products => reorder_in::<product::Entity, _>(&txn, parent_id, batch).await?,
            SortScope::Variants => {
                reorder_in::<product_variant::Entity, _>(&txn, parent_id, batch).await?
            }
            SortScope::Sections => reorder_in::<section::Entity, _>(&txn, parent_id, batch).await?,
            SortScope::SectionOptions => {
                reorder_in::<section_option::Entity, _>(&txn, parent_id, batch).await?
            }
            SortScope::Combos => reorder_in::<combo::Entity, _>(&txn, parent_id, batch).await?,
            SortScope::ComboItems => {
                reorder_in::<combo_item::Entity, _>(&txn, parent_id, batch).await?
            }
            SortScope::Promotions => {
                reorder_in::<promotion::Entity, _>(&txn, parent_id, batch).await?
            }
            SortScope::PromotionItems => {
                reorder_in::<promotion_item::Entity, _>(&txn, parent_id, batch).await?
            }
            SortScope::BadgeTypes => {
                reorder_in::<badge_type::Entity, _>(&txn, parent_id, batch).await?
            }
        };
        txn.commit().await?;

        REORDER_BATCHES
            .with_label_values(&[&scope.to_string()])
            .inc();
        self.event_sender.send_or_log(Event::MenuReordered {
            restaurant_id,
            scope: scope.to_string(),
            parent_id,
            items: applied.len(),
        });
        info!(%scope, %parent_id, items = applied.len(), "Sort order applied");
        Ok(applied)
    }
}

/// A parent from another restaurant reads as not found.
async fn ensure_parent_owned<C: ConnectionTrait>(
    conn: &C,
    scope: SortScope,
    parent_id: Uuid,
    restaurant_id: Uuid,
) -> Result<(), ServiceError> {
    let owned = match scope {
        SortScope::Categories
        | SortScope::Sections
        | SortScope::Combos
        | SortScope::Promotions
        | SortScope::BadgeTypes => parent_id == restaurant_id,
        SortScope::Products => category::Entity::find_by_id(parent_id)
            .filter(category::Column::RestaurantId.eq(restaurant_id))
            .one(conn)
            .await?
            .is_some(),
        SortScope::Variants => product::Entity::find_by_id(parent_id)
            .filter(product::Column::RestaurantId.eq(restaurant_id))
            .one(conn)
            .await?
            .is_some(),
        SortScope::SectionOptions => section::Entity::find_by_id(parent_id)
            .filter(section::Column::RestaurantId.eq(restaurant_id))
            .one(conn)
            .await?
            .is_some(),
        SortScope::ComboItems => combo::Entity::find_by_id(parent_id)
            .filter(combo::Column::RestaurantId.eq(restaurant_id))
            .one(conn)
            .await?
            .is_some(),
        SortScope::PromotionItems => promotion::Entity::find_by_id(parent_id)
            .filter(promotion::Column::RestaurantId.eq(restaurant_id))
            .one(conn)
            .await?
            .is_some(),
    };

    if owned {
        Ok(())
    } else {
        Err(ServiceError::NotFound(format!(
            "No {} parent {} in this restaurant",
            scope, parent_id
        )))
    }
}
