use crate::{
    commands::orders::{
        PlaceOrderCommand, PlaceOrderRequest, TransitionOrderCommand, UpdatePaymentStatusCommand,
    },
    commands::Command,
    db::DbPool,
    entities::order_item::SelectedSection,
    entities::{order, order_item, order_status_history, restaurant},
    errors::ServiceError,
    events::EventSender,
    models::order_status::{
        allowed_actions, Actor, ActorType, AvailableActions, OrderAction, OrderStatus,
        PaymentMethod, PaymentStatus, ServiceType,
    },
    notifications::{KitchenTicket, PrintService},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub variant_id: Option<Uuid>,
    pub combo_id: Option<Uuid>,
    pub promotion_id: Option<Uuid>,
    pub name: String,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    #[schema(value_type = String)]
    pub total_price: Decimal,
    pub selected_options: Vec<SelectedSection>,
    pub notes: Option<String>,
}

impl From<order_item::Model> for OrderItemResponse {
    fn from(item: order_item::Model) -> Self {
        let selected_options = item.sections();
        Self {
            id: item.id,
            product_id: item.product_id,
            variant_id: item.variant_id,
            combo_id: item.combo_id,
            promotion_id: item.promotion_id,
            name: item.name,
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price,
            selected_options,
            notes: item.notes,
        }
    }
}

/// An order with its lines and the actions the current state permits.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub service_type: ServiceType,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub customer_name: String,
    pub customer_phone: String,
    pub delivery_address: Option<String>,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub delivery_fee: Decimal,
    #[schema(value_type = String)]
    pub discount: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub notes: Option<String>,
    pub driver_id: Option<Uuid>,
    pub cancellation_reason: Option<String>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub preparing_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub assigned_to_driver_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
    pub available_actions: AvailableActions,
}

impl OrderResponse {
    pub fn new(order: order::Model, items: Vec<order_item::Model>) -> Self {
        let available_actions = allowed_actions(&order.snapshot());
        Self {
            id: order.id,
            restaurant_id: order.restaurant_id,
            order_number: order.order_number,
            status: order.status,
            service_type: order.service_type,
            payment_status: order.payment_status,
            payment_method: order.payment_method,
            customer_name: order.customer_name,
            customer_phone: order.customer_phone,
            delivery_address: order.delivery_address,
            subtotal: order.subtotal,
            delivery_fee: order.delivery_fee,
            discount: order.discount,
            total: order.total,
            notes: order.notes,
            driver_id: order.driver_id,
            cancellation_reason: order.cancellation_reason,
            accepted_at: order.accepted_at,
            preparing_at: order.preparing_at,
            ready_at: order.ready_at,
            assigned_to_driver_at: order.assigned_to_driver_at,
            picked_up_at: order.picked_up_at,
            delivered_at: order.delivered_at,
            completed_at: order.completed_at,
            cancelled_at: order.cancelled_at,
            version: order.version,
            created_at: order.created_at,
            updated_at: order.updated_at,
            items: items.into_iter().map(OrderItemResponse::from).collect(),
            available_actions,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub from_status: Option<OrderStatus>,
    pub status: OrderStatus,
    pub changed_by_type: ActorType,
    pub changed_by_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<order_status_history::Model> for StatusHistoryEntry {
    fn from(row: order_status_history::Model) -> Self {
        Self {
            id: row.id,
            from_status: row.from_status,
            status: row.status,
            changed_by_type: row.changed_by_type,
            changed_by_id: row.changed_by_id,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

/// Filters accepted by the staff order list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub service_type: Option<ServiceType>,
    pub driver_id: Option<Uuid>,
    /// Orders created at or after this instant
    pub from: Option<DateTime<Utc>>,
    /// Orders created before this instant
    pub to: Option<DateTime<Utc>>,
    /// Matches order number or customer name
    pub search: Option<String>,
}

impl OrderFilter {
    fn condition(&self, restaurant_id: Uuid) -> Condition {
        let mut cond = Condition::all().add(order::Column::RestaurantId.eq(restaurant_id));
        if let Some(status) = self.status {
            cond = cond.add(order::Column::Status.eq(status));
        }
        if let Some(service_type) = self.service_type {
            cond = cond.add(order::Column::ServiceType.eq(service_type));
        }
        if let Some(driver_id) = self.driver_id {
            cond = cond.add(order::Column::DriverId.eq(driver_id));
        }
        if let Some(from) = self.from {
            cond = cond.add(order::Column::CreatedAt.gte(from));
        }
        if let Some(to) = self.to {
            cond = cond.add(order::Column::CreatedAt.lt(to));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            cond = cond.add(
                Condition::any()
                    .add(order::Column::OrderNumber.contains(search))
                    .add(order::Column::CustomerName.contains(search)),
            );
        }
        cond
    }
}

/// Service for reading and driving restaurant orders
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    printer: Arc<dyn PrintService>,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        printer: Arc<dyn PrintService>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            printer,
        }
    }

    #[instrument(skip(self, restaurant, request), fields(restaurant_id = %restaurant.id))]
    pub async fn place_order(
        &self,
        restaurant: restaurant::Model,
        request: PlaceOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        let placed = PlaceOrderCommand {
            restaurant,
            request,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await?;
        self.with_items(placed).await
    }

    /// Runs a workflow action and returns the updated order.
    #[instrument(skip(self, action, notes), fields(action = action.name()))]
    pub async fn transition(
        &self,
        restaurant_id: Uuid,
        order_id: Uuid,
        action: OrderAction,
        actor: Actor,
        expected_version: Option<i32>,
        notes: Option<String>,
    ) -> Result<OrderResponse, ServiceError> {
        let result = TransitionOrderCommand {
            order_id,
            restaurant_id,
            action,
            actor,
            expected_version,
            notes,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await?;
        self.with_items(result.order).await
    }

    #[instrument(skip(self))]
    pub async fn update_payment_status(
        &self,
        restaurant_id: Uuid,
        order_id: Uuid,
        status: PaymentStatus,
        expected_version: Option<i32>,
    ) -> Result<OrderResponse, ServiceError> {
        let updated = UpdatePaymentStatusCommand {
            order_id,
            restaurant_id,
            status,
            expected_version,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await?;
        self.with_items(updated).await
    }

    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        restaurant_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderResponse, ServiceError> {
        let order = self.find(restaurant_id, order_id).await?;
        self.with_items(order).await
    }

    /// Newest first. Returns the page and the total match count.
    #[instrument(skip(self, filter))]
    pub async fn list_orders(
        &self,
        restaurant_id: Uuid,
        filter: &OrderFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderResponse>, u64), ServiceError> {
        let db = &*self.db_pool;
        let paginator = order::Entity::find()
            .filter(filter.condition(restaurant_id))
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::OrderNumber)
            .paginate(db, per_page);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        let mut responses = Vec::with_capacity(orders.len());
        for order in orders {
            responses.push(self.with_items(order).await?);
        }
        Ok((responses, total))
    }

    /// Oldest entry first.
    #[instrument(skip(self))]
    pub async fn status_history(
        &self,
        restaurant_id: Uuid,
        order_id: Uuid,
    ) -> Result<Vec<StatusHistoryEntry>, ServiceError> {
        let order = self.find(restaurant_id, order_id).await?;
        let rows = order
            .find_related(order_status_history::Entity)
            .order_by_asc(order_status_history::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?;
        Ok(rows.into_iter().map(StatusHistoryEntry::from).collect())
    }

    /// Orders a driver still has to pick up or deliver.
    #[instrument(skip(self))]
    pub async fn driver_orders(
        &self,
        restaurant_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Vec<OrderResponse>, ServiceError> {
        let orders = order::Entity::find()
            .filter(order::Column::RestaurantId.eq(restaurant_id))
            .filter(order::Column::DriverId.eq(driver_id))
            .filter(
                order::Column::Status.is_in([OrderStatus::Ready, OrderStatus::OutForDelivery]),
            )
            .order_by_asc(order::Column::AssignedToDriverAt)
            .all(&*self.db_pool)
            .await?;

        let mut responses = Vec::with_capacity(orders.len());
        for order in orders {
            responses.push(self.with_items(order).await?);
        }
        Ok(responses)
    }

    /// Sends the order's kitchen ticket to the configured printer.
    #[instrument(skip(self))]
    pub async fn print_ticket(
        &self,
        restaurant_id: Uuid,
        order_id: Uuid,
    ) -> Result<KitchenTicket, ServiceError> {
        let order = self.find(restaurant_id, order_id).await?;
        let items = order
            .find_related(order_item::Entity)
            .all(&*self.db_pool)
            .await?;
        let ticket = KitchenTicket::new(&order, &items);
        self.printer.print(&ticket).await?;
        info!(order_id = %order.id, "Kitchen ticket printed");
        Ok(ticket)
    }

    async fn find(&self, restaurant_id: Uuid, order_id: Uuid) -> Result<order::Model, ServiceError> {
        order::Entity::find_by_id(order_id)
            .filter(order::Column::RestaurantId.eq(restaurant_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    async fn with_items(&self, order: order::Model) -> Result<OrderResponse, ServiceError> {
        let items = order
            .find_related(order_item::Entity)
            .order_by_asc(order_item::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?;
        Ok(OrderResponse::new(order, items))
    }
}
