use crate::{
    commands::Command,
    db::DbPool,
    entities::{order, order_item, order_status_history, restaurant},
    errors::ServiceError,
    events::{
        outbox::{self, ORDER_PLACED},
        Event, EventSender,
    },
    metrics::ORDERS_PLACED,
    models::order_status::{ActorType, OrderStatus, PaymentMethod, PaymentStatus, ServiceType},
    models::pricing::{OrderTotals, PricedLine},
    notifications::OrderUpdate,
    services::pricing::{price_items, OrderItemInput},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Customer order as submitted through the public API.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PlaceOrderRequest {
    #[validate(length(min = 1, max = 120, message = "Customer name is required"))]
    pub customer_name: String,
    #[validate(length(min = 5, max = 32, message = "Phone must be between 5 and 32 characters"))]
    pub customer_phone: String,
    pub service_type: ServiceType,
    pub payment_method: PaymentMethod,
    #[validate(length(max = 500))]
    pub delivery_address: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "An order needs at least one item"))]
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Clone)]
pub struct PlaceOrderCommand {
    pub restaurant: restaurant::Model,
    pub request: PlaceOrderRequest,
}

#[async_trait::async_trait]
impl Command for PlaceOrderCommand {
    type Result = order::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(restaurant_id = %self.restaurant.id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.request.validate()?;
        self.validate_items()?;
        let address = self.delivery_address()?;

        if !self.restaurant.is_active {
            return Err(ServiceError::NotFound(format!(
                "Restaurant {} not found",
                self.restaurant.slug
            )));
        }

        let placed = self.insert(db_pool.as_ref(), address).await.map_err(|e| match e {
            ServiceError::DatabaseError(db_err) if is_unique_violation(&db_err) => {
                ServiceError::Conflict("Order number already taken, please retry".to_string())
            }
            other => other,
        })?;

        event_sender.send_or_log(Event::OrderPlaced {
            order_id: placed.id,
            restaurant_id: placed.restaurant_id,
            order_number: placed.order_number.clone(),
        });
        ORDERS_PLACED.inc();

        info!(
            order_id = %placed.id,
            order_number = %placed.order_number,
            total = %placed.total,
            "Order placed"
        );
        Ok(placed)
    }
}

impl PlaceOrderCommand {
    /// Item errors are keyed as `items[i].field`.
    fn validate_items(&self) -> Result<(), ServiceError> {
        let mut fields = BTreeMap::new();
        for (index, item) in self.request.items.iter().enumerate() {
            if let Err(errors) = item.validate() {
                if let ServiceError::ValidationFailed(item_fields) = ServiceError::from(errors) {
                    for (field, messages) in item_fields {
                        fields.insert(format!("items[{}].{}", index, field), messages);
                    }
                }
            }
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::ValidationFailed(fields))
        }
    }

    /// Delivery orders need somewhere to go; pickup orders drop any address.
    fn delivery_address(&self) -> Result<Option<String>, ServiceError> {
        let address = self
            .request
            .delivery_address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty());
        match (self.request.service_type, address) {
            (ServiceType::Delivery, None) => Err(ServiceError::field(
                "delivery_address",
                "A delivery address is required for delivery orders",
            )),
            (ServiceType::Delivery, Some(address)) => Ok(Some(address.to_string())),
            (ServiceType::Pickup, _) => Ok(None),
        }
    }

    async fn insert(
        &self,
        db: &DbPool,
        delivery_address: Option<String>,
    ) -> Result<order::Model, ServiceError> {
        let now = Utc::now();
        let txn = db.begin().await?;

        let priced = price_items(&txn, &self.restaurant, &self.request.items, now).await?;
        let lines: Vec<PricedLine> = priced.iter().map(|p| p.line()).collect();
        let delivery_fee = match self.request.service_type {
            ServiceType::Delivery => self.restaurant.delivery_fee,
            ServiceType::Pickup => Decimal::ZERO,
        };
        let totals = OrderTotals::compute(&lines, delivery_fee);

        let prefix = format!("{}-", self.restaurant.order_prefix);
        let last = order::Entity::find()
            .filter(order::Column::RestaurantId.eq(self.restaurant.id))
            .filter(order::Column::OrderNumber.starts_with(&prefix))
            .order_by_desc(order::Column::OrderNumber)
            .one(&txn)
            .await?;
        let order_number = next_order_number(
            &self.restaurant.order_prefix,
            last.as_ref().map(|o| o.order_number.as_str()),
        );

        let order_id = Uuid::new_v4();
        let placed = order::ActiveModel {
            id: Set(order_id),
            restaurant_id: Set(self.restaurant.id),
            order_number: Set(order_number),
            status: Set(OrderStatus::Pending),
            service_type: Set(self.request.service_type),
            payment_status: Set(PaymentStatus::Pending),
            payment_method: Set(self.request.payment_method),
            customer_name: Set(self.request.customer_name.trim().to_string()),
            customer_phone: Set(self.request.customer_phone.trim().to_string()),
            delivery_address: Set(delivery_address),
            subtotal: Set(totals.subtotal),
            delivery_fee: Set(totals.delivery_fee),
            discount: Set(totals.discount),
            total: Set(totals.total),
            notes: Set(self.request.notes.clone()),
            driver_id: Set(None),
            cancellation_reason: Set(None),
            accepted_at: Set(None),
            preparing_at: Set(None),
            ready_at: Set(None),
            assigned_to_driver_at: Set(None),
            picked_up_at: Set(None),
            delivered_at: Set(None),
            completed_at: Set(None),
            cancelled_at: Set(None),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for (item, line) in priced.iter().zip(&lines) {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                variant_id: Set(item.variant_id),
                combo_id: Set(item.combo_id),
                promotion_id: Set(item.promotion_id),
                name: Set(item.name.clone()),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                total_price: Set(line.total_price()),
                selected_options: Set(serde_json::to_value(&item.sections)?),
                notes: Set(item.notes.clone()),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            from_status: Set(None),
            status: Set(OrderStatus::Pending),
            changed_by_type: Set(ActorType::Customer),
            changed_by_id: Set(None),
            notes: Set(None),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        outbox::enqueue(
            &txn,
            &OrderUpdate {
                event_type: ORDER_PLACED.to_string(),
                order_id,
                restaurant_id: placed.restaurant_id,
                order_number: placed.order_number.clone(),
                status: placed.status,
                previous_status: None,
                action: None,
                driver_id: None,
                version: placed.version,
                occurred_at: now,
            },
        )
        .await?;

        txn.commit().await?;
        Ok(placed)
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// `PREFIX-00001` for the first order, otherwise one past the highest number
/// issued under the current prefix.
fn next_order_number(prefix: &str, last: Option<&str>) -> String {
    let sequence = last
        .and_then(|number| number.rsplit_once('-'))
        .and_then(|(_, digits)| digits.parse::<u32>().ok())
        .unwrap_or(0)
        + 1;
    format!("{}-{:05}", prefix, sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_follow_the_highest_issued() {
        assert_eq!(next_order_number("PZ", None), "PZ-00001");
        assert_eq!(next_order_number("PZ", Some("PZ-00041")), "PZ-00042");
        // Gaps left by removed orders are not reused.
        assert_eq!(next_order_number("PZ", Some("PZ-00100")), "PZ-00101");
        assert_eq!(next_order_number("PZ", Some("PZ-99999")), "PZ-100000");
    }
}
