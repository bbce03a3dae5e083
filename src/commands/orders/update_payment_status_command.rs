use crate::{
    commands::Command,
    db::DbPool,
    entities::order,
    errors::ServiceError,
    events::{
        outbox::{self, ORDER_UPDATED},
        Event, EventSender,
    },
    models::order_status::PaymentStatus,
    notifications::OrderUpdate,
};
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UpdatePaymentStatusCommand {
    pub order_id: Uuid,
    pub restaurant_id: Uuid,
    pub status: PaymentStatus,
    pub expected_version: Option<i32>,
}

#[async_trait::async_trait]
impl Command for UpdatePaymentStatusCommand {
    type Result = order::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id, status = %self.status))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        if self.status == PaymentStatus::Pending {
            return Err(ServiceError::field(
                "status",
                "Payment status can only be set to paid, refunded or failed",
            ));
        }

        let txn = db_pool.begin().await?;
        let current = order::Entity::find_by_id(self.order_id)
            .filter(order::Column::RestaurantId.eq(self.restaurant_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", self.order_id)))?;

        if self.expected_version.is_some_and(|v| v != current.version) {
            return Err(ServiceError::ConcurrentModification(current.id));
        }

        let now = Utc::now();
        let rows = order::Entity::update_many()
            .set(order::ActiveModel {
                payment_status: Set(self.status),
                version: Set(current.version + 1),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(order::Column::Id.eq(current.id))
            .filter(order::Column::Version.eq(current.version))
            .exec(&txn)
            .await?
            .rows_affected;
        if rows == 0 {
            return Err(ServiceError::ConcurrentModification(current.id));
        }

        let updated = order::Entity::find_by_id(current.id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", current.id)))?;

        outbox::enqueue(
            &txn,
            &OrderUpdate {
                event_type: ORDER_UPDATED.to_string(),
                order_id: updated.id,
                restaurant_id: updated.restaurant_id,
                order_number: updated.order_number.clone(),
                status: updated.status,
                previous_status: Some(current.status),
                action: Some("update_payment_status".to_string()),
                driver_id: updated.driver_id,
                version: updated.version,
                occurred_at: now,
            },
        )
        .await?;
        txn.commit().await?;

        event_sender.send_or_log(Event::PaymentStatusChanged {
            order_id: updated.id,
            status: updated.payment_status,
        });

        info!(order_id = %updated.id, from = %current.payment_status, "Payment status updated");
        Ok(updated)
    }
}
