use crate::{
    commands::Command,
    db::DbPool,
    entities::{driver, order, order_status_history},
    errors::ServiceError,
    events::{
        outbox::{self, ORDER_STATUS_CHANGED},
        Event, EventSender,
    },
    metrics::{ORDER_TRANSITIONS, ORDER_TRANSITION_FAILURES},
    models::order_status::{
        transition, Actor, ActorType, Milestone, OrderAction, Transition,
    },
    notifications::OrderUpdate,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::failure_reason;

/// Applies one workflow action to an order.
#[derive(Debug, Clone)]
pub struct TransitionOrderCommand {
    pub order_id: Uuid,
    pub restaurant_id: Uuid,
    pub action: OrderAction,
    pub actor: Actor,
    /// When set, the order must still be at this version.
    pub expected_version: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransitionOrderResult {
    pub order: order::Model,
    pub transition: Transition,
}

#[async_trait::async_trait]
impl Command for TransitionOrderCommand {
    type Result = TransitionOrderResult;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id, action = self.action.name()))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let result = match self.apply(db_pool.as_ref()).await {
            Ok(result) => result,
            Err(e) => {
                ORDER_TRANSITION_FAILURES
                    .with_label_values(&[failure_reason(&e)])
                    .inc();
                warn!("Order transition rejected: {}", e);
                return Err(e);
            }
        };

        self.publish_events(&event_sender, &result);
        ORDER_TRANSITIONS
            .with_label_values(&[self.action.name()])
            .inc();

        info!(
            order_id = %result.order.id,
            from = %result.transition.from,
            to = %result.transition.to,
            version = result.order.version,
            "Order transitioned"
        );
        Ok(result)
    }
}

impl TransitionOrderCommand {
    async fn apply(&self, db: &DbPool) -> Result<TransitionOrderResult, ServiceError> {
        let txn = db.begin().await?;

        let current = order::Entity::find_by_id(self.order_id)
            .filter(order::Column::RestaurantId.eq(self.restaurant_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", self.order_id)))?;

        if let Some(expected) = self.expected_version {
            if expected != current.version {
                return Err(ServiceError::ConcurrentModification(current.id));
            }
        }

        let mut planned = transition(&current.snapshot(), &self.action)?;
        self.check_actor(&current)?;

        if let OrderAction::AssignDriver { driver_id } = &self.action {
            let driver = self.load_assignable_driver(&txn, *driver_id).await?;
            planned.driver_id = Some(driver.id);
        }

        let now = Utc::now();
        let rows = order::Entity::update_many()
            .set(self.changes(&current, &planned, now))
            .filter(order::Column::Id.eq(current.id))
            .filter(order::Column::Version.eq(current.version))
            .exec(&txn)
            .await?
            .rows_affected;
        if rows == 0 {
            return Err(ServiceError::ConcurrentModification(current.id));
        }

        order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(current.id),
            from_status: Set(Some(planned.from)),
            status: Set(planned.to),
            changed_by_type: Set(self.actor.kind),
            changed_by_id: Set(self.actor.id),
            notes: Set(self
                .notes
                .clone()
                .or_else(|| planned.cancellation_reason.clone())),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        self.adjust_driver(&txn, &planned, now).await?;

        let updated = order::Entity::find_by_id(current.id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", current.id)))?;

        outbox::enqueue(
            &txn,
            &OrderUpdate {
                event_type: ORDER_STATUS_CHANGED.to_string(),
                order_id: updated.id,
                restaurant_id: updated.restaurant_id,
                order_number: updated.order_number.clone(),
                status: updated.status,
                previous_status: Some(planned.from),
                action: Some(self.action.name().to_string()),
                driver_id: updated.driver_id,
                version: updated.version,
                occurred_at: now,
            },
        )
        .await?;

        txn.commit().await?;

        Ok(TransitionOrderResult {
            order: updated,
            transition: planned,
        })
    }

    /// Drivers may only move orders assigned to them.
    fn check_actor(&self, current: &order::Model) -> Result<(), ServiceError> {
        if self.actor.kind != ActorType::Driver {
            return Ok(());
        }
        let driver_action = matches!(self.action, OrderAction::PickUp | OrderAction::MarkDelivered);
        if driver_action && self.actor.id.is_some() && self.actor.id == current.driver_id {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "This order is not assigned to you".to_string(),
            ))
        }
    }

    async fn load_assignable_driver(
        &self,
        txn: &DatabaseTransaction,
        driver_id: Uuid,
    ) -> Result<driver::Model, ServiceError> {
        let driver = driver::Entity::find_by_id(driver_id)
            .filter(driver::Column::RestaurantId.eq(self.restaurant_id))
            .one(txn)
            .await?
            .ok_or_else(|| ServiceError::field("driver_id", "Driver not found"))?;

        if !driver.can_take_orders() {
            return Err(ServiceError::field(
                "driver_id",
                "Driver is not active and available",
            ));
        }
        Ok(driver)
    }

    fn changes(
        &self,
        current: &order::Model,
        planned: &Transition,
        now: DateTime<Utc>,
    ) -> order::ActiveModel {
        let mut changes = order::ActiveModel {
            status: Set(planned.to),
            driver_id: Set(planned.driver_id),
            version: Set(current.version + 1),
            updated_at: Set(now),
            ..Default::default()
        };
        if let Some(reason) = &planned.cancellation_reason {
            changes.cancellation_reason = Set(Some(reason.clone()));
        }
        for milestone in planned.milestones {
            let stamp = Set(Some(now));
            match milestone {
                Milestone::Accepted => changes.accepted_at = stamp,
                Milestone::Preparing => changes.preparing_at = stamp,
                Milestone::Ready => changes.ready_at = stamp,
                Milestone::AssignedToDriver => changes.assigned_to_driver_at = stamp,
                Milestone::PickedUp => changes.picked_up_at = stamp,
                Milestone::Delivered => changes.delivered_at = stamp,
                Milestone::Completed => changes.completed_at = stamp,
                Milestone::Cancelled => changes.cancelled_at = stamp,
            }
        }
        changes
    }

    /// Assignment takes the driver off the available pool; delivery returns them.
    async fn adjust_driver(
        &self,
        txn: &DatabaseTransaction,
        planned: &Transition,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let available = match self.action {
            OrderAction::AssignDriver { .. } => false,
            OrderAction::MarkDelivered => true,
            _ => return Ok(()),
        };
        let Some(driver_id) = planned.driver_id else {
            return Ok(());
        };

        let mut update = driver::Entity::update_many()
            .set(driver::ActiveModel {
                is_available: Set(available),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(driver::Column::Id.eq(driver_id));
        if !available {
            // Claim the driver only if nobody else took them since the read.
            update = update
                .filter(driver::Column::IsActive.eq(true))
                .filter(driver::Column::IsAvailable.eq(true));
        }
        let rows = update.exec(txn).await?.rows_affected;
        if rows == 0 && !available {
            return Err(ServiceError::field(
                "driver_id",
                "Driver is not active and available",
            ));
        }
        Ok(())
    }

    fn publish_events(&self, event_sender: &EventSender, result: &TransitionOrderResult) {
        event_sender.send_or_log(Event::OrderStatusChanged {
            order_id: result.order.id,
            restaurant_id: result.order.restaurant_id,
            from: result.transition.from,
            to: result.transition.to,
            action: self.action.name().to_string(),
        });

        if let (OrderAction::AssignDriver { .. }, Some(driver_id)) =
            (&self.action, result.order.driver_id)
        {
            event_sender.send_or_log(Event::DriverAssigned {
                order_id: result.order.id,
                driver_id,
            });
        }
    }
}
