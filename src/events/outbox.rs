//! Transactional outbox for live order updates.
//!
//! Rows are written in the same transaction as the order change they
//! describe, so a rolled-back transition never reaches a subscriber.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::entities::outbox_event::{self, OutboxStatus};
use crate::errors::ServiceError;
use crate::metrics::OUTBOX_PUBLISHED;
use crate::notifications::{OrderUpdate, OrderUpdateHub};

pub const MAX_ATTEMPTS: i32 = 5;

pub const ORDER_AGGREGATE: &str = "order";
pub const ORDER_PLACED: &str = "order.placed";
pub const ORDER_STATUS_CHANGED: &str = "order.status_changed";
pub const ORDER_UPDATED: &str = "order.updated";

/// Enqueue an order update into the outbox. Call inside the transaction
/// that performs the write.
pub async fn enqueue<C: ConnectionTrait>(db: &C, update: &OrderUpdate) -> Result<Uuid, ServiceError> {
    let now = Utc::now();
    let id = Uuid::new_v4();
    outbox_event::ActiveModel {
        id: Set(id),
        aggregate_type: Set(ORDER_AGGREGATE.to_string()),
        aggregate_id: Set(update.order_id),
        event_type: Set(update.event_type.clone()),
        payload: Set(serde_json::to_value(update)?),
        status: Set(OutboxStatus::Pending),
        attempts: Set(0),
        last_error: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    debug!(outbox_id = %id, event_type = %update.event_type, order_id = %update.order_id, "enqueued outbox event");
    Ok(id)
}

/// How often the worker prunes delivered rows.
const PRUNE_EVERY: Duration = Duration::from_secs(600);

/// Background worker that publishes pending rows to the hub and prunes
/// delivered rows older than `retention` (zero disables pruning).
pub fn start_worker(
    db: Arc<DatabaseConnection>,
    hub: OrderUpdateHub,
    poll_interval: Duration,
    batch_size: u64,
    retention: Duration,
) -> JoinHandle<()> {
    info!(?poll_interval, batch_size, ?retention, "Starting outbox worker");
    tokio::spawn(async move {
        let mut last_prune: Option<Instant> = None;
        loop {
            if let Err(e) = drain_once(&db, &hub, batch_size).await {
                error!("outbox worker error: {}", e);
            }
            let prune_due = last_prune.map_or(true, |at| at.elapsed() >= PRUNE_EVERY);
            if !retention.is_zero() && prune_due {
                last_prune = Some(Instant::now());
                match prune_delivered(&db, retention).await {
                    Ok(0) => {}
                    Ok(removed) => info!(removed, "Pruned delivered outbox events"),
                    Err(e) => error!("outbox prune error: {}", e),
                }
            }
            sleep(poll_interval).await;
        }
    })
}

/// Deletes delivered rows last touched more than `retention` ago. Pending
/// and failed rows are kept.
pub async fn prune_delivered(
    db: &DatabaseConnection,
    retention: Duration,
) -> Result<u64, ServiceError> {
    let retention = chrono::Duration::from_std(retention)
        .map_err(|e| ServiceError::InternalError(format!("invalid outbox retention: {}", e)))?;
    let cutoff = Utc::now() - retention;
    let result = outbox_event::Entity::delete_many()
        .filter(outbox_event::Column::Status.eq(OutboxStatus::Delivered))
        .filter(outbox_event::Column::UpdatedAt.lt(cutoff))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Publishes up to `batch_size` pending rows, oldest first. Returns the
/// number of rows marked delivered.
pub async fn drain_once(
    db: &DatabaseConnection,
    hub: &OrderUpdateHub,
    batch_size: u64,
) -> Result<usize, ServiceError> {
    let rows = outbox_event::Entity::find()
        .filter(outbox_event::Column::Status.eq(OutboxStatus::Pending))
        .order_by_asc(outbox_event::Column::CreatedAt)
        .limit(batch_size)
        .all(db)
        .await?;

    let mut delivered = 0;
    for row in rows {
        let id = row.id;
        let attempts = row.attempts + 1;
        let decoded = serde_json::from_value::<OrderUpdate>(row.payload.clone());

        let mut active: outbox_event::ActiveModel = row.into();
        active.attempts = Set(attempts);
        active.updated_at = Set(Utc::now());

        match decoded {
            Ok(update) => {
                let receivers = hub.publish(update);
                OUTBOX_PUBLISHED.inc();
                debug!(outbox_id = %id, receivers, "published outbox event");
                active.status = Set(OutboxStatus::Delivered);
                active.last_error = Set(None);
                delivered += 1;
            }
            Err(e) => {
                let status = if attempts >= MAX_ATTEMPTS {
                    OutboxStatus::Failed
                } else {
                    OutboxStatus::Pending
                };
                warn!(outbox_id = %id, attempts, "undecodable outbox payload: {}", e);
                active.status = Set(status);
                active.last_error = Set(Some(e.to_string()));
            }
        }

        if let Err(e) = active.update(db).await {
            warn!("failed updating outbox {}: {}", id, e);
        }
    }

    Ok(delivered)
}
