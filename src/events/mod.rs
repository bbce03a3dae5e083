use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait, ModelTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::entities::{order, order_item};
use crate::models::order_status::{OrderStatus, PaymentStatus};
use crate::notifications::{KitchenTicket, PrintService};

pub mod outbox;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Offers an event after a commit without waiting for capacity; a full or
    /// closed channel is logged, not returned.
    pub fn send_or_log(&self, event: Event) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(?event, "Event channel full, dropping event");
            }
            Err(TrySendError::Closed(event)) => {
                warn!(?event, "Event channel closed, dropping event");
            }
        }
    }
}

/// Domain events emitted after a successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    OrderPlaced {
        order_id: Uuid,
        restaurant_id: Uuid,
        order_number: String,
    },
    OrderStatusChanged {
        order_id: Uuid,
        restaurant_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        action: String,
    },
    DriverAssigned {
        order_id: Uuid,
        driver_id: Uuid,
    },
    PaymentStatusChanged {
        order_id: Uuid,
        status: PaymentStatus,
    },
    MenuReordered {
        restaurant_id: Uuid,
        scope: String,
        parent_id: Uuid,
        items: usize,
    },
}

impl Event {
    pub fn order_id(&self) -> Option<Uuid> {
        match self {
            Event::OrderPlaced { order_id, .. }
            | Event::OrderStatusChanged { order_id, .. }
            | Event::DriverAssigned { order_id, .. }
            | Event::PaymentStatusChanged { order_id, .. } => Some(*order_id),
            Event::MenuReordered { .. } => None,
        }
    }
}

// Handlers run sequentially for every event received by `process_events`.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: &Event) -> Result<(), String>;
}

/// Prints a kitchen ticket for every newly placed order.
pub struct AutoPrintHandler {
    db: Arc<DatabaseConnection>,
    printer: Arc<dyn PrintService>,
}

impl AutoPrintHandler {
    pub fn new(db: Arc<DatabaseConnection>, printer: Arc<dyn PrintService>) -> Self {
        Self { db, printer }
    }
}

#[async_trait]
impl EventHandler for AutoPrintHandler {
    async fn handle_event(&self, event: &Event) -> Result<(), String> {
        let Event::OrderPlaced { order_id, .. } = event else {
            return Ok(());
        };

        let order = order::Entity::find_by_id(*order_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("order {} not found", order_id))?;
        let items = order
            .find_related(order_item::Entity)
            .all(self.db.as_ref())
            .await
            .map_err(|e| e.to_string())?;

        self.printer
            .print(&KitchenTicket::new(&order, &items))
            .await
            .map_err(|e| e.to_string())
    }
}

// Function to process incoming events and distribute them to registered event handlers.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, handlers: Vec<Arc<dyn EventHandler>>) {
    info!(handlers = handlers.len(), "Starting event processing loop");

    while let Some(event) = rx.recv().await {
        debug!("Received event: {:?}", event);

        for handler in &handlers {
            if let Err(e) = handler.handle_event(&event).await {
                error!(
                    order_id = ?event.order_id(),
                    "Failed to handle event: {}",
                    e
                );
            }
        }
    }

    info!("Event channel closed; event processing loop stopped");
}
