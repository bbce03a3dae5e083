use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::trace;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::order_status::OrderStatus;

/// Message pushed to staff screens when an order changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderUpdate {
    pub event_type: String,
    pub order_id: Uuid,
    pub restaurant_id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub previous_status: Option<OrderStatus>,
    pub action: Option<String>,
    pub driver_id: Option<Uuid>,
    pub version: i32,
    pub occurred_at: DateTime<Utc>,
}

/// In-process fan-out of committed order updates to WebSocket sessions.
#[derive(Debug, Clone)]
pub struct OrderUpdateHub {
    sender: broadcast::Sender<OrderUpdate>,
}

impl OrderUpdateHub {
    /// The capacity bounds how many updates a slow subscriber may lag behind
    /// before older ones are dropped for it.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns how many subscribers received the update.
    pub fn publish(&self, update: OrderUpdate) -> usize {
        match self.sender.send(update) {
            Ok(receivers) => receivers,
            Err(_) => {
                trace!("order update dropped: no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderUpdate> {
        self.sender.subscribe()
    }

    /// Subscription that only yields one restaurant's updates.
    pub fn subscribe_restaurant(&self, restaurant_id: Uuid) -> RestaurantUpdates {
        RestaurantUpdates {
            restaurant_id,
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[derive(Debug)]
pub struct RestaurantUpdates {
    restaurant_id: Uuid,
    receiver: broadcast::Receiver<OrderUpdate>,
}

impl RestaurantUpdates {
    pub fn restaurant_id(&self) -> Uuid {
        self.restaurant_id
    }

    /// Waits for the next update of this restaurant, skipping the others.
    pub async fn recv(&mut self) -> Result<OrderUpdate, RecvError> {
        loop {
            let update = self.receiver.recv().await?;
            if update.restaurant_id == self.restaurant_id {
                return Ok(update);
            }
        }
    }

    pub fn try_recv(&mut self) -> Result<OrderUpdate, TryRecvError> {
        loop {
            let update = self.receiver.try_recv()?;
            if update.restaurant_id == self.restaurant_id {
                return Ok(update);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(restaurant_id: Uuid) -> OrderUpdate {
        OrderUpdate {
            event_type: "order.status_changed".into(),
            order_id: Uuid::new_v4(),
            restaurant_id,
            order_number: "SUB-00001".into(),
            status: OrderStatus::Confirmed,
            previous_status: Some(OrderStatus::Pending),
            action: Some("accept".into()),
            driver_id: None,
            version: 2,
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_published_updates() {
        let hub = OrderUpdateHub::new(8);
        let mut rx = hub.subscribe();
        let sent = update(Uuid::new_v4());

        assert_eq!(hub.publish(sent.clone()), 1);
        assert_eq!(rx.recv().await.unwrap(), sent);
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let hub = OrderUpdateHub::new(8);
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.publish(update(Uuid::new_v4())), 0);
    }

    #[tokio::test]
    async fn restaurant_subscriptions_skip_other_restaurants() {
        let hub = OrderUpdateHub::new(8);
        let ours = Uuid::new_v4();
        let mut rx = hub.subscribe_restaurant(ours);

        hub.publish(update(Uuid::new_v4()));
        let mine = update(ours);
        hub.publish(mine.clone());

        assert_eq!(rx.recv().await.unwrap(), mine);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }
}
