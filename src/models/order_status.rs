//! Order workflow state machine.
//!
//! Every status change an order can go through is decided here by
//! [`transition`]. Handlers, commands and the UI flags returned by
//! [`allowed_actions`] all derive from the same table, so a transition that
//! is not listed cannot be applied through any entry point.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "preparing")]
    Preparing,
    #[sea_orm(string_value = "ready")]
    Ready,
    #[sea_orm(string_value = "out_for_delivery")]
    OutForDelivery,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Statuses in which a driver may still be holding the order.
    pub fn is_driver_active(self) -> bool {
        matches!(self, OrderStatus::Ready | OrderStatus::OutForDelivery)
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ServiceType {
    #[sea_orm(string_value = "pickup")]
    Pickup,
    #[sea_orm(string_value = "delivery")]
    Delivery,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "refunded")]
    Refunded,
    #[sea_orm(string_value = "failed")]
    Failed,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "card")]
    Card,
    #[sea_orm(string_value = "transfer")]
    Transfer,
    #[sea_orm(string_value = "online")]
    Online,
}

/// Who caused a status change.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActorType {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "customer")]
    Customer,
    #[sea_orm(string_value = "driver")]
    Driver,
    #[sea_orm(string_value = "system")]
    System,
}

/// An actor together with its identifier, when it has one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    pub kind: ActorType,
    pub id: Option<Uuid>,
}

impl Actor {
    pub fn user(id: Uuid) -> Self {
        Self {
            kind: ActorType::User,
            id: Some(id),
        }
    }

    pub fn driver(id: Uuid) -> Self {
        Self {
            kind: ActorType::Driver,
            id: Some(id),
        }
    }

    pub fn customer() -> Self {
        Self {
            kind: ActorType::Customer,
            id: None,
        }
    }

    pub fn system() -> Self {
        Self {
            kind: ActorType::System,
            id: None,
        }
    }
}

/// Requested change on an order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderAction {
    Accept { start_preparing: bool },
    StartPreparing,
    MarkReady,
    AssignDriver { driver_id: Uuid },
    PickUp,
    MarkDelivered,
    Complete,
    Cancel { reason: String },
}

impl OrderAction {
    pub fn name(&self) -> &'static str {
        match self {
            OrderAction::Accept { .. } => "accept",
            OrderAction::StartPreparing => "start_preparing",
            OrderAction::MarkReady => "mark_ready",
            OrderAction::AssignDriver { .. } => "assign_driver",
            OrderAction::PickUp => "pick_up",
            OrderAction::MarkDelivered => "mark_delivered",
            OrderAction::Complete => "complete",
            OrderAction::Cancel { .. } => "cancel",
        }
    }
}

/// Timestamp columns a transition stamps with the current time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Milestone {
    Accepted,
    Preparing,
    Ready,
    AssignedToDriver,
    PickedUp,
    Delivered,
    Completed,
    Cancelled,
}

/// The part of an order the state machine looks at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderSnapshot {
    pub status: OrderStatus,
    pub service_type: ServiceType,
    pub driver_id: Option<Uuid>,
}

/// Outcome of a permitted action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub driver_id: Option<Uuid>,
    pub milestones: &'static [Milestone],
    pub cancellation_reason: Option<String>,
}

impl Transition {
    pub fn changes_status(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {action} an order in status {status}")]
    NotAllowedFrom {
        action: &'static str,
        status: OrderStatus,
    },
    #[error("cannot {action} a {service_type} order")]
    WrongServiceType {
        action: &'static str,
        service_type: ServiceType,
    },
    #[error("a driver is already assigned to this order")]
    DriverAlreadyAssigned,
    #[error("no driver is assigned to this order")]
    NoDriverAssigned,
    #[error("a cancellation reason is required")]
    ReasonRequired,
}

/// Applies `action` to `order` and returns the resulting transition.
///
/// The function is pure; persisting the result is the caller's job.
pub fn transition(
    order: &OrderSnapshot,
    action: &OrderAction,
) -> Result<Transition, TransitionError> {
    use OrderStatus::*;

    let from = order.status;
    let name = action.name();
    let not_allowed = || TransitionError::NotAllowedFrom {
        action: name,
        status: from,
    };
    let require_delivery = || {
        if order.service_type == ServiceType::Delivery {
            Ok(())
        } else {
            Err(TransitionError::WrongServiceType {
                action: name,
                service_type: order.service_type,
            })
        }
    };
    let to = |to: OrderStatus, milestones: &'static [Milestone]| Transition {
        from,
        to,
        driver_id: order.driver_id,
        milestones,
        cancellation_reason: None,
    };

    match (action, from) {
        (OrderAction::Accept { start_preparing }, Pending) => Ok(if *start_preparing {
            to(Preparing, &[Milestone::Accepted, Milestone::Preparing])
        } else {
            to(Confirmed, &[Milestone::Accepted])
        }),
        (OrderAction::StartPreparing, Confirmed) => Ok(to(Preparing, &[Milestone::Preparing])),
        (OrderAction::MarkReady, Preparing) => Ok(to(Ready, &[Milestone::Ready])),
        (OrderAction::AssignDriver { driver_id }, status) => {
            require_delivery()?;
            if status != Ready {
                return Err(not_allowed());
            }
            if order.driver_id.is_some() {
                return Err(TransitionError::DriverAlreadyAssigned);
            }
            Ok(Transition {
                driver_id: Some(*driver_id),
                ..to(Ready, &[Milestone::AssignedToDriver])
            })
        }
        (OrderAction::PickUp, status) => {
            require_delivery()?;
            if status != Ready {
                return Err(not_allowed());
            }
            if order.driver_id.is_none() {
                return Err(TransitionError::NoDriverAssigned);
            }
            Ok(to(OutForDelivery, &[Milestone::PickedUp]))
        }
        (OrderAction::MarkDelivered, status) => {
            require_delivery()?;
            if status != OutForDelivery {
                return Err(not_allowed());
            }
            Ok(to(Delivered, &[Milestone::Delivered]))
        }
        (OrderAction::Complete, status) => match (order.service_type, status) {
            (ServiceType::Pickup, Ready) | (ServiceType::Delivery, Delivered) => {
                Ok(to(Completed, &[Milestone::Completed]))
            }
            _ => Err(not_allowed()),
        },
        (OrderAction::Cancel { reason }, Pending | Confirmed) => {
            let reason = reason.trim();
            if reason.is_empty() {
                return Err(TransitionError::ReasonRequired);
            }
            Ok(Transition {
                cancellation_reason: Some(reason.to_string()),
                ..to(Cancelled, &[Milestone::Cancelled])
            })
        }
        _ => Err(not_allowed()),
    }
}

/// UI flags for an order, derived from [`transition`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AvailableActions {
    pub can_accept: bool,
    pub can_start_preparing: bool,
    pub can_mark_ready: bool,
    pub can_assign_driver: bool,
    pub can_pick_up: bool,
    pub can_mark_delivered: bool,
    pub can_complete: bool,
    pub can_cancel: bool,
}

pub fn allowed_actions(order: &OrderSnapshot) -> AvailableActions {
    let ok = |action: OrderAction| transition(order, &action).is_ok();
    AvailableActions {
        can_accept: ok(OrderAction::Accept {
            start_preparing: false,
        }),
        can_start_preparing: ok(OrderAction::StartPreparing),
        can_mark_ready: ok(OrderAction::MarkReady),
        can_assign_driver: ok(OrderAction::AssignDriver {
            driver_id: Uuid::nil(),
        }),
        can_pick_up: ok(OrderAction::PickUp),
        can_mark_delivered: ok(OrderAction::MarkDelivered),
        can_complete: ok(OrderAction::Complete),
        can_cancel: ok(OrderAction::Cancel {
            reason: "-".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    fn snapshot(status: OrderStatus, service_type: ServiceType) -> OrderSnapshot {
        OrderSnapshot {
            status,
            service_type,
            driver_id: None,
        }
    }

    #[rstest]
    #[case(OrderStatus::Pending)]
    #[case(OrderStatus::Confirmed)]
    #[case(OrderStatus::Ready)]
    #[case(OrderStatus::Completed)]
    #[case(OrderStatus::Cancelled)]
    fn mark_ready_requires_preparing(#[case] status: OrderStatus) {
        let order = snapshot(status, ServiceType::Pickup);
        assert_matches!(
            transition(&order, &OrderAction::MarkReady),
            Err(TransitionError::NotAllowedFrom { action: "mark_ready", .. })
        );
    }

    #[test]
    fn accept_moves_pending_to_confirmed_or_preparing() {
        let order = snapshot(OrderStatus::Pending, ServiceType::Pickup);

        let confirmed = transition(
            &order,
            &OrderAction::Accept {
                start_preparing: false,
            },
        )
        .unwrap();
        assert_eq!(confirmed.to, OrderStatus::Confirmed);
        assert_eq!(confirmed.milestones, &[Milestone::Accepted]);

        let preparing = transition(
            &order,
            &OrderAction::Accept {
                start_preparing: true,
            },
        )
        .unwrap();
        assert_eq!(preparing.to, OrderStatus::Preparing);
        assert_eq!(
            preparing.milestones,
            &[Milestone::Accepted, Milestone::Preparing]
        );
    }

    #[test]
    fn pickup_completion_only_from_ready() {
        let preparing = snapshot(OrderStatus::Preparing, ServiceType::Pickup);
        assert!(transition(&preparing, &OrderAction::Complete).is_err());

        let ready = snapshot(OrderStatus::Ready, ServiceType::Pickup);
        let done = transition(&ready, &OrderAction::Complete).unwrap();
        assert_eq!(done.to, OrderStatus::Completed);
        assert_eq!(done.milestones, &[Milestone::Completed]);
    }

    #[test]
    fn delivery_completion_requires_delivered() {
        let ready = snapshot(OrderStatus::Ready, ServiceType::Delivery);
        assert!(transition(&ready, &OrderAction::Complete).is_err());

        let delivered = snapshot(OrderStatus::Delivered, ServiceType::Delivery);
        assert!(transition(&delivered, &OrderAction::Complete).is_ok());
    }

    #[test]
    fn assign_driver_guards() {
        let driver_id = Uuid::new_v4();
        let action = OrderAction::AssignDriver { driver_id };

        let pickup = snapshot(OrderStatus::Ready, ServiceType::Pickup);
        assert_matches!(
            transition(&pickup, &action),
            Err(TransitionError::WrongServiceType { .. })
        );

        let preparing = snapshot(OrderStatus::Preparing, ServiceType::Delivery);
        assert_matches!(
            transition(&preparing, &action),
            Err(TransitionError::NotAllowedFrom { .. })
        );

        let taken = OrderSnapshot {
            driver_id: Some(Uuid::new_v4()),
            ..snapshot(OrderStatus::Ready, ServiceType::Delivery)
        };
        assert_matches!(
            transition(&taken, &action),
            Err(TransitionError::DriverAlreadyAssigned)
        );

        let ready = snapshot(OrderStatus::Ready, ServiceType::Delivery);
        let assigned = transition(&ready, &action).unwrap();
        assert_eq!(assigned.to, OrderStatus::Ready);
        assert!(!assigned.changes_status());
        assert_eq!(assigned.driver_id, Some(driver_id));
    }

    #[test]
    fn delivery_path_runs_through_driver() {
        let mut order = OrderSnapshot {
            driver_id: Some(Uuid::new_v4()),
            ..snapshot(OrderStatus::Ready, ServiceType::Delivery)
        };

        let out = transition(&order, &OrderAction::PickUp).unwrap();
        assert_eq!(out.to, OrderStatus::OutForDelivery);
        order.status = out.to;

        assert!(transition(&order, &OrderAction::Complete).is_err());
        let delivered = transition(&order, &OrderAction::MarkDelivered).unwrap();
        assert_eq!(delivered.to, OrderStatus::Delivered);
    }

    #[test]
    fn pick_up_without_driver_is_rejected() {
        let order = snapshot(OrderStatus::Ready, ServiceType::Delivery);
        assert_matches!(
            transition(&order, &OrderAction::PickUp),
            Err(TransitionError::NoDriverAssigned)
        );
    }

    #[test]
    fn cancel_only_early_and_with_reason() {
        let pending = snapshot(OrderStatus::Pending, ServiceType::Delivery);
        assert_matches!(
            transition(
                &pending,
                &OrderAction::Cancel {
                    reason: "   ".into()
                }
            ),
            Err(TransitionError::ReasonRequired)
        );

        let cancelled = transition(
            &pending,
            &OrderAction::Cancel {
                reason: " customer called ".into(),
            },
        )
        .unwrap();
        assert_eq!(cancelled.to, OrderStatus::Cancelled);
        assert_eq!(
            cancelled.cancellation_reason.as_deref(),
            Some("customer called")
        );

        let preparing = snapshot(OrderStatus::Preparing, ServiceType::Delivery);
        assert!(transition(
            &preparing,
            &OrderAction::Cancel {
                reason: "late".into()
            }
        )
        .is_err());
    }

    #[test]
    fn available_actions_follow_the_table() {
        let pending = snapshot(OrderStatus::Pending, ServiceType::Pickup);
        let flags = allowed_actions(&pending);
        assert!(flags.can_accept);
        assert!(flags.can_cancel);
        assert!(!flags.can_mark_ready);
        assert!(!flags.can_complete);

        let ready_delivery = snapshot(OrderStatus::Ready, ServiceType::Delivery);
        let flags = allowed_actions(&ready_delivery);
        assert!(flags.can_assign_driver);
        assert!(!flags.can_complete);
        assert!(!flags.can_pick_up);

        let done = snapshot(OrderStatus::Completed, ServiceType::Pickup);
        assert_eq!(allowed_actions(&done), AvailableActions::default());
    }

    #[test]
    fn status_strings_match_wire_format() {
        assert_eq!(OrderStatus::OutForDelivery.to_string(), "out_for_delivery");
        assert_eq!(
            "out_for_delivery".parse::<OrderStatus>().unwrap(),
            OrderStatus::OutForDelivery
        );
        assert_eq!(
            serde_json::to_value(ServiceType::Delivery).unwrap(),
            serde_json::json!("delivery")
        );
    }
}
