//! Pure domain logic shared by commands, services and handlers.

pub mod order_status;
pub mod pricing;
pub mod promotion_validity;
pub mod sort_order;

pub use order_status::{
    allowed_actions, transition, Actor, ActorType, AvailableActions, OrderAction, OrderStatus,
    PaymentMethod, PaymentStatus, ServiceType, TransitionError,
};
pub use sort_order::{ReorderError, SortEntry};
