pub mod place_order_command;
pub mod transition_order_command;
pub mod update_payment_status_command;

pub use place_order_command::{PlaceOrderCommand, PlaceOrderRequest};
pub use transition_order_command::{TransitionOrderCommand, TransitionOrderResult};
pub use update_payment_status_command::UpdatePaymentStatusCommand;

use crate::errors::ServiceError;

/// Label used for `order_transition_failures_total`.
pub(crate) fn failure_reason(err: &ServiceError) -> &'static str {
    match err {
        ServiceError::InvalidTransition(_) => "invalid_transition",
        ServiceError::ConcurrentModification(_) => "concurrent_modification",
        ServiceError::NotFound(_) => "not_found",
        ServiceError::ValidationError(_) | ServiceError::ValidationFailed(_) => "validation",
        ServiceError::Forbidden(_) => "forbidden",
        ServiceError::DatabaseError(_) => "database",
        _ => "other",
    }
}
