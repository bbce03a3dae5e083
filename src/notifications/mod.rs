pub mod hub;
pub mod printing;

pub use hub::{OrderUpdate, OrderUpdateHub, RestaurantUpdates};
pub use printing::{KitchenTicket, PrintError, PrintService, TracingPrintService};
