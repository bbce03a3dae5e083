pub mod common;
pub mod drivers;
pub mod menu;
pub mod orders;
pub mod promotions;
pub mod public_api;
pub mod restaurants;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::notifications::PrintService;
use crate::services::{
    catalog::CatalogService, drivers::DriverService, menu::MenuService, orders::OrderService,
    promotions::PromotionService, reorder::ReorderService, restaurants::RestaurantService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub drivers: Arc<DriverService>,
    pub menu: Arc<MenuService>,
    pub promotions: Arc<PromotionService>,
    pub reorder: Arc<ReorderService>,
    pub restaurants: Arc<RestaurantService>,
    pub catalog: Arc<CatalogService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        printer: Arc<dyn PrintService>,
    ) -> Self {
        Self {
            orders: Arc::new(OrderService::new(
                db_pool.clone(),
                event_sender.clone(),
                printer,
            )),
            drivers: Arc::new(DriverService::new(db_pool.clone())),
            menu: Arc::new(MenuService::new(db_pool.clone())),
            promotions: Arc::new(PromotionService::new(db_pool.clone())),
            reorder: Arc::new(ReorderService::new(db_pool.clone(), event_sender)),
            restaurants: Arc::new(RestaurantService::new(db_pool.clone())),
            catalog: Arc::new(CatalogService::new(db_pool)),
        }
    }
}
