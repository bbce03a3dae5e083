// Orders and fulfilment
pub mod drivers;
pub mod orders;

// Menu management
pub mod menu;
pub mod promotions;
pub mod reorder;

// Pricing shared by the public menu and order placement
pub mod pricing;

// Tenants and the customer-facing read model
pub mod catalog;
pub mod restaurants;
