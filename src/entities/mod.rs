pub mod restaurant;

// Orders
pub mod order;
pub mod order_item;
pub mod order_status_history;
pub mod outbox_event;

pub mod driver;

// Menu catalog
pub mod badge_type;
pub mod bundle_promotion_item;
pub mod category;
pub mod combo;
pub mod combo_item;
pub mod combo_item_option;
pub mod product;
pub mod product_badge;
pub mod product_section;
pub mod product_variant;
pub mod promotion;
pub mod promotion_item;
pub mod section;
pub mod section_option;
