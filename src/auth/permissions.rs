/*!
 * # Permissions Module
 *
 * Permission strings granted to each role. Routes require one of these via
 * `AuthRouterExt::with_permission`; admins pass every permission check.
 */

use super::Role;

/// Permission string constants
pub mod consts {
    // Orders
    pub const ORDERS_READ: &str = "orders:read";
    pub const ORDERS_UPDATE: &str = "orders:update";
    pub const ORDERS_CANCEL: &str = "orders:cancel";

    // Catalog
    pub const MENU_MANAGE: &str = "menu:manage";

    // Drivers
    pub const DRIVERS_MANAGE: &str = "drivers:manage";
    pub const DELIVERIES_UPDATE: &str = "deliveries:update";

    // Restaurants
    pub const RESTAURANTS_MANAGE: &str = "restaurants:manage";
}

pub fn permissions_for_role(role: Role) -> Vec<String> {
    let granted: &[&str] = match role {
        Role::Admin => &[
            consts::ORDERS_READ,
            consts::ORDERS_UPDATE,
            consts::ORDERS_CANCEL,
            consts::MENU_MANAGE,
            consts::DRIVERS_MANAGE,
            consts::RESTAURANTS_MANAGE,
        ],
        Role::Staff => &[
            consts::ORDERS_READ,
            consts::ORDERS_UPDATE,
            consts::ORDERS_CANCEL,
            consts::MENU_MANAGE,
            consts::DRIVERS_MANAGE,
        ],
        Role::Driver => &[consts::DELIVERIES_UPDATE],
    };
    granted.iter().map(|p| p.to_string()).collect()
}
