use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Restaurant Orders API",
        version = "1.0.0",
        description = r#"
# Restaurant Orders API

Back office for restaurants taking online orders: menu management, promotions,
the order board with its status workflow, and delivery drivers.

## Authentication

Staff and driver endpoints take a JWT issued for one restaurant:

```
Authorization: Bearer <token>
```

The WebSocket feed at `/restaurant/orders/ws` also accepts `?token=<token>`.

## Concurrency

State-changing order endpoints accept an optional `expected_version`. When the
order has moved on in the meantime the request fails with `409 Conflict`.

## Errors

```json
{
  "error": "Conflict",
  "message": "Cannot accept an order that is ready",
  "request_id": "5f0c...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers((url = "http://localhost:8080", description = "Local development")),
    modifiers(&SecurityAddon),
    tags(
        (name = "orders", description = "Order board and status workflow"),
        (name = "menu", description = "Categories, products, sections, combos and badges"),
        (name = "promotions", description = "Discounts and bundles"),
        (name = "drivers", description = "Driver roster"),
        (name = "driver", description = "Endpoints used by drivers"),
        (name = "restaurants", description = "Restaurant administration"),
        (name = "public", description = "Customer-facing menu and ordering")
    ),
    paths(
        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::order_history,
        crate::handlers::orders::accept_order,
        crate::handlers::orders::start_preparing,
        crate::handlers::orders::mark_ready,
        crate::handlers::orders::assign_driver,
        crate::handlers::orders::complete_order,
        crate::handlers::orders::mark_delivered,
        crate::handlers::orders::cancel_order,
        crate::handlers::orders::print_order,
        crate::handlers::orders::update_payment_status,
        crate::handlers::orders::order_updates_ws,

        // Menu
        crate::handlers::menu::list_categories,
        crate::handlers::menu::list_products,
        crate::handlers::menu::create_product,
        crate::handlers::menu::delete_section,
        crate::handlers::menu::create_combo,
        crate::handlers::menu::reorder,

        // Promotions
        crate::handlers::promotions::list_promotions,
        crate::handlers::promotions::get_promotion,
        crate::handlers::promotions::create_promotion,
        crate::handlers::promotions::update_promotion,
        crate::handlers::promotions::toggle_promotion,
        crate::handlers::promotions::delete_promotion,

        // Drivers
        crate::handlers::drivers::list_drivers,
        crate::handlers::drivers::create_driver,
        crate::handlers::drivers::get_driver,
        crate::handlers::drivers::update_driver,
        crate::handlers::drivers::toggle_active,
        crate::handlers::drivers::toggle_available,
        crate::handlers::drivers::delete_driver,
        crate::handlers::drivers::check_in,
        crate::handlers::drivers::update_location,
        crate::handlers::drivers::my_orders,
        crate::handlers::drivers::pick_up,
        crate::handlers::drivers::delivered,

        // Restaurants
        crate::handlers::restaurants::list_restaurants,
        crate::handlers::restaurants::create_restaurant,
        crate::handlers::restaurants::get_restaurant,
        crate::handlers::restaurants::update_restaurant,
        crate::handlers::restaurants::my_restaurant,

        // Public
        crate::handlers::public_api::get_restaurant,
        crate::handlers::public_api::active_promotions,
        crate::handlers::public_api::get_menu,
        crate::handlers::public_api::get_product,
        crate::handlers::public_api::get_combo,
        crate::handlers::public_api::place_order,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::handlers::common::PaginationMeta,
            crate::handlers::common::VersionGuard,
            crate::errors::ErrorResponse,

            // Orders
            crate::models::order_status::OrderStatus,
            crate::models::order_status::ServiceType,
            crate::models::order_status::PaymentStatus,
            crate::models::order_status::PaymentMethod,
            crate::models::order_status::ActorType,
            crate::models::order_status::AvailableActions,
            crate::services::orders::OrderResponse,
            crate::services::orders::OrderItemResponse,
            crate::services::orders::StatusHistoryEntry,
            crate::entities::order_item::SelectedSection,
            crate::entities::order_item::SelectedOption,
            crate::services::pricing::OrderItemInput,
            crate::commands::orders::PlaceOrderRequest,
            crate::handlers::orders::AcceptOrderRequest,
            crate::handlers::orders::AssignDriverRequest,
            crate::handlers::orders::CancelOrderRequest,
            crate::handlers::orders::PaymentStatusRequest,
            crate::handlers::orders::PrintedTicket,
            crate::notifications::OrderUpdate,

            // Menu
            crate::services::menu::CategoryRequest,
            crate::services::menu::CreateProductRequest,
            crate::services::menu::ProductRequest,
            crate::services::menu::VariantRequest,
            crate::services::menu::CreateSectionRequest,
            crate::services::menu::SectionRequest,
            crate::services::menu::SectionOptionRequest,
            crate::services::menu::ComboRequest,
            crate::services::menu::ComboItemRequest,
            crate::services::menu::ComboItemOptionRequest,
            crate::services::menu::BadgeTypeRequest,
            crate::services::menu::ProductBadgeRequest,
            crate::services::menu::views::CategoryView,
            crate::services::menu::views::ProductView,
            crate::services::menu::views::VariantView,
            crate::services::menu::views::SectionView,
            crate::services::menu::views::SectionOptionView,
            crate::services::menu::views::BadgeTypeView,
            crate::services::menu::views::ProductBadgeView,
            crate::services::menu::views::ComboView,
            crate::services::menu::views::ComboItemView,
            crate::services::menu::views::ComboItemOptionView,
            crate::services::menu::views::AppliedPromotionView,
            crate::services::catalog::MenuView,
            crate::services::catalog::MenuCategoryView,
            crate::handlers::menu::ProductSectionsRequest,
            crate::handlers::menu::ReorderRequest,
            crate::services::reorder::SortScope,
            crate::models::sort_order::SortEntry,

            // Promotions
            crate::entities::promotion::PromotionType,
            crate::entities::promotion::DiscountType,
            crate::entities::promotion::ValidityType,
            crate::services::promotions::PromotionRequest,
            crate::services::promotions::PromotionItemRequest,
            crate::services::promotions::BundleItemRequest,
            crate::services::menu::views::PromotionView,
            crate::services::menu::views::PromotionItemView,
            crate::services::menu::views::BundleItemView,

            // Drivers
            crate::services::drivers::CreateDriverRequest,
            crate::services::drivers::UpdateDriverRequest,
            crate::services::drivers::LocationUpdate,
            crate::services::drivers::DriverView,

            // Restaurants
            crate::services::restaurants::RestaurantRequest,
            crate::services::restaurants::RestaurantView,
        )
    )
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_workflow_paths() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Restaurant Orders API"));
        assert!(json.contains("/restaurant/orders/{id}/accept"));
        assert!(json.contains("/api/v1/menu/{slug}"));
        assert!(json.contains("\"Bearer\""));
    }
}
