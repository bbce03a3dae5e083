use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use super::common::{
    created_response, message_response, no_content_response, success_response, HandlerResult,
    VersionGuard,
};
use crate::{
    auth::AuthUser,
    models::order_status::OrderAction,
    services::drivers::{
        CreateDriverRequest, DriverFilter, DriverView, LocationUpdate, UpdateDriverRequest,
    },
    services::orders::OrderResponse,
    AppState,
};

/// Driver roster management, mounted under `/restaurant/drivers`.
pub fn driver_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_drivers).post(create_driver))
        .route(
            "/:id",
            get(get_driver).put(update_driver).delete(delete_driver),
        )
        .route("/:id/toggle-active", post(toggle_active))
        .route("/:id/toggle-available", post(toggle_available))
}

/// Endpoints for the driver app, mounted under `/driver`.
pub fn driver_routes() -> Router<AppState> {
    Router::new()
        .route("/check-in", post(check_in))
        .route("/location", put(update_location))
        .route("/orders", get(my_orders))
        .route("/orders/:id/pick-up", post(pick_up))
        .route("/orders/:id/delivered", post(delivered))
}

// Staff endpoints

#[utoipa::path(
    get,
    path = "/restaurant/drivers",
    summary = "List drivers",
    params(DriverFilter),
    responses((status = 200, description = "Drivers of the restaurant", body = Vec<DriverView>)),
    security(("Bearer" = [])),
    tag = "drivers"
)]
pub async fn list_drivers(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<DriverFilter>,
) -> HandlerResult {
    let drivers = state
        .services
        .drivers
        .list(user.restaurant_id, &filter)
        .await?;
    Ok(success_response(
        drivers.into_iter().map(DriverView::from).collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    post,
    path = "/restaurant/drivers",
    summary = "Create driver",
    request_body = CreateDriverRequest,
    responses(
        (status = 201, description = "Driver created", body = DriverView),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "drivers"
)]
pub async fn create_driver(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateDriverRequest>,
) -> HandlerResult {
    let driver = state
        .services
        .drivers
        .create(user.restaurant_id, request)
        .await?;
    Ok(created_response(DriverView::from(driver)))
}

#[utoipa::path(
    get,
    path = "/restaurant/drivers/{id}",
    summary = "Get driver",
    params(("id" = Uuid, Path, description = "Driver ID")),
    responses(
        (status = 200, description = "Driver", body = DriverView),
        (status = 404, description = "Driver not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "drivers"
)]
pub async fn get_driver(
    State(state): State<AppState>,
    user: AuthUser,
    Path(driver_id): Path<Uuid>,
) -> HandlerResult {
    let driver = state
        .services
        .drivers
        .get(user.restaurant_id, driver_id)
        .await?;
    Ok(success_response(DriverView::from(driver)))
}

#[utoipa::path(
    put,
    path = "/restaurant/drivers/{id}",
    summary = "Update driver",
    params(("id" = Uuid, Path, description = "Driver ID")),
    request_body = UpdateDriverRequest,
    responses(
        (status = 200, description = "Driver updated", body = DriverView),
        (status = 404, description = "Driver not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "drivers"
)]
pub async fn update_driver(
    State(state): State<AppState>,
    user: AuthUser,
    Path(driver_id): Path<Uuid>,
    Json(request): Json<UpdateDriverRequest>,
) -> HandlerResult {
    let driver = state
        .services
        .drivers
        .update(user.restaurant_id, driver_id, request)
        .await?;
    Ok(success_response(DriverView::from(driver)))
}

#[utoipa::path(
    post,
    path = "/restaurant/drivers/{id}/toggle-active",
    summary = "Activate or deactivate a driver",
    params(("id" = Uuid, Path, description = "Driver ID")),
    responses((status = 200, description = "Driver updated", body = DriverView)),
    security(("Bearer" = [])),
    tag = "drivers"
)]
pub async fn toggle_active(
    State(state): State<AppState>,
    user: AuthUser,
    Path(driver_id): Path<Uuid>,
) -> HandlerResult {
    let driver = state
        .services
        .drivers
        .toggle_active(user.restaurant_id, driver_id)
        .await?;
    let message = if driver.is_active {
        "Driver activated"
    } else {
        "Driver deactivated"
    };
    Ok(message_response(DriverView::from(driver), message))
}

#[utoipa::path(
    post,
    path = "/restaurant/drivers/{id}/toggle-available",
    summary = "Toggle driver availability",
    params(("id" = Uuid, Path, description = "Driver ID")),
    responses(
        (status = 200, description = "Driver updated", body = DriverView),
        (status = 409, description = "Driver is inactive", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "drivers"
)]
pub async fn toggle_available(
    State(state): State<AppState>,
    user: AuthUser,
    Path(driver_id): Path<Uuid>,
) -> HandlerResult {
    let driver = state
        .services
        .drivers
        .toggle_available(user.restaurant_id, driver_id)
        .await?;
    Ok(success_response(DriverView::from(driver)))
}

#[utoipa::path(
    delete,
    path = "/restaurant/drivers/{id}",
    summary = "Delete driver",
    params(("id" = Uuid, Path, description = "Driver ID")),
    responses(
        (status = 204, description = "Driver deleted"),
        (status = 409, description = "Driver still has active orders", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "drivers"
)]
pub async fn delete_driver(
    State(state): State<AppState>,
    user: AuthUser,
    Path(driver_id): Path<Uuid>,
) -> HandlerResult {
    state
        .services
        .drivers
        .delete(user.restaurant_id, driver_id)
        .await?;
    Ok(no_content_response())
}

// Driver endpoints. The driver id always comes from the token.

#[utoipa::path(
    post,
    path = "/driver/check-in",
    summary = "Driver check-in",
    request_body = Option<LocationUpdate>,
    responses(
        (status = 200, description = "Checked in", body = DriverView),
        (status = 403, description = "Driver is inactive", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "driver"
)]
pub async fn check_in(
    State(state): State<AppState>,
    user: AuthUser,
    body: Option<Json<LocationUpdate>>,
) -> HandlerResult {
    let driver_id = user.require_driver()?;
    let driver = state
        .services
        .drivers
        .check_in(user.restaurant_id, driver_id, body.map(|Json(location)| location))
        .await?;
    Ok(message_response(DriverView::from(driver), "Checked in"))
}

#[utoipa::path(
    put,
    path = "/driver/location",
    summary = "Report current location",
    request_body = LocationUpdate,
    responses(
        (status = 200, description = "Location stored", body = DriverView),
        (status = 422, description = "Coordinates out of range", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "driver"
)]
pub async fn update_location(
    State(state): State<AppState>,
    user: AuthUser,
    Json(location): Json<LocationUpdate>,
) -> HandlerResult {
    let driver_id = user.require_driver()?;
    let driver = state
        .services
        .drivers
        .update_location(user.restaurant_id, driver_id, location)
        .await?;
    Ok(success_response(DriverView::from(driver)))
}

#[utoipa::path(
    get,
    path = "/driver/orders",
    summary = "Orders assigned to the calling driver",
    responses((status = 200, description = "Ready and out-for-delivery orders", body = Vec<OrderResponse>)),
    security(("Bearer" = [])),
    tag = "driver"
)]
pub async fn my_orders(State(state): State<AppState>, user: AuthUser) -> HandlerResult {
    let driver_id = user.require_driver()?;
    let orders = state
        .services
        .orders
        .driver_orders(user.restaurant_id, driver_id)
        .await?;
    Ok(success_response(orders))
}

#[utoipa::path(
    post,
    path = "/driver/orders/{id}/pick-up",
    summary = "Pick up an assigned order",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = Option<VersionGuard>,
    responses(
        (status = 200, description = "Order is out for delivery", body = OrderResponse),
        (status = 403, description = "Order is assigned to another driver", body = crate::errors::ErrorResponse),
        (status = 409, description = "Invalid transition", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "driver"
)]
pub async fn pick_up(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    body: Option<Json<VersionGuard>>,
) -> HandlerResult {
    driver_action(state, user, order_id, OrderAction::PickUp, body, "Order picked up").await
}

#[utoipa::path(
    post,
    path = "/driver/orders/{id}/delivered",
    summary = "Mark an order delivered",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = Option<VersionGuard>,
    responses(
        (status = 200, description = "Order delivered", body = OrderResponse),
        (status = 403, description = "Order is assigned to another driver", body = crate::errors::ErrorResponse),
        (status = 409, description = "Invalid transition", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "driver"
)]
pub async fn delivered(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    body: Option<Json<VersionGuard>>,
) -> HandlerResult {
    driver_action(
        state,
        user,
        order_id,
        OrderAction::MarkDelivered,
        body,
        "Order delivered",
    )
    .await
}

async fn driver_action(
    state: AppState,
    user: AuthUser,
    order_id: Uuid,
    action: OrderAction,
    body: Option<Json<VersionGuard>>,
    message: &str,
) -> HandlerResult {
    user.require_driver()?;
    let Json(guard) = body.unwrap_or_default();
    let order = state
        .services
        .orders
        .transition(
            user.restaurant_id,
            order_id,
            action,
            user.actor(),
            guard.expected_version,
            guard.notes,
        )
        .await?;
    Ok(message_response(order, message))
}
