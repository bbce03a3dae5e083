use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::common::{
    message_response, success_response, HandlerResult, PaginatedResponse, PaginationParams,
    VersionGuard,
};
use crate::{
    auth::{consts as perm, AuthRouterExt, AuthUser},
    errors::ServiceError,
    models::order_status::{OrderAction, PaymentStatus},
    notifications::{OrderUpdate, RestaurantUpdates},
    services::orders::{OrderFilter, OrderResponse, StatusHistoryEntry},
    AppState,
};

/// Order board, mounted under `/restaurant/orders`.
pub fn order_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/", get(list_orders))
        .route("/ws", get(order_updates_ws))
        .route("/:id", get(get_order))
        .route("/:id/history", get(order_history))
        .route("/:id/print", post(print_order))
        .with_permission(perm::ORDERS_READ);

    let update = Router::new()
        .route("/:id/accept", post(accept_order))
        .route("/:id/start-preparing", post(start_preparing))
        .route("/:id/ready", post(mark_ready))
        .route("/:id/assign-driver", post(assign_driver))
        .route("/:id/complete", post(complete_order))
        .route("/:id/delivered", post(mark_delivered))
        .route("/:id/payment-status", put(update_payment_status))
        .with_permission(perm::ORDERS_UPDATE);

    let cancel = Router::new()
        .route("/:id/cancel", post(cancel_order))
        .with_permission(perm::ORDERS_CANCEL);

    read.merge(update).merge(cancel)
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct AcceptOrderRequest {
    /// Move straight to `preparing` instead of `confirmed`
    #[serde(default)]
    pub start_preparing: bool,
    pub expected_version: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AssignDriverRequest {
    pub driver_id: Uuid,
    pub expected_version: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CancelOrderRequest {
    pub reason: String,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PaymentStatusRequest {
    pub payment_status: PaymentStatus,
    pub expected_version: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PrintedTicket {
    pub order_id: Uuid,
    pub order_number: String,
    pub ticket: String,
}

async fn run_action(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    action: OrderAction,
    guard: VersionGuard,
) -> Result<OrderResponse, ServiceError> {
    state
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
        .await
}

#[utoipa::path(
    get,
    path = "/restaurant/orders",
    summary = "List orders",
    description = "Newest orders first, scoped to the caller's restaurant",
    params(OrderFilter, PaginationParams),
    responses(
        (status = 200, description = "Orders retrieved", body = PaginatedResponse<OrderResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<OrderFilter>,
    Query(pagination): Query<PaginationParams>,
) -> HandlerResult {
    let page = pagination.page();
    let per_page = state.config.page_size(pagination.per_page);
    let (orders, total) = state
        .services
        .orders
        .list_orders(user.restaurant_id, &filter, page, per_page)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        orders, page, per_page, total,
    )))
}

#[utoipa::path(
    get,
    path = "/restaurant/orders/{id}",
    summary = "Get order",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with items and available actions", body = OrderResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> HandlerResult {
    let order = state
        .services
        .orders
        .get_order(user.restaurant_id, order_id)
        .await?;
    Ok(success_response(order))
}

#[utoipa::path(
    get,
    path = "/restaurant/orders/{id}/history",
    summary = "Order status history",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Status changes, oldest first", body = Vec<StatusHistoryEntry>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn order_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> HandlerResult {
    let history = state
        .services
        .orders
        .status_history(user.restaurant_id, order_id)
        .await?;
    Ok(success_response(history))
}

#[utoipa::path(
    post,
    path = "/restaurant/orders/{id}/accept",
    summary = "Accept order",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = Option<AcceptOrderRequest>,
    responses(
        (status = 200, description = "Order accepted", body = OrderResponse),
        (status = 409, description = "Invalid transition or concurrent modification", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn accept_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    body: Option<Json<AcceptOrderRequest>>,
) -> HandlerResult {
    let Json(request) = body.unwrap_or_default();
    let action = OrderAction::Accept {
        start_preparing: request.start_preparing,
    };
    let guard = VersionGuard {
        expected_version: request.expected_version,
        notes: request.notes,
    };
    let order = run_action(&state, &user, order_id, action, guard).await?;
    Ok(message_response(order, "Order accepted"))
}

#[utoipa::path(
    post,
    path = "/restaurant/orders/{id}/start-preparing",
    summary = "Start preparing a confirmed order",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = Option<VersionGuard>,
    responses(
        (status = 200, description = "Order is being prepared", body = OrderResponse),
        (status = 409, description = "Invalid transition", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn start_preparing(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    body: Option<Json<VersionGuard>>,
) -> HandlerResult {
    let Json(guard) = body.unwrap_or_default();
    let order = run_action(&state, &user, order_id, OrderAction::StartPreparing, guard).await?;
    Ok(message_response(order, "Order is being prepared"))
}

#[utoipa::path(
    post,
    path = "/restaurant/orders/{id}/ready",
    summary = "Mark order ready",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = Option<VersionGuard>,
    responses(
        (status = 200, description = "Order is ready", body = OrderResponse),
        (status = 409, description = "Invalid transition", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn mark_ready(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    body: Option<Json<VersionGuard>>,
) -> HandlerResult {
    let Json(guard) = body.unwrap_or_default();
    let order = run_action(&state, &user, order_id, OrderAction::MarkReady, guard).await?;
    Ok(message_response(order, "Order is ready"))
}

#[utoipa::path(
    post,
    path = "/restaurant/orders/{id}/assign-driver",
    summary = "Assign a driver to a ready delivery order",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = AssignDriverRequest,
    responses(
        (status = 200, description = "Driver assigned", body = OrderResponse),
        (status = 409, description = "Invalid transition", body = crate::errors::ErrorResponse),
        (status = 422, description = "Driver cannot take orders", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn assign_driver(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<AssignDriverRequest>,
) -> HandlerResult {
    let action = OrderAction::AssignDriver {
        driver_id: request.driver_id,
    };
    let guard = VersionGuard {
        expected_version: request.expected_version,
        notes: request.notes,
    };
    let order = run_action(&state, &user, order_id, action, guard).await?;
    Ok(message_response(order, "Driver assigned"))
}

#[utoipa::path(
    post,
    path = "/restaurant/orders/{id}/complete",
    summary = "Complete order",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = Option<VersionGuard>,
    responses(
        (status = 200, description = "Order completed", body = OrderResponse),
        (status = 409, description = "Invalid transition", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn complete_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    body: Option<Json<VersionGuard>>,
) -> HandlerResult {
    let Json(guard) = body.unwrap_or_default();
    let order = run_action(&state, &user, order_id, OrderAction::Complete, guard).await?;
    Ok(message_response(order, "Order completed"))
}

#[utoipa::path(
    post,
    path = "/restaurant/orders/{id}/delivered",
    summary = "Mark order delivered",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = Option<VersionGuard>,
    responses(
        (status = 200, description = "Order delivered", body = OrderResponse),
        (status = 409, description = "Invalid transition", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn mark_delivered(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    body: Option<Json<VersionGuard>>,
) -> HandlerResult {
    let Json(guard) = body.unwrap_or_default();
    let order = run_action(&state, &user, order_id, OrderAction::MarkDelivered, guard).await?;
    Ok(message_response(order, "Order delivered"))
}

#[utoipa::path(
    post,
    path = "/restaurant/orders/{id}/cancel",
    summary = "Cancel order",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "Order cancelled", body = OrderResponse),
        (status = 409, description = "Invalid transition or missing reason", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<CancelOrderRequest>,
) -> HandlerResult {
    let action = OrderAction::Cancel {
        reason: request.reason,
    };
    let guard = VersionGuard {
        expected_version: request.expected_version,
        notes: None,
    };
    let order = run_action(&state, &user, order_id, action, guard).await?;
    Ok(message_response(order, "Order cancelled"))
}

#[utoipa::path(
    post,
    path = "/restaurant/orders/{id}/print",
    summary = "Print kitchen ticket",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Ticket sent to the printer", body = PrintedTicket),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 500, description = "Printer failure", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn print_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> HandlerResult {
    let ticket = state
        .services
        .orders
        .print_ticket(user.restaurant_id, order_id)
        .await?;
    let printed = PrintedTicket {
        order_id: ticket.order_id,
        order_number: ticket.order_number.clone(),
        ticket: ticket.render()?,
    };
    Ok(message_response(printed, "Ticket sent to the printer"))
}

#[utoipa::path(
    put,
    path = "/restaurant/orders/{id}/payment-status",
    summary = "Update payment status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = PaymentStatusRequest,
    responses(
        (status = 200, description = "Payment status updated", body = OrderResponse),
        (status = 409, description = "Concurrent modification", body = crate::errors::ErrorResponse),
        (status = 422, description = "Status not allowed", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn update_payment_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<PaymentStatusRequest>,
) -> HandlerResult {
    let order = state
        .services
        .orders
        .update_payment_status(
            user.restaurant_id,
            order_id,
            request.payment_status,
            request.expected_version,
        )
        .await?;
    Ok(message_response(order, "Payment status updated"))
}

/// Live order updates for the caller's restaurant. Browsers pass the token
/// as `?token=`.
#[utoipa::path(
    get,
    path = "/restaurant/orders/ws",
    summary = "Subscribe to order updates",
    responses((status = 101, description = "Switching to WebSocket", body = OrderUpdate)),
    security(("Bearer" = [])),
    tag = "orders"
)]
pub async fn order_updates_ws(
    State(state): State<AppState>,
    user: AuthUser,
    ws: WebSocketUpgrade,
) -> Response {
    let updates = state.order_updates.subscribe_restaurant(user.restaurant_id);
    ws.on_upgrade(move |socket| stream_updates(socket, updates))
}

async fn stream_updates(mut socket: WebSocket, mut updates: RestaurantUpdates) {
    let restaurant_id = updates.restaurant_id();
    debug!(%restaurant_id, "order update subscriber connected");
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(update) => {
                    let text = match serde_json::to_string(&update) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("failed to encode order update: {}", e);
                            continue;
                        }
                    };
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(%restaurant_id, skipped, "order update subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!(%restaurant_id, "order update subscriber disconnected");
}
