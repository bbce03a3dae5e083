//! Unauthenticated, customer-facing API.
//!
//! Payloads are wrapped as `{ "data": { "<resource>": ... } }` instead of the
//! staff envelope, matching what storefront clients consume.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::common::HandlerResult;
use crate::{
    commands::orders::PlaceOrderRequest,
    services::catalog::MenuView,
    services::menu::views::{ComboView, ProductView, PromotionView},
    services::orders::OrderResponse,
    services::restaurants::RestaurantView,
    AppState,
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/restaurants/:slug", get(get_restaurant))
        .route("/restaurants/:slug/promotions", get(active_promotions))
        .route("/restaurants/:slug/orders", post(place_order))
        .route("/menu/products/:id", get(get_product))
        .route("/menu/combos/:id", get(get_combo))
        .route("/menu/:slug", get(get_menu))
}

fn data_response<T: Serialize>(status: StatusCode, key: &str, value: T) -> Response {
    (status, Json(json!({ "data": { key: value } }))).into_response()
}

#[utoipa::path(
    get,
    path = "/api/v1/restaurants/{slug}",
    summary = "Restaurant by slug",
    params(("slug" = String, Path, description = "Restaurant slug")),
    responses(
        (status = 200, description = "Restaurant", body = RestaurantView),
        (status = 404, description = "Unknown or inactive restaurant", body = crate::errors::ErrorResponse),
    ),
    tag = "public"
)]
pub async fn get_restaurant(State(state): State<AppState>, Path(slug): Path<String>) -> HandlerResult {
    let restaurant = state.services.restaurants.find_active_by_slug(&slug).await?;
    Ok(data_response(
        StatusCode::OK,
        "restaurant",
        RestaurantView::from(restaurant),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/restaurants/{slug}/promotions",
    summary = "Promotions valid right now",
    params(("slug" = String, Path, description = "Restaurant slug")),
    responses(
        (status = 200, description = "Active promotions in display order", body = Vec<PromotionView>),
        (status = 404, description = "Unknown or inactive restaurant", body = crate::errors::ErrorResponse),
    ),
    tag = "public"
)]
pub async fn active_promotions(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> HandlerResult {
    let restaurant = state.services.restaurants.find_active_by_slug(&slug).await?;
    let promotions = state
        .services
        .promotions
        .active_now(&restaurant, Utc::now())
        .await?;
    Ok(data_response(StatusCode::OK, "promotions", promotions))
}

#[utoipa::path(
    get,
    path = "/api/v1/menu/{slug}",
    summary = "Full menu",
    params(("slug" = String, Path, description = "Restaurant slug")),
    responses(
        (status = 200, description = "Active categories, products, combos and promotions", body = MenuView),
        (status = 404, description = "Unknown or inactive restaurant", body = crate::errors::ErrorResponse),
    ),
    tag = "public"
)]
pub async fn get_menu(State(state): State<AppState>, Path(slug): Path<String>) -> HandlerResult {
    let restaurant = state.services.restaurants.find_active_by_slug(&slug).await?;
    let menu = state.services.catalog.menu(restaurant, Utc::now()).await?;
    Ok(data_response(StatusCode::OK, "menu", menu))
}

#[utoipa::path(
    get,
    path = "/api/v1/menu/products/{id}",
    summary = "Product detail",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product with variants, sections and badges", body = ProductView),
        (status = 404, description = "Unknown or inactive product", body = crate::errors::ErrorResponse),
    ),
    tag = "public"
)]
pub async fn get_product(State(state): State<AppState>, Path(product_id): Path<Uuid>) -> HandlerResult {
    let product = state.services.catalog.product(product_id, Utc::now()).await?;
    Ok(data_response(StatusCode::OK, "product", product))
}

#[utoipa::path(
    get,
    path = "/api/v1/menu/combos/{id}",
    summary = "Combo detail",
    params(("id" = Uuid, Path, description = "Combo ID")),
    responses(
        (status = 200, description = "Combo with its items", body = ComboView),
        (status = 404, description = "Unknown or inactive combo", body = crate::errors::ErrorResponse),
    ),
    tag = "public"
)]
pub async fn get_combo(State(state): State<AppState>, Path(combo_id): Path<Uuid>) -> HandlerResult {
    let combo = state.services.catalog.combo(combo_id, Utc::now()).await?;
    Ok(data_response(StatusCode::OK, "combo", combo))
}

#[utoipa::path(
    post,
    path = "/api/v1/restaurants/{slug}/orders",
    summary = "Place an order",
    description = "Prices are computed server-side from the current menu; submitted prices are ignored.",
    params(("slug" = String, Path, description = "Restaurant slug")),
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderResponse),
        (status = 404, description = "Unknown or inactive restaurant", body = crate::errors::ErrorResponse),
        (status = 422, description = "Invalid items or selections", body = crate::errors::ErrorResponse),
    ),
    tag = "public"
)]
pub async fn place_order(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<PlaceOrderRequest>,
) -> HandlerResult {
    let restaurant = state.services.restaurants.find_active_by_slug(&slug).await?;
    let order = state.services.orders.place_order(restaurant, request).await?;
    Ok(data_response(StatusCode::CREATED, "order", order))
}
