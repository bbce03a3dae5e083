use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use super::common::{created_response, success_response, HandlerResult};
use crate::{
    auth::AuthUser,
    services::restaurants::{RestaurantRequest, RestaurantView},
    AppState,
};

/// Platform administration, mounted under `/admin/restaurants`.
pub fn restaurant_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_restaurants).post(create_restaurant))
        .route("/:id", get(get_restaurant).put(update_restaurant))
}

#[utoipa::path(
    get,
    path = "/admin/restaurants",
    summary = "List restaurants",
    responses((status = 200, description = "All restaurants", body = Vec<RestaurantView>)),
    security(("Bearer" = [])),
    tag = "restaurants"
)]
pub async fn list_restaurants(State(state): State<AppState>) -> HandlerResult {
    let restaurants = state.services.restaurants.list().await?;
    Ok(success_response(restaurants))
}

#[utoipa::path(
    post,
    path = "/admin/restaurants",
    summary = "Create restaurant",
    request_body = RestaurantRequest,
    responses(
        (status = 201, description = "Restaurant created", body = RestaurantView),
        (status = 409, description = "Slug already taken", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "restaurants"
)]
pub async fn create_restaurant(
    State(state): State<AppState>,
    Json(request): Json<RestaurantRequest>,
) -> HandlerResult {
    let restaurant = state.services.restaurants.create(request).await?;
    Ok(created_response(restaurant))
}

#[utoipa::path(
    get,
    path = "/admin/restaurants/{id}",
    summary = "Get restaurant",
    params(("id" = Uuid, Path, description = "Restaurant ID")),
    responses(
        (status = 200, description = "Restaurant", body = RestaurantView),
        (status = 404, description = "Restaurant not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "restaurants"
)]
pub async fn get_restaurant(
    State(state): State<AppState>,
    Path(restaurant_id): Path<Uuid>,
) -> HandlerResult {
    let restaurant = state.services.restaurants.get(restaurant_id).await?;
    Ok(success_response(RestaurantView::from(restaurant)))
}

#[utoipa::path(
    put,
    path = "/admin/restaurants/{id}",
    summary = "Update restaurant",
    params(("id" = Uuid, Path, description = "Restaurant ID")),
    request_body = RestaurantRequest,
    responses(
        (status = 200, description = "Restaurant updated", body = RestaurantView),
        (status = 404, description = "Restaurant not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "restaurants"
)]
pub async fn update_restaurant(
    State(state): State<AppState>,
    Path(restaurant_id): Path<Uuid>,
    Json(request): Json<RestaurantRequest>,
) -> HandlerResult {
    let restaurant = state
        .services
        .restaurants
        .update(restaurant_id, request)
        .await?;
    Ok(success_response(restaurant))
}

/// The restaurant the caller's token is scoped to.
#[utoipa::path(
    get,
    path = "/restaurant/profile",
    summary = "Current restaurant",
    responses((status = 200, description = "Restaurant of the authenticated user", body = RestaurantView)),
    security(("Bearer" = [])),
    tag = "restaurants"
)]
pub async fn my_restaurant(State(state): State<AppState>, user: AuthUser) -> HandlerResult {
    let restaurant = state.services.restaurants.get(user.restaurant_id).await?;
    Ok(success_response(RestaurantView::from(restaurant)))
}
