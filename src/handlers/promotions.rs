use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use super::common::{
    created_response, message_response, no_content_response, success_response, HandlerResult,
};
use crate::{
    auth::AuthUser,
    services::menu::views::PromotionView,
    services::promotions::PromotionRequest,
    AppState,
};

/// Promotion management, mounted under `/restaurant/promotions`.
pub fn promotion_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_promotions).post(create_promotion))
        .route(
            "/:id",
            get(get_promotion)
                .put(update_promotion)
                .delete(delete_promotion),
        )
        .route("/:id/toggle-active", post(toggle_promotion))
}

#[utoipa::path(
    get,
    path = "/restaurant/promotions",
    summary = "List promotions",
    responses((status = 200, description = "All promotions, active or not", body = Vec<PromotionView>)),
    security(("Bearer" = [])),
    tag = "promotions"
)]
pub async fn list_promotions(State(state): State<AppState>, user: AuthUser) -> HandlerResult {
    let promotions = state.services.promotions.list(user.restaurant_id).await?;
    Ok(success_response(promotions))
}

#[utoipa::path(
    get,
    path = "/restaurant/promotions/{id}",
    summary = "Get promotion",
    params(("id" = Uuid, Path, description = "Promotion ID")),
    responses(
        (status = 200, description = "Promotion with its targets", body = PromotionView),
        (status = 404, description = "Promotion not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "promotions"
)]
pub async fn get_promotion(
    State(state): State<AppState>,
    user: AuthUser,
    Path(promotion_id): Path<Uuid>,
) -> HandlerResult {
    let promotion = state
        .services
        .promotions
        .get(user.restaurant_id, promotion_id)
        .await?;
    Ok(success_response(promotion))
}

#[utoipa::path(
    post,
    path = "/restaurant/promotions",
    summary = "Create promotion",
    request_body = PromotionRequest,
    responses(
        (status = 201, description = "Promotion created", body = PromotionView),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "promotions"
)]
pub async fn create_promotion(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<PromotionRequest>,
) -> HandlerResult {
    let promotion = state
        .services
        .promotions
        .create(user.restaurant_id, request)
        .await?;
    Ok(created_response(promotion))
}

#[utoipa::path(
    put,
    path = "/restaurant/promotions/{id}",
    summary = "Update promotion",
    description = "Replaces the promotion fields and its full target list",
    params(("id" = Uuid, Path, description = "Promotion ID")),
    request_body = PromotionRequest,
    responses(
        (status = 200, description = "Promotion updated", body = PromotionView),
        (status = 404, description = "Promotion not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "promotions"
)]
pub async fn update_promotion(
    State(state): State<AppState>,
    user: AuthUser,
    Path(promotion_id): Path<Uuid>,
    Json(request): Json<PromotionRequest>,
) -> HandlerResult {
    let promotion = state
        .services
        .promotions
        .update(user.restaurant_id, promotion_id, request)
        .await?;
    Ok(success_response(promotion))
}

#[utoipa::path(
    post,
    path = "/restaurant/promotions/{id}/toggle-active",
    summary = "Activate or deactivate a promotion",
    params(("id" = Uuid, Path, description = "Promotion ID")),
    responses((status = 200, description = "Promotion updated", body = PromotionView)),
    security(("Bearer" = [])),
    tag = "promotions"
)]
pub async fn toggle_promotion(
    State(state): State<AppState>,
    user: AuthUser,
    Path(promotion_id): Path<Uuid>,
) -> HandlerResult {
    let promotion = state
        .services
        .promotions
        .toggle_active(user.restaurant_id, promotion_id)
        .await?;
    let message = if promotion.is_active {
        "Promotion activated"
    } else {
        "Promotion deactivated"
    };
    Ok(message_response(promotion, message))
}

#[utoipa::path(
    delete,
    path = "/restaurant/promotions/{id}",
    summary = "Delete promotion",
    params(("id" = Uuid, Path, description = "Promotion ID")),
    responses(
        (status = 204, description = "Promotion deleted"),
        (status = 404, description = "Promotion not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "promotions"
)]
pub async fn delete_promotion(
    State(state): State<AppState>,
    user: AuthUser,
    Path(promotion_id): Path<Uuid>,
) -> HandlerResult {
    state
        .services
        .promotions
        .delete(user.restaurant_id, promotion_id)
        .await?;
    Ok(no_content_response())
}
