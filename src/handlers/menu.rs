use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::common::{
    created_response, message_response, no_content_response, success_response, HandlerResult,
};
use crate::{
    auth::AuthUser,
    models::sort_order::SortEntry,
    services::menu::views::CategoryView,
    services::menu::{
        BadgeTypeRequest, CategoryRequest, ComboRequest, CreateProductRequest,
        CreateSectionRequest, ProductBadgeRequest, ProductRequest, SectionOptionRequest,
        SectionRequest, VariantRequest,
    },
    services::reorder::SortScope,
    AppState,
};

/// Menu management, mounted under `/restaurant/menu`.
pub fn menu_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/:id", put(update_category).delete(delete_category))
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/:id/toggle-availability", post(toggle_availability))
        .route("/products/:id/variants", post(add_variant))
        .route("/products/:id/sections", put(set_product_sections))
        .route("/products/:id/badges", post(add_product_badge))
        .route("/products/:id/badges/:badge_id", delete(remove_product_badge))
        .route("/variants/:id", put(update_variant).delete(delete_variant))
        .route("/sections", get(list_sections).post(create_section))
        .route(
            "/sections/:id",
            get(get_section).put(update_section).delete(delete_section),
        )
        .route("/sections/:id/options", post(add_section_option))
        .route(
            "/section-options/:id",
            put(update_section_option).delete(delete_section_option),
        )
        .route("/combos", get(list_combos).post(create_combo))
        .route(
            "/combos/:id",
            get(get_combo).put(update_combo).delete(delete_combo),
        )
        .route("/badge-types", get(list_badge_types).post(create_badge_type))
        .route(
            "/badge-types/:id",
            put(update_badge_type).delete(delete_badge_type),
        )
        .route("/reorder/:scope/:parent_id", post(reorder))
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams)]
pub struct ProductListQuery {
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ProductSectionsRequest {
    pub section_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ReorderRequest {
    /// Every child of the parent, each with its desired position
    pub items: Vec<SortEntry>,
}

// Categories

#[utoipa::path(
    get,
    path = "/restaurant/menu/categories",
    summary = "List categories",
    responses((status = 200, description = "Categories in display order", body = Vec<CategoryView>)),
    security(("Bearer" = [])),
    tag = "menu"
)]
pub async fn list_categories(State(state): State<AppState>, user: AuthUser) -> HandlerResult {
    let categories = state.services.menu.list_categories(user.restaurant_id).await?;
    Ok(success_response(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CategoryRequest>,
) -> HandlerResult {
    let category = state
        .services
        .menu
        .create_category(user.restaurant_id, request)
        .await?;
    Ok(created_response(category))
}

pub async fn update_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(category_id): Path<Uuid>,
    Json(request): Json<CategoryRequest>,
) -> HandlerResult {
    let category = state
        .services
        .menu
        .update_category(user.restaurant_id, category_id, request)
        .await?;
    Ok(success_response(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(category_id): Path<Uuid>,
) -> HandlerResult {
    state
        .services
        .menu
        .delete_category(user.restaurant_id, category_id)
        .await?;
    Ok(no_content_response())
}

// Products and variants

#[utoipa::path(
    get,
    path = "/restaurant/menu/products",
    summary = "List products",
    params(ProductListQuery),
    responses((status = 200, description = "Products with their variants", body = Vec<crate::services::menu::views::ProductView>)),
    security(("Bearer" = [])),
    tag = "menu"
)]
pub async fn list_products(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ProductListQuery>,
) -> HandlerResult {
    let products = state
        .services
        .menu
        .list_products(user.restaurant_id, query.category_id)
        .await?;
    Ok(success_response(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> HandlerResult {
    let product = state
        .services
        .menu
        .get_product(user.restaurant_id, product_id)
        .await?;
    Ok(success_response(product))
}

#[utoipa::path(
    post,
    path = "/restaurant/menu/products",
    summary = "Create product",
    description = "Creates a product with its variants and section links in one transaction",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = crate::services::menu::views::ProductView),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "menu"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateProductRequest>,
) -> HandlerResult {
    let product = state
        .services
        .menu
        .create_product(user.restaurant_id, request)
        .await?;
    Ok(created_response(product))
}

pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(request): Json<ProductRequest>,
) -> HandlerResult {
    let product = state
        .services
        .menu
        .update_product(user.restaurant_id, product_id, request)
        .await?;
    Ok(success_response(product))
}

pub async fn toggle_availability(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> HandlerResult {
    let product = state
        .services
        .menu
        .toggle_product_availability(user.restaurant_id, product_id)
        .await?;
    let message = if product.is_available {
        "Product is available"
    } else {
        "Product is unavailable"
    };
    Ok(message_response(product, message))
}

pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> HandlerResult {
    state
        .services
        .menu
        .delete_product(user.restaurant_id, product_id)
        .await?;
    Ok(no_content_response())
}

pub async fn add_variant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(request): Json<VariantRequest>,
) -> HandlerResult {
    let variant = state
        .services
        .menu
        .add_variant(user.restaurant_id, product_id, request)
        .await?;
    Ok(created_response(variant))
}

pub async fn update_variant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(variant_id): Path<Uuid>,
    Json(request): Json<VariantRequest>,
) -> HandlerResult {
    let variant = state
        .services
        .menu
        .update_variant(user.restaurant_id, variant_id, request)
        .await?;
    Ok(success_response(variant))
}

pub async fn delete_variant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(variant_id): Path<Uuid>,
) -> HandlerResult {
    state
        .services
        .menu
        .delete_variant(user.restaurant_id, variant_id)
        .await?;
    Ok(no_content_response())
}

/// Replaces the product's linked sections, keeping the submitted order.
pub async fn set_product_sections(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(request): Json<ProductSectionsRequest>,
) -> HandlerResult {
    let product = state
        .services
        .menu
        .set_product_sections(user.restaurant_id, product_id, request.section_ids)
        .await?;
    Ok(success_response(product))
}

pub async fn add_product_badge(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    Json(request): Json<ProductBadgeRequest>,
) -> HandlerResult {
    let badge = state
        .services
        .menu
        .add_product_badge(user.restaurant_id, product_id, request)
        .await?;
    Ok(created_response(badge))
}

pub async fn remove_product_badge(
    State(state): State<AppState>,
    user: AuthUser,
    Path((product_id, badge_id)): Path<(Uuid, Uuid)>,
) -> HandlerResult {
    state
        .services
        .menu
        .remove_product_badge(user.restaurant_id, product_id, badge_id)
        .await?;
    Ok(no_content_response())
}

// Sections and their options

pub async fn list_sections(State(state): State<AppState>, user: AuthUser) -> HandlerResult {
    let sections = state.services.menu.list_sections(user.restaurant_id).await?;
    Ok(success_response(sections))
}

pub async fn get_section(
    State(state): State<AppState>,
    user: AuthUser,
    Path(section_id): Path<Uuid>,
) -> HandlerResult {
    let section = state
        .services
        .menu
        .get_section(user.restaurant_id, section_id)
        .await?;
    Ok(success_response(section))
}

pub async fn create_section(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateSectionRequest>,
) -> HandlerResult {
    let section = state
        .services
        .menu
        .create_section(user.restaurant_id, request)
        .await?;
    Ok(created_response(section))
}

pub async fn update_section(
    State(state): State<AppState>,
    user: AuthUser,
    Path(section_id): Path<Uuid>,
    Json(request): Json<SectionRequest>,
) -> HandlerResult {
    let section = state
        .services
        .menu
        .update_section(user.restaurant_id, section_id, request)
        .await?;
    Ok(success_response(section))
}

#[utoipa::path(
    delete,
    path = "/restaurant/menu/sections/{id}",
    summary = "Delete section",
    params(("id" = Uuid, Path, description = "Section ID")),
    responses(
        (status = 204, description = "Section deleted"),
        (status = 409, description = "Section is still used by products", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "menu"
)]
pub async fn delete_section(
    State(state): State<AppState>,
    user: AuthUser,
    Path(section_id): Path<Uuid>,
) -> HandlerResult {
    state
        .services
        .menu
        .delete_section(user.restaurant_id, section_id)
        .await?;
    Ok(no_content_response())
}

pub async fn add_section_option(
    State(state): State<AppState>,
    user: AuthUser,
    Path(section_id): Path<Uuid>,
    Json(request): Json<SectionOptionRequest>,
) -> HandlerResult {
    let option = state
        .services
        .menu
        .add_section_option(user.restaurant_id, section_id, request)
        .await?;
    Ok(created_response(option))
}

pub async fn update_section_option(
    State(state): State<AppState>,
    user: AuthUser,
    Path(option_id): Path<Uuid>,
    Json(request): Json<SectionOptionRequest>,
) -> HandlerResult {
    let option = state
        .services
        .menu
        .update_section_option(user.restaurant_id, option_id, request)
        .await?;
    Ok(success_response(option))
}

pub async fn delete_section_option(
    State(state): State<AppState>,
    user: AuthUser,
    Path(option_id): Path<Uuid>,
) -> HandlerResult {
    state
        .services
        .menu
        .delete_section_option(user.restaurant_id, option_id)
        .await?;
    Ok(no_content_response())
}

// Combos

pub async fn list_combos(State(state): State<AppState>, user: AuthUser) -> HandlerResult {
    let combos = state.services.menu.list_combos(user.restaurant_id).await?;
    Ok(success_response(combos))
}

pub async fn get_combo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(combo_id): Path<Uuid>,
) -> HandlerResult {
    let combo = state
        .services
        .menu
        .get_combo(user.restaurant_id, combo_id)
        .await?;
    Ok(success_response(combo))
}

#[utoipa::path(
    post,
    path = "/restaurant/menu/combos",
    summary = "Create combo",
    request_body = ComboRequest,
    responses(
        (status = 201, description = "Combo created with its items", body = crate::services::menu::views::ComboView),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "menu"
)]
pub async fn create_combo(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ComboRequest>,
) -> HandlerResult {
    let combo = state
        .services
        .menu
        .create_combo(user.restaurant_id, request)
        .await?;
    Ok(created_response(combo))
}

pub async fn update_combo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(combo_id): Path<Uuid>,
    Json(request): Json<ComboRequest>,
) -> HandlerResult {
    let combo = state
        .services
        .menu
        .update_combo(user.restaurant_id, combo_id, request)
        .await?;
    Ok(success_response(combo))
}

pub async fn delete_combo(
    State(state): State<AppState>,
    user: AuthUser,
    Path(combo_id): Path<Uuid>,
) -> HandlerResult {
    state
        .services
        .menu
        .delete_combo(user.restaurant_id, combo_id)
        .await?;
    Ok(no_content_response())
}

// Badge types

pub async fn list_badge_types(State(state): State<AppState>, user: AuthUser) -> HandlerResult {
    let badge_types = state.services.menu.list_badge_types(user.restaurant_id).await?;
    Ok(success_response(badge_types))
}

pub async fn create_badge_type(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<BadgeTypeRequest>,
) -> HandlerResult {
    let badge_type = state
        .services
        .menu
        .create_badge_type(user.restaurant_id, request)
        .await?;
    Ok(created_response(badge_type))
}

pub async fn update_badge_type(
    State(state): State<AppState>,
    user: AuthUser,
    Path(badge_type_id): Path<Uuid>,
    Json(request): Json<BadgeTypeRequest>,
) -> HandlerResult {
    let badge_type = state
        .services
        .menu
        .update_badge_type(user.restaurant_id, badge_type_id, request)
        .await?;
    Ok(success_response(badge_type))
}

pub async fn delete_badge_type(
    State(state): State<AppState>,
    user: AuthUser,
    Path(badge_type_id): Path<Uuid>,
) -> HandlerResult {
    state
        .services
        .menu
        .delete_badge_type(user.restaurant_id, badge_type_id)
        .await?;
    Ok(no_content_response())
}

// Sort order

#[utoipa::path(
    post,
    path = "/restaurant/menu/reorder/{scope}/{parent_id}",
    summary = "Reorder a collection",
    description = "Submits the full set of a parent's children with their new positions. \
        Positions are rewritten as 1..n in one transaction.",
    params(
        ("scope" = SortScope, Path, description = "Collection to reorder"),
        ("parent_id" = Uuid, Path, description = "Restaurant, category, product, section, combo or promotion owning the collection"),
    ),
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "Positions applied", body = Vec<SortEntry>),
        (status = 404, description = "Parent not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Batch does not match the parent's children", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "menu"
)]
pub async fn reorder(
    State(state): State<AppState>,
    user: AuthUser,
    Path((scope, parent_id)): Path<(SortScope, Uuid)>,
    Json(request): Json<ReorderRequest>,
) -> HandlerResult {
    let applied = state
        .services
        .reorder
        .reorder(user.restaurant_id, scope, parent_id, &request.items)
        .await?;
    Ok(message_response(applied, "Order updated"))
}
