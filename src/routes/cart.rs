use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};

use crate::{
    dto::cart::{AddToCartRequest, CartLineUpdate, CartView, UpdateCartItemRequest},
    error::AppResult,
    middleware::auth::{CartSession, MaybeAuthUser},
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(view_cart).post(add_to_cart).delete(clear_cart))
        .route("/{product_id}", put(update_cart_item).delete(remove_from_cart))
}

#[utoipa::path(
    get,
    path = "/api/carrito",
    params(
        ("x-cart-session" = Option<String>, Header, description = "Guest cart id (UUID) when not signed in")
    ),
    responses(
        (status = 200, description = "Cart with priced lines", body = ApiResponse<CartView>),
        (status = 401, description = "Invalid token"),
    ),
    security((), ("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn view_cart(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    CartSession(session): CartSession,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::view_cart(&state, user.as_ref(), session).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/carrito",
    request_body = AddToCartRequest,
    params(
        ("x-cart-session" = Option<String>, Header, description = "Guest cart id (UUID) when not signed in")
    ),
    responses(
        (status = 200, description = "Line added or merged", body = ApiResponse<CartLineUpdate>),
        (status = 400, description = "Bad quantity, out of stock or no cart owner"),
        (status = 404, description = "Product not found"),
    ),
    security((), ("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    CartSession(session): CartSession,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartLineUpdate>>> {
    let resp = cart_service::add_item(&state, user.as_ref(), session, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/carrito/{product_id}",
    request_body = UpdateCartItemRequest,
    params(
        ("product_id" = String, Path, description = "Product code"),
        ("x-cart-session" = Option<String>, Header, description = "Guest cart id (UUID) when not signed in")
    ),
    responses(
        (status = 200, description = "Quantity set; zero removes the line", body = ApiResponse<CartLineUpdate>),
        (status = 404, description = "Product not in cart"),
    ),
    security((), ("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_cart_item(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    CartSession(session): CartSession,
    Path(product_id): Path<String>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> AppResult<Json<ApiResponse<CartLineUpdate>>> {
    let resp =
        cart_service::update_item(&state, user.as_ref(), session, &product_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/carrito/{product_id}",
    params(
        ("product_id" = String, Path, description = "Product code"),
        ("x-cart-session" = Option<String>, Header, description = "Guest cart id (UUID) when not signed in")
    ),
    responses(
        (status = 200, description = "Line removed"),
        (status = 404, description = "Product not in cart"),
    ),
    security((), ("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    CartSession(session): CartSession,
    Path(product_id): Path<String>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = cart_service::remove_item(&state, user.as_ref(), session, &product_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/carrito",
    params(
        ("x-cart-session" = Option<String>, Header, description = "Guest cart id (UUID) when not signed in")
    ),
    responses(
        (status = 200, description = "Cart emptied"),
    ),
    security((), ("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    CartSession(session): CartSession,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = cart_service::clear_cart(&state, user.as_ref(), session).await?;
    Ok(Json(resp))
}
