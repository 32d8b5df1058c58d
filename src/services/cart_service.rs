use uuid::Uuid;

use crate::{
    cart::{Cart, CartError, CartOwner},
    dto::cart::{AddToCartRequest, CartItemDto, CartLineUpdate, CartView, UpdateCartItemRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, CART_SESSION_HEADER},
    models::Product,
    pricing::price_lines,
    response::ApiResponse,
    services::product_service::normalize_code,
    state::AppState,
};

/// Signed-in users own their cart; guests are keyed by their session header.
pub fn resolve_owner(user: Option<&AuthUser>, session: Option<Uuid>) -> Option<CartOwner> {
    match (user, session) {
        (Some(user), _) => Some(CartOwner::User(user.user_id)),
        (None, Some(session)) => Some(CartOwner::Guest(session)),
        (None, None) => None,
    }
}

fn require_owner(user: Option<&AuthUser>, session: Option<Uuid>) -> AppResult<CartOwner> {
    resolve_owner(user, session).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Sign in or send an {CART_SESSION_HEADER} header to use the cart"
        ))
    })
}

async fn find_product(state: &AppState, product_id: &str) -> AppResult<Product> {
    state
        .store
        .find_product(&normalize_code(product_id))
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn view_cart(
    state: &AppState,
    user: Option<&AuthUser>,
    session: Option<Uuid>,
) -> AppResult<ApiResponse<CartView>> {
    let cart = match resolve_owner(user, session) {
        Some(owner) => state.store.load_cart(owner).await?.unwrap_or_default(),
        None => Cart::default(),
    };

    let discount_percent = match user {
        Some(user) => state
            .store
            .find_user(user.user_id)
            .await?
            .map(|u| u.discount_percent)
            .unwrap_or(0),
        None => 0,
    };

    let mut items = Vec::with_capacity(cart.lines.len());
    for line in &cart.lines {
        // Lines whose product left the catalog are not shown.
        let Some(product) = state.store.find_product(&line.product_id).await? else {
            continue;
        };
        items.push(CartItemDto {
            line_total: product.price * i64::from(line.quantity),
            quantity: line.quantity,
            personalization: line.personalization.clone(),
            product: product.into(),
        });
    }

    let summary = price_lines(
        items.iter().map(|item| (item.product.price, item.quantity)),
        discount_percent,
    )?;
    let item_count = items.iter().map(|item| i64::from(item.quantity)).sum();

    Ok(ApiResponse::ok(
        "Cart",
        CartView {
            items,
            item_count,
            summary,
        },
    ))
}

pub async fn add_item(
    state: &AppState,
    user: Option<&AuthUser>,
    session: Option<Uuid>,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartLineUpdate>> {
    let owner = require_owner(user, session)?;
    let product = find_product(state, &payload.product_id).await?;

    let mut cart = state.store.load_cart(owner).await?.unwrap_or_default();
    let outcome = cart.add(&product, payload.quantity, payload.personalization.as_deref())?;
    state.store.save_cart(owner, &cart).await?;

    let message = if outcome.capped {
        tracing::debug!(product_id = %product.id, stock = product.stock, "cart line capped at stock");
        "Added to cart, limited by available stock"
    } else {
        "Added to cart"
    };
    Ok(ApiResponse::ok(
        message,
        CartLineUpdate {
            product_id: product.id,
            quantity: outcome.quantity,
            capped: outcome.capped,
        },
    ))
}

pub async fn update_item(
    state: &AppState,
    user: Option<&AuthUser>,
    session: Option<Uuid>,
    product_id: &str,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartLineUpdate>> {
    let owner = require_owner(user, session)?;
    let product_id = normalize_code(product_id);

    let mut cart = state.store.load_cart(owner).await?.unwrap_or_default();
    if cart.line(&product_id).is_none() {
        return Err(CartError::NotInCart(product_id).into());
    }

    let quantity = match state.store.find_product(&product_id).await? {
        Some(product) => cart.set_quantity(&product, payload.quantity)?,
        None => {
            cart.remove(&product_id);
            0
        }
    };
    state.store.save_cart(owner, &cart).await?;

    let message = if quantity == 0 {
        "Removed from cart"
    } else {
        "Cart updated"
    };
    Ok(ApiResponse::ok(
        message,
        CartLineUpdate {
            capped: payload.quantity > quantity,
            product_id,
            quantity,
        },
    ))
}

pub async fn remove_item(
    state: &AppState,
    user: Option<&AuthUser>,
    session: Option<Uuid>,
    product_id: &str,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let owner = require_owner(user, session)?;
    let product_id = normalize_code(product_id);

    let mut cart = state.store.load_cart(owner).await?.unwrap_or_default();
    if !cart.remove(&product_id) {
        return Err(CartError::NotInCart(product_id).into());
    }
    state.store.save_cart(owner, &cart).await?;
    Ok(ApiResponse::done("Removed from cart"))
}

pub async fn clear_cart(
    state: &AppState,
    user: Option<&AuthUser>,
    session: Option<Uuid>,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let owner = require_owner(user, session)?;
    state.store.delete_cart(owner).await?;
    Ok(ApiResponse::done("Cart cleared"))
}
