use chrono::Utc;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    cart::CartOwner,
    dto::orders::{CheckoutRequest, OrderList, OrderWithItems},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem, OrderStatus, PaymentMethod, User},
    pricing::price_lines,
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    state::AppState,
    store::OrderFilter,
    validation::{CardInput, ValidationErrors, validate_card},
};

/// Picks the delivery address: a saved one, a new one (which the caller
/// then saves), or the first saved address. Returns the address and whether
/// it is new.
fn resolve_delivery_address(user: &User, requested: Option<&str>) -> AppResult<(String, bool)> {
    match requested.map(str::trim).filter(|a| !a.is_empty()) {
        Some(address) => {
            let saved = user
                .addresses
                .iter()
                .find(|a| a.eq_ignore_ascii_case(address));
            Ok(match saved {
                Some(saved) => (saved.clone(), false),
                None => (address.to_string(), true),
            })
        }
        None => user
            .addresses
            .first()
            .map(|a| (a.clone(), false))
            .ok_or_else(|| {
                ValidationErrors::single("delivery_address", "a delivery address is required")
                    .into()
            }),
    }
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let mut account = state
        .store
        .find_user(user.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Session is no longer valid".into()))?;

    let owner = CartOwner::User(account.id);
    let cart = state.store.load_cart(owner).await?.unwrap_or_default();
    if cart.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let (delivery_address, new_address) =
        resolve_delivery_address(&account, payload.delivery_address.as_deref())?;

    let card_last4 = match payload.payment_method {
        PaymentMethod::Cash => None,
        PaymentMethod::Card => {
            let card = payload.card.as_ref().ok_or_else(|| {
                AppError::from(ValidationErrors::single("card", "card details are required"))
            })?;
            let input = CardInput {
                number: &card.number,
                expiry: &card.expiry,
                holder: &card.holder,
                cvv: &card.cvv,
            };
            Some(validate_card(&input, Utc::now().date_naive())?)
        }
    };

    let order_id = Uuid::new_v4();
    let mut items = Vec::with_capacity(cart.lines.len());
    for line in &cart.lines {
        let product = state
            .store
            .find_product(&line.product_id)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!("Product {} is no longer available", line.product_id))
            })?;
        items.push(OrderItem {
            id: Uuid::new_v4(),
            order_id,
            image: Some(product.image_url()),
            product_id: product.id,
            name: product.name,
            quantity: line.quantity,
            unit_price: product.price,
            personalization: line.personalization.clone(),
        });
    }

    let price = price_lines(
        items.iter().map(|item| (item.unit_price, item.quantity)),
        account.discount_percent,
    )?;

    let now = Utc::now();
    let order = OrderWithItems {
        order: Order {
            id: order_id,
            user_id: account.id,
            user_email: account.email.clone(),
            subtotal: price.subtotal,
            discount: price.discount,
            total: price.total,
            status: OrderStatus::Pending,
            payment_method: payload.payment_method,
            card_last4,
            delivery_address: delivery_address.clone(),
            created_at: now,
            updated_at: now,
        },
        items,
    };

    let order = state.store.place_order(order, owner).await?;

    if new_address {
        account.addresses.push(delivery_address);
        if let Err(err) = state.store.update_user(account).await {
            tracing::warn!(error = %err, "saving new delivery address failed");
        }
    }

    tracing::info!(
        order_id = %order.order.id,
        user_id = %user.user_id,
        total = order.order.total,
        "order placed"
    );
    if let Err(err) = log_audit(
        &state.store,
        Some(user.user_id),
        "order_checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.order.id, "total": order.order.total })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Order created", order, None))
}

pub(crate) fn parse_status_filter(status: Option<&str>) -> AppResult<Option<OrderStatus>> {
    status
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .transpose()
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let filter = OrderFilter {
        user_id: Some(user.user_id),
        status: parse_status_filter(query.status.as_deref())?,
        sort_order: query.sort_order.unwrap_or_default(),
        limit,
        offset,
        ..OrderFilter::default()
    };
    let result = state.store.list_orders(&filter).await?;
    Ok(ApiResponse::success(
        "Ok",
        OrderList {
            items: result.items,
        },
        Some(Meta::new(page, limit, result.total)),
    ))
}

async fn own_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<OrderWithItems> {
    state
        .store
        .find_order(id)
        .await?
        .filter(|order| order.order.user_id == user.user_id)
        .ok_or(AppError::NotFound)
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = own_order(state, user, id).await?;
    Ok(ApiResponse::success("Ok", order, None))
}

/// Cancels a pending order of the caller; stock is put back.
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    own_order(state, user, id).await?;
    let order = state.store.cancel_order(id).await?;

    tracing::info!(order_id = %id, user_id = %user.user_id, "order cancelled");
    if let Err(err) = log_audit(
        &state.store,
        Some(user.user_id),
        "order_cancel",
        Some("orders"),
        Some(serde_json::json!({ "order_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Order cancelled", order, None))
}
