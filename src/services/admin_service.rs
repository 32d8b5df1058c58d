use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::{
        admin::LowStockQuery,
        orders::{OrderList, OrderWithItems, UpdateOrderStatusRequest},
        products::{InventoryAdjustRequest, ProductDto, ProductList},
        users::{AdminUpdateUserRequest, ChangeRoleRequest, UserList, UserProfile},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderStatus, Role, User},
    response::{ApiResponse, Meta},
    routes::params::{AdminOrderQuery, ProductSortBy, SortOrder, UserListQuery},
    services::{order_service::parse_status_filter, product_service::normalize_code},
    state::AppState,
    store::{OrderFilter, ProductFilter, UserFilter},
    validation::{ValidationErrors, validate_name, validate_phone},
};

pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

pub(crate) fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN))
        .and_utc()
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: AdminOrderQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user, &state.config.auth)?;
    let (page, limit, offset) = query.pagination().normalize();

    let filter = OrderFilter {
        user_id: None,
        status: parse_status_filter(query.status.as_deref())?,
        email: query
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty()),
        from: query.from.map(start_of_day),
        to: query.to.map(end_of_day),
        sort_order: query.sort_order.unwrap_or_default(),
        limit,
        offset,
    };
    let result = state.store.list_orders(&filter).await?;

    Ok(ApiResponse::success(
        "Orders",
        OrderList {
            items: result.items,
        },
        Some(Meta::new(page, limit, result.total)),
    ))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user, &state.config.auth)?;
    let order = state
        .store
        .find_order(id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Ok", order, None))
}

/// Staff may move an order to any status; stock is left as is.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user, &state.config.auth)?;
    let status: OrderStatus = payload.status.parse()?;

    let order = state.store.update_order_status(id, status).await?;
    tracing::info!(order_id = %id, status = %status, "order status updated");

    if let Err(err) = log_audit(
        &state.store,
        Some(user.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": id, "status": status.as_str() })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Order status updated", order, None))
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user, &state.config.auth)?;
    let (page, limit, offset) = query.pagination().normalize();
    let threshold = query
        .threshold
        .unwrap_or(state.config.low_stock_threshold)
        .max(0);

    let filter = ProductFilter {
        max_stock: Some(threshold),
        sort_by: ProductSortBy::Name,
        sort_order: SortOrder::Asc,
        limit,
        offset,
        ..ProductFilter::default()
    };
    let result = state.store.list_products(&filter).await?;
    let items = result.items.into_iter().map(ProductDto::from).collect();

    Ok(ApiResponse::success(
        "Low stock products",
        ProductList { items },
        Some(Meta::new(page, limit, result.total)),
    ))
}

/// Relative stock change; the result may not drop below zero.
pub async fn adjust_inventory(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<ProductDto>> {
    ensure_admin(user, &state.config.auth)?;
    if payload.delta == 0 {
        return Err(AppError::BadRequest("Delta must be non-zero".into()));
    }

    let product = state
        .store
        .adjust_stock(&normalize_code(id), payload.delta)
        .await?;

    if let Err(err) = log_audit(
        &state.store,
        Some(user.user_id),
        "inventory_adjust",
        Some("products"),
        Some(serde_json::json!({
            "product_id": product.id,
            "delta": payload.delta,
            "stock": product.stock,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Inventory adjusted", product.into(), None))
}

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    query: UserListQuery,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user, &state.config.auth)?;
    let (page, limit, offset) = query.pagination().normalize();
    let role = query
        .role
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::parse::<Role>)
        .transpose()?;

    let filter = UserFilter {
        role,
        search: query
            .q
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty()),
        limit,
        offset,
    };
    let result = state.store.list_users(&filter).await?;
    let items = result.items.into_iter().map(UserProfile::from).collect();

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(page, limit, result.total)),
    ))
}

async fn user_by_email(state: &AppState, email: &str) -> AppResult<User> {
    state
        .store
        .find_user_by_email(email)
        .await?
        .ok_or(AppError::NotFound)
}

/// Target of an admin mutation: protected accounts are off limits.
async fn mutable_user(state: &AppState, email: &str) -> AppResult<User> {
    let target = user_by_email(state, email).await?;
    if target.protected {
        return Err(AppError::ProtectedAccount);
    }
    Ok(target)
}

pub async fn get_user(
    state: &AppState,
    user: &AuthUser,
    email: &str,
) -> AppResult<ApiResponse<UserProfile>> {
    ensure_admin(user, &state.config.auth)?;
    let target = user_by_email(state, email).await?;
    Ok(ApiResponse::success("User", target.into(), None))
}

pub async fn update_user(
    state: &AppState,
    user: &AuthUser,
    email: &str,
    payload: AdminUpdateUserRequest,
) -> AppResult<ApiResponse<UserProfile>> {
    ensure_admin(user, &state.config.auth)?;
    let mut target = mutable_user(state, email).await?;
    let mut errors = ValidationErrors::new();

    if let Some(name) = payload.name {
        if errors.check("name", validate_name(&name)).is_some() {
            target.name = name.trim().to_string();
        }
    }
    if let Some(phone) = payload.phone {
        let phone = phone.trim();
        if phone.is_empty() {
            target.phone = None;
        } else if errors.check("phone", validate_phone(phone)).is_some() {
            target.phone = Some(phone.to_string());
        }
    }
    if let Some(discount) = payload.discount_percent {
        if (0..=100).contains(&discount) {
            target.discount_percent = discount;
        } else {
            errors.add("discount_percent", "discount must be between 0 and 100");
        }
    }
    errors.into_result()?;

    if let Some(role) = payload.role {
        guard_role_change(user, &target, role)?;
        target.role = role;
    }

    let target = state.store.update_user(target).await?;

    if let Err(err) = log_audit(
        &state.store,
        Some(user.user_id),
        "user_update",
        Some("users"),
        Some(serde_json::json!({ "user_id": target.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("User updated", target.into(), None))
}

fn guard_role_change(actor: &AuthUser, target: &User, role: Role) -> AppResult<()> {
    if role == Role::System {
        return Err(AppError::BadRequest(
            "The system role cannot be assigned".into(),
        ));
    }
    if target.id == actor.user_id && role != target.role {
        return Err(AppError::BadRequest("You cannot change your own role".into()));
    }
    Ok(())
}

pub async fn change_role(
    state: &AppState,
    user: &AuthUser,
    email: &str,
    payload: ChangeRoleRequest,
) -> AppResult<ApiResponse<UserProfile>> {
    ensure_admin(user, &state.config.auth)?;
    let mut target = mutable_user(state, email).await?;
    guard_role_change(user, &target, payload.role)?;

    let previous = target.role;
    target.role = payload.role;
    let target = state.store.update_user(target).await?;
    tracing::info!(user_id = %target.id, from = %previous, to = %target.role, "role changed");

    if let Err(err) = log_audit(
        &state.store,
        Some(user.user_id),
        "user_role_change",
        Some("users"),
        Some(serde_json::json!({
            "user_id": target.id,
            "from": previous.as_str(),
            "to": target.role.as_str(),
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Role updated", target.into(), None))
}

pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    email: &str,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user, &state.config.auth)?;
    let target = mutable_user(state, email).await?;
    if target.id == user.user_id {
        return Err(AppError::BadRequest("You cannot delete your own account".into()));
    }

    if !state.store.delete_user(target.id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(user_id = %target.id, "user deleted");

    if let Err(err) = log_audit(
        &state.store,
        Some(user.user_id),
        "user_delete",
        Some("users"),
        Some(serde_json::json!({ "user_id": target.id, "email": target.email })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::done("User deleted"))
}
