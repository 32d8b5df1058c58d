use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        admin::{
            DashboardSummary, LowStockQuery, SalesQuery, SalesSeries, StatusCount, TopProduct,
            TopProductsQuery,
        },
        orders::{OrderList, OrderWithItems, UpdateOrderStatusRequest},
        products::{
            CreateProductRequest, InventoryAdjustRequest, ProductDto, ProductList,
            SetStockRequest, UpdateProductRequest,
        },
        users::{AdminUpdateUserRequest, ChangeRoleRequest, UserList, UserProfile},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Order,
    response::ApiResponse,
    routes::params::{AdminOrderQuery, UserListQuery},
    services::{admin_service, product_service, report_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/productos", post(create_product))
        .route("/productos/{id}", put(update_product).delete(delete_product))
        .route("/productos/{id}/stock", patch(set_stock))
        .route("/inventario/stock-bajo", get(list_low_stock))
        .route("/inventario/{id}", patch(adjust_inventory))
        .route("/usuarios", get(list_users))
        .route(
            "/usuarios/{email}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/usuarios/{email}/rol", patch(change_role))
        .route("/pedidos", get(list_all_orders))
        .route("/pedidos/{id}", get(get_order_admin))
        .route("/pedidos/{id}/estado", patch(update_order_status))
        .route("/estadisticas/resumen", get(summary))
        .route("/estadisticas/ventas", get(sales))
        .route("/estadisticas/productos-populares", get(popular_products))
        .route("/estadisticas/pedidos-por-estado", get(orders_by_status))
}

#[utoipa::path(
    post,
    path = "/api/admin/productos",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<ProductDto>),
        (status = 400, description = "Invalid fields"),
        (status = 403, description = "Admins only"),
        (status = 409, description = "Product code already exists"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ProductDto>>)> {
    let resp = product_service::create_product(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/admin/productos/{id}",
    request_body = UpdateProductRequest,
    params(
        ("id" = String, Path, description = "Product code")
    ),
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<ProductDto>),
        (status = 400, description = "Invalid fields"),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<ProductDto>>> {
    let resp = product_service::update_product(&state, &user, &id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/productos/{id}",
    params(
        ("id" = String, Path, description = "Product code")
    ),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_product(&state, &user, &id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/productos/{id}/stock",
    request_body = SetStockRequest,
    params(
        ("id" = String, Path, description = "Product code")
    ),
    responses(
        (status = 200, description = "Stock set", body = ApiResponse<ProductDto>),
        (status = 400, description = "Negative stock"),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn set_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<SetStockRequest>,
) -> AppResult<Json<ApiResponse<ProductDto>>> {
    let resp = product_service::set_stock(&state, &user, &id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/inventario/stock-bajo",
    params(LowStockQuery),
    responses(
        (status = 200, description = "Products at or below the threshold", body = ApiResponse<ProductList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LowStockQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = admin_service::list_low_stock(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/inventario/{id}",
    request_body = InventoryAdjustRequest,
    params(
        ("id" = String, Path, description = "Product code")
    ),
    responses(
        (status = 200, description = "Stock adjusted by delta", body = ApiResponse<ProductDto>),
        (status = 400, description = "Zero delta or stock would go negative"),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn adjust_inventory(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<InventoryAdjustRequest>,
) -> AppResult<Json<ApiResponse<ProductDto>>> {
    let resp = admin_service::adjust_inventory(&state, &user, &id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/usuarios",
    params(UserListQuery),
    responses(
        (status = 200, description = "Accounts", body = ApiResponse<UserList>),
        (status = 403, description = "Admins only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let resp = admin_service::list_users(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/usuarios/{email}",
    params(
        ("email" = String, Path, description = "Account email")
    ),
    responses(
        (status = 200, description = "Account", body = ApiResponse<UserProfile>),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(email): Path<String>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let resp = admin_service::get_user(&state, &user, &email).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/usuarios/{email}",
    request_body = AdminUpdateUserRequest,
    params(
        ("email" = String, Path, description = "Account email")
    ),
    responses(
        (status = 200, description = "Account updated", body = ApiResponse<UserProfile>),
        (status = 403, description = "Protected account"),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(email): Path<String>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let resp = admin_service::update_user(&state, &user, &email, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/usuarios/{email}",
    params(
        ("email" = String, Path, description = "Account email")
    ),
    responses(
        (status = 200, description = "Account deleted"),
        (status = 400, description = "Cannot delete your own account"),
        (status = 403, description = "Protected account"),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(email): Path<String>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = admin_service::delete_user(&state, &user, &email).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/usuarios/{email}/rol",
    request_body = ChangeRoleRequest,
    params(
        ("email" = String, Path, description = "Account email")
    ),
    responses(
        (status = 200, description = "Role changed", body = ApiResponse<UserProfile>),
        (status = 400, description = "Role cannot be assigned"),
        (status = 403, description = "Protected account"),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn change_role(
    State(state): State<AppState>,
    user: AuthUser,
    Path(email): Path<String>,
    Json(payload): Json<ChangeRoleRequest>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let resp = admin_service::change_role(&state, &user, &email, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/pedidos",
    params(AdminOrderQuery),
    responses(
        (status = 200, description = "All orders", body = ApiResponse<OrderList>),
        (status = 400, description = "Unknown status"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AdminOrderQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = admin_service::list_all_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/pedidos/{id}",
    params(
        ("id" = Uuid, Path, description = "Order id")
    ),
    responses(
        (status = 200, description = "Order with items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = admin_service::get_order_admin(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/pedidos/{id}/estado",
    request_body = UpdateOrderStatusRequest,
    params(
        ("id" = Uuid, Path, description = "Order id")
    ),
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<Order>),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = admin_service::update_order_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/estadisticas/resumen",
    responses(
        (status = 200, description = "Headline figures", body = ApiResponse<DashboardSummary>)
    ),
    security(("bearer_auth" = [])),
    tag = "Stats"
)]
pub async fn summary(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<DashboardSummary>>> {
    let resp = report_service::summary(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/estadisticas/ventas",
    params(SalesQuery),
    responses(
        (status = 200, description = "Revenue per period", body = ApiResponse<SalesSeries>),
        (status = 400, description = "Invalid date range"),
    ),
    security(("bearer_auth" = [])),
    tag = "Stats"
)]
pub async fn sales(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SalesQuery>,
) -> AppResult<Json<ApiResponse<SalesSeries>>> {
    let resp = report_service::sales(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/estadisticas/productos-populares",
    params(TopProductsQuery),
    responses(
        (status = 200, description = "Best sellers by units", body = ApiResponse<Vec<TopProduct>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Stats"
)]
pub async fn popular_products(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TopProductsQuery>,
) -> AppResult<Json<ApiResponse<Vec<TopProduct>>>> {
    let resp = report_service::popular_products(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/estadisticas/pedidos-por-estado",
    responses(
        (status = 200, description = "Order count per status", body = ApiResponse<Vec<StatusCount>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Stats"
)]
pub async fn orders_by_status(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<StatusCount>>>> {
    let resp = report_service::status_breakdown(&state, &user).await?;
    Ok(Json(resp))
}
