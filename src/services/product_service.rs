use chrono::Utc;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{
        CategoryList, CreateProductRequest, ProductDto, ProductList, SetStockRequest,
        UpdateProductRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::ProductQuery,
    state::AppState,
    store::ProductFilter,
    validation::{MAX_PRODUCT_NAME_CHARS, ValidationErrors, validate_product_code},
};

const CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// `P` followed by five base-36 characters.
fn generate_product_code() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    let mut code = String::from("P");
    for byte in bytes.iter().take(5) {
        code.push(char::from(CODE_ALPHABET[usize::from(*byte) % CODE_ALPHABET.len()]));
    }
    code
}

pub(crate) fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn validate_product(product: &Product) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.check("id", validate_product_code(&product.id));
    let name = product.name.trim();
    if name.is_empty() {
        errors.add("name", "name is required");
    } else if name.chars().count() > MAX_PRODUCT_NAME_CHARS {
        errors.add(
            "name",
            format!("name cannot exceed {MAX_PRODUCT_NAME_CHARS} characters"),
        );
    }
    if product.price <= 0 {
        errors.add("price", "price must be greater than 0");
    }
    if product.stock < 0 {
        errors.add("stock", "stock cannot be negative");
    }
    if product.category.trim().is_empty() {
        errors.add("category", "category is required");
    }
    errors
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
        if min > max {
            return Err(AppError::BadRequest(
                "min_price must not exceed max_price".into(),
            ));
        }
    }
    let (page, limit, offset) = query.pagination().normalize();
    let filter = ProductFilter {
        category: non_blank(query.category),
        search: non_blank(query.q),
        min_price: query.min_price,
        max_price: query.max_price,
        in_stock: query.in_stock.unwrap_or(false),
        max_stock: None,
        sort_by: query.sort_by.unwrap_or_default(),
        sort_order: query.sort_order.unwrap_or_default(),
        limit,
        offset,
    };
    let result = state.store.list_products(&filter).await?;
    let items = result.items.into_iter().map(ProductDto::from).collect();
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(Meta::new(page, limit, result.total)),
    ))
}

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items = state.store.list_categories().await?;
    let meta = Meta::whole(items.len());
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(meta),
    ))
}

pub async fn get_product(state: &AppState, id: &str) -> AppResult<ApiResponse<ProductDto>> {
    let product = state
        .store
        .find_product(&normalize_code(id))
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Product", product.into(), None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<ProductDto>> {
    ensure_admin(user, &state.config.auth)?;

    let id = match non_blank(payload.id) {
        Some(code) => normalize_code(&code),
        None => generate_product_code(),
    };
    let product = Product {
        id,
        name: payload.name.trim().to_string(),
        description: payload.description.trim().to_string(),
        price: payload.price,
        category: payload.category.trim().to_string(),
        stock: payload.stock,
        image: non_blank(payload.image),
        personalizable: payload.personalizable,
        created_at: Utc::now(),
    };
    validate_product(&product).into_result()?;

    let product = state.store.insert_product(product).await?;
    tracing::info!(product_id = %product.id, "product created");

    if let Err(err) = log_audit(
        &state.store,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Product created", product.into(), None))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<ProductDto>> {
    ensure_admin(user, &state.config.auth)?;

    let mut product = state
        .store
        .find_product(&normalize_code(id))
        .await?
        .ok_or(AppError::NotFound)?;

    if let Some(name) = payload.name {
        product.name = name.trim().to_string();
    }
    if let Some(description) = payload.description {
        product.description = description.trim().to_string();
    }
    if let Some(price) = payload.price {
        product.price = price;
    }
    if let Some(category) = payload.category {
        product.category = category.trim().to_string();
    }
    if let Some(stock) = payload.stock {
        product.stock = stock;
    }
    if let Some(image) = payload.image {
        product.image = non_blank(Some(image));
    }
    if let Some(personalizable) = payload.personalizable {
        product.personalizable = personalizable;
    }
    validate_product(&product).into_result()?;

    let product = state.store.update_product(product).await?;

    if let Err(err) = log_audit(
        &state.store,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Product updated", product.into(), None))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: &str,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user, &state.config.auth)?;
    let id = normalize_code(id);

    if !state.store.delete_product(&id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(product_id = %id, "product deleted");

    if let Err(err) = log_audit(
        &state.store,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::done("Product deleted"))
}

/// Absolute stock update.
pub async fn set_stock(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    payload: SetStockRequest,
) -> AppResult<ApiResponse<ProductDto>> {
    ensure_admin(user, &state.config.auth)?;
    if payload.stock < 0 {
        return Err(ValidationErrors::single("stock", "stock cannot be negative").into());
    }

    let mut product = state
        .store
        .find_product(&normalize_code(id))
        .await?
        .ok_or(AppError::NotFound)?;
    let previous = product.stock;
    product.stock = payload.stock;
    let product = state.store.update_product(product).await?;

    if let Err(err) = log_audit(
        &state.store,
        Some(user.user_id),
        "stock_set",
        Some("products"),
        Some(serde_json::json!({
            "product_id": product.id,
            "previous": previous,
            "stock": product.stock,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Stock updated", product.into(), None))
}
