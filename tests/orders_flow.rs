use std::sync::Arc;

use bakery_shop_api::{
    config::{AppConfig, StoreBackend},
    db::{create_pool, run_migrations},
    dto::{
        admin::LowStockQuery,
        cart::AddToCartRequest,
        orders::{CheckoutRequest, UpdateOrderStatusRequest},
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::{OrderStatus, PaymentMethod, Product, Role, User},
    services::{admin_service, auth_service::hash_password, cart_service, order_service},
    state::AppState,
    store::{OrderRepository, PgStore, ProductRepository, UserRepository},
};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

// Integration flow against Postgres: cart -> checkout -> cancel, then staff
// status change and low stock listing.
#[tokio::test]
async fn checkout_cancel_and_admin_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let (state, pool) = setup_state(&database_url).await?;

    let user = create_user(&state, Role::User, "ana@gmail.com").await?;
    let admin = create_user(&state, Role::Admin, "admin@admin.cl").await?;

    let product = state.store.insert_product(test_product("TT900")).await?;

    // Racing inserts of one key: one succeeds, the other is a conflict.
    let (first, second) = tokio::join!(
        state.store.insert_user(test_user(Role::User, "race@gmail.com")?),
        state.store.insert_user(test_user(Role::User, "RACE@gmail.com")?),
    );
    assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
    assert!(matches!(first.err().or(second.err()), Some(AppError::Conflict(_))));

    let (first, second) = tokio::join!(
        state.store.insert_product(test_product("TT901")),
        state.store.insert_product(test_product("TT901")),
    );
    assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
    assert!(matches!(first.err().or(second.err()), Some(AppError::Conflict(_))));

    cart_service::add_item(
        &state,
        Some(&user),
        None,
        AddToCartRequest {
            product_id: product.id.clone(),
            quantity: 2,
            personalization: Some("Feliz día".into()),
        },
    )
    .await?;

    let checkout = order_service::checkout(
        &state,
        &user,
        CheckoutRequest {
            delivery_address: Some("Av. Matta 100, Santiago".into()),
            payment_method: PaymentMethod::Cash,
            card: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(checkout.order.total, 2000);
    assert_eq!(checkout.items.len(), 1);
    assert_eq!(checkout.items[0].personalization.as_deref(), Some("Feliz día"));

    let stock = state.store.find_product(&product.id).await?.unwrap().stock;
    assert_eq!(stock, 8);

    // Cancelling puts the units back.
    let cancelled = order_service::cancel_order(&state, &user, checkout.order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    let stock = state.store.find_product(&product.id).await?.unwrap().stock;
    assert_eq!(stock, 10);

    let updated = admin_service::update_order_status(
        &state,
        &admin,
        checkout.order.id,
        UpdateOrderStatusRequest {
            status: "shipped".into(),
        },
    )
    .await?;
    assert_eq!(updated.data.unwrap().status, OrderStatus::Shipped);

    let stored = state.store.find_order(checkout.order.id).await?.unwrap();
    assert_eq!(stored.order.status, OrderStatus::Shipped);

    let audited: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM audit_logs WHERE action = 'order_status_update' AND user_id = $1",
    )
    .bind(admin.user_id)
    .fetch_one(&pool)
    .await?;
    assert_eq!(audited, 1);

    let low = admin_service::list_low_stock(
        &state,
        &admin,
        LowStockQuery {
            page: Some(1),
            per_page: Some(20),
            threshold: Some(10),
        },
    )
    .await?;
    assert!(
        low.data.unwrap().items.iter().any(|p| p.id == product.id),
        "expected product to appear in low-stock list"
    );

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<(AppState, PgPool)> {
    let pool = create_pool(database_url).await?;
    run_migrations(&pool).await?;

    // Clean tables between runs
    sqlx::query(
        "TRUNCATE TABLE order_items, orders, cart_items, audit_logs, products, users CASCADE",
    )
    .execute(&pool)
    .await?;

    let mut config = AppConfig::new("test-secret");
    config.backend = StoreBackend::Postgres;
    config.database_url = Some(database_url.to_string());
    Ok((AppState::new(Arc::new(PgStore::new(pool.clone())), config), pool))
}

fn test_product(id: &str) -> Product {
    Product {
        id: id.into(),
        name: "Torta de Prueba".into(),
        description: "Para pruebas".into(),
        price: 1000,
        category: "Tortas Circulares".into(),
        stock: 10,
        image: None,
        personalizable: true,
        created_at: Utc::now(),
    }
}

fn test_user(role: Role, email: &str) -> anyhow::Result<User> {
    Ok(User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        password_hash: hash_password("secret")?,
        name: "Test".into(),
        phone: None,
        birth_date: None,
        role,
        protected: false,
        discount_percent: 0,
        promo_code: None,
        is_student: false,
        addresses: Vec::new(),
        created_at: Utc::now(),
    })
}

async fn create_user(state: &AppState, role: Role, email: &str) -> anyhow::Result<AuthUser> {
    let user = state.store.insert_user(test_user(role, email)?).await?;

    Ok(AuthUser {
        user_id: user.id,
        email: user.email,
        role: user.role,
    })
}
