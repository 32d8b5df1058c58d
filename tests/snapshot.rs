use std::sync::Arc;

use bakery_shop_api::{
    cart::{Cart, CartOwner},
    config::AppConfig,
    dto::{
        orders::OrderWithItems,
        users::{AddressRequest, ChangePasswordRequest},
    },
    middleware::auth::AuthUser,
    models::{Order, OrderItem, OrderStatus, PaymentMethod},
    seed::{ADMIN_ACCOUNT_EMAIL, SeedAccounts, seed_store},
    services::user_service,
    state::AppState,
    store::{
        CartRepository, DynStore, MemoryStore, OrderRepository, ProductRepository, UserRepository,
    },
};
use chrono::Utc;
use uuid::Uuid;

#[tokio::test]
async fn state_survives_a_restart() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("store.json");

    let guest = CartOwner::Guest(Uuid::new_v4());
    {
        let store = MemoryStore::with_snapshot(&path).await?;
        let store: DynStore = Arc::new(store);
        let report = seed_store(&store, &SeedAccounts::default()).await?;
        assert_eq!(report.users_created, 2);
        assert!(report.products_created > 0);

        let cake = store.find_product("TC001").await?.unwrap();
        let mut cart = Cart::default();
        cart.add(&cake, 2, Some("Feliz cumple"))?;
        store.save_cart(guest, &cart).await?;
        store.adjust_stock("TC001", -3).await?;
    }

    let store = MemoryStore::with_snapshot(&path).await?;
    assert_eq!(store.find_product("TC001").await?.unwrap().stock, 7);
    assert!(store.find_user_by_email(ADMIN_ACCOUNT_EMAIL).await?.is_some());
    let cart = store.load_cart(guest).await?.unwrap();
    assert_eq!(cart.line("TC001").unwrap().quantity, 2);

    // Seeding again does not duplicate anything.
    let store: DynStore = Arc::new(store);
    let report = seed_store(&store, &SeedAccounts::default()).await?;
    assert_eq!(report.users_created, 0);
    assert_eq!(report.products_created, 0);
    Ok(())
}

#[tokio::test]
async fn failed_snapshot_write_changes_nothing() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let data = dir.path().join("data");
    std::fs::create_dir(&data)?;
    let store: DynStore = Arc::new(MemoryStore::with_snapshot(data.join("store.json")).await?);
    seed_store(&store, &SeedAccounts::default()).await?;

    let guest = CartOwner::Guest(Uuid::new_v4());
    let cake = store.find_product("TC001").await?.unwrap();
    let mut cart = Cart::default();
    cart.add(&cake, 2, None)?;
    store.save_cart(guest, &cart).await?;

    std::fs::remove_dir_all(&data)?;

    let now = Utc::now();
    let order_id = Uuid::new_v4();
    let order = OrderWithItems {
        order: Order {
            id: order_id,
            user_id: Uuid::new_v4(),
            user_email: "ana@gmail.com".into(),
            subtotal: cake.price * 2,
            discount: 0,
            total: cake.price * 2,
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::Cash,
            card_last4: None,
            delivery_address: "Calle 1, Santiago".into(),
            created_at: now,
            updated_at: now,
        },
        items: vec![OrderItem {
            id: Uuid::new_v4(),
            order_id,
            product_id: cake.id.clone(),
            name: cake.name.clone(),
            image: None,
            quantity: 2,
            unit_price: cake.price,
            personalization: None,
        }],
    };
    assert!(store.place_order(order, guest).await.is_err());
    assert!(store.adjust_stock("TC001", -1).await.is_err());

    assert!(store.find_order(order_id).await?.is_none());
    assert_eq!(store.find_product("TC001").await?.unwrap().stock, cake.stock);
    assert_eq!(store.load_cart(guest).await?.unwrap().line("TC001").unwrap().quantity, 2);
    Ok(())
}

#[tokio::test]
async fn missing_snapshot_starts_empty() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = MemoryStore::with_snapshot(dir.path().join("absent.json")).await?;
    assert!(store.find_product("TC001").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn unknown_snapshot_version_is_refused() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("store.json");
    std::fs::write(
        &path,
        r#"{"version":99,"products":[],"users":[],"carts":[],"orders":[]}"#,
    )?;
    assert!(MemoryStore::with_snapshot(&path).await.is_err());

    std::fs::write(&path, "not json")?;
    assert!(MemoryStore::with_snapshot(&path).await.is_err());
    Ok(())
}

#[tokio::test]
async fn mutations_leave_an_audit_trail() -> anyhow::Result<()> {
    let memory = Arc::new(MemoryStore::new());
    let store: DynStore = memory.clone();
    seed_store(&store, &SeedAccounts::default()).await?;
    let admin = store.find_user_by_email(ADMIN_ACCOUNT_EMAIL).await?.unwrap();

    let state = AppState::new(store, AppConfig::new("secret"));
    let user = AuthUser {
        user_id: admin.id,
        email: admin.email.clone(),
        role: admin.role,
    };
    user_service::add_address(
        &state,
        &user,
        AddressRequest {
            address: "Av. Matta 100, Santiago".into(),
        },
    )
    .await?;
    let duplicate = user_service::add_address(
        &state,
        &user,
        AddressRequest {
            address: "av. matta 100, santiago".into(),
        },
    )
    .await;
    assert!(duplicate.is_err());

    user_service::change_password(
        &state,
        &user,
        ChangePasswordRequest {
            old_password: "admin".into(),
            new_password: "pastel".into(),
        },
    )
    .await?;

    let entries = memory.audit_entries().await;
    assert!(
        entries
            .iter()
            .any(|e| e.user_id == Some(admin.id) && e.action == "password_change")
    );
    Ok(())
}
