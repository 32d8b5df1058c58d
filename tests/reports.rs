use std::sync::Arc;

use bakery_shop_api::{
    cart::CartOwner,
    config::AppConfig,
    dto::{
        admin::{Bucket, SalesQuery, TopProductsQuery},
        orders::{OrderWithItems, UpdateOrderStatusRequest},
    },
    middleware::auth::AuthUser,
    models::{Order, OrderItem, OrderStatus, PaymentMethod, Role},
    seed::catalog,
    services::{admin_service, report_service},
    state::AppState,
    store::{DynStore, MemoryStore},
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

fn order(created_at: DateTime<Utc>, status: OrderStatus, lines: &[(&str, i32, i64)]) -> OrderWithItems {
    let id = Uuid::new_v4();
    let items: Vec<OrderItem> = lines
        .iter()
        .map(|(product_id, quantity, unit_price)| OrderItem {
            id: Uuid::new_v4(),
            order_id: id,
            product_id: product_id.to_string(),
            name: format!("Product {product_id}"),
            image: None,
            quantity: *quantity,
            unit_price: *unit_price,
            personalization: None,
        })
        .collect();
    let subtotal = items.iter().map(OrderItem::line_total).sum();
    OrderWithItems {
        order: Order {
            id,
            user_id: Uuid::new_v4(),
            user_email: "ana@gmail.com".into(),
            subtotal,
            discount: 0,
            total: subtotal,
            status,
            payment_method: PaymentMethod::Cash,
            card_last4: None,
            delivery_address: "Calle 1".into(),
            created_at,
            updated_at: created_at,
        },
        items,
    }
}

fn sample() -> Vec<OrderWithItems> {
    vec![
        // Monday and Wednesday of the same week.
        order(at(2025, 3, 3), OrderStatus::Delivered, &[("TC001", 1, 45000), ("P1001", 2, 5000)]),
        order(at(2025, 3, 5), OrderStatus::Pending, &[("P1001", 3, 5000)]),
        order(at(2025, 3, 5), OrderStatus::Cancelled, &[("TC001", 5, 45000)]),
        order(at(2025, 4, 1), OrderStatus::Shipped, &[("PT001", 1, 3000)]),
    ]
}

#[test]
fn weeks_start_on_monday() {
    let wednesday = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
    assert_eq!(
        report_service::bucket_start(wednesday, Bucket::Week),
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    );
    assert_eq!(
        report_service::bucket_start(wednesday, Bucket::Month),
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    );
    assert_eq!(report_service::bucket_start(wednesday, Bucket::Day), wednesday);
}

#[test]
fn sales_skip_cancelled_orders() {
    let orders = sample();

    let daily = report_service::sales_series(&orders, Bucket::Day);
    assert_eq!(daily.len(), 3);
    assert_eq!(daily[1].order_count, 1);
    assert_eq!(daily[1].revenue, 15000);

    let monthly = report_service::sales_series(&orders, Bucket::Month);
    assert_eq!(monthly.len(), 2);
    assert_eq!(monthly[0].order_count, 2);
    assert_eq!(monthly[0].revenue, 55000 + 15000);
    assert_eq!(monthly[1].revenue, 3000);
}

#[test]
fn top_products_rank_by_units() {
    let ranked = report_service::top_products(&sample(), 10);
    let ids: Vec<&str> = ranked.iter().map(|p| p.product_id.as_str()).collect();
    assert_eq!(ids, ["P1001", "TC001", "PT001"]);
    assert_eq!(ranked[0].quantity, 5);
    assert_eq!(ranked[1].quantity, 1);

    assert_eq!(report_service::top_products(&sample(), 1).len(), 1);
}

#[test]
fn every_status_is_counted() {
    let counts = report_service::orders_by_status(&sample());
    assert_eq!(counts.len(), OrderStatus::ALL.len());
    let count_of = |status| {
        counts
            .iter()
            .find(|c| c.status == status)
            .map(|c| c.count)
            .unwrap()
    };
    assert_eq!(count_of(OrderStatus::Pending), 1);
    assert_eq!(count_of(OrderStatus::Preparing), 0);
    assert_eq!(count_of(OrderStatus::Cancelled), 1);
}

async fn state_with(orders: Vec<OrderWithItems>) -> anyhow::Result<AppState> {
    let store: DynStore = Arc::new(MemoryStore::new());
    for product in catalog() {
        store.insert_product(product).await?;
    }
    for order in orders {
        store.place_order(order, CartOwner::Guest(Uuid::new_v4())).await?;
    }
    Ok(AppState::new(store, AppConfig::new("secret")))
}

fn staff() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        email: "admin@admin.cl".into(),
        role: Role::Admin,
    }
}

#[tokio::test]
async fn dashboard_handlers_need_staff() -> anyhow::Result<()> {
    let state = state_with(sample()).await?;
    let shopper = AuthUser {
        user_id: Uuid::new_v4(),
        email: "ana@gmail.com".into(),
        role: Role::User,
    };
    assert!(report_service::summary(&state, &shopper).await.is_err());

    // Staff by email domain alone.
    let by_domain = AuthUser {
        role: Role::User,
        ..staff()
    };
    let resp = report_service::summary(&state, &by_domain).await?;
    let summary = resp.data.unwrap();
    assert_eq!(summary.order_count, 3);
    assert_eq!(summary.revenue, 55000 + 15000 + 3000);
    assert_eq!(summary.average_ticket, 73000 / 3);
    Ok(())
}

#[tokio::test]
async fn sales_range_is_inclusive_and_validated() -> anyhow::Result<()> {
    let state = state_with(sample()).await?;

    let resp = report_service::sales(
        &state,
        &staff(),
        SalesQuery {
            from: NaiveDate::from_ymd_opt(2025, 3, 5),
            to: NaiveDate::from_ymd_opt(2025, 3, 5),
            bucket: None,
        },
    )
    .await?;
    let series = resp.data.unwrap();
    assert_eq!(series.points.len(), 1);
    assert_eq!(series.points[0].revenue, 15000);

    let backwards = report_service::sales(
        &state,
        &staff(),
        SalesQuery {
            from: NaiveDate::from_ymd_opt(2025, 4, 1),
            to: NaiveDate::from_ymd_opt(2025, 3, 1),
            bucket: Some(Bucket::Week),
        },
    )
    .await;
    assert!(backwards.is_err());

    let top = report_service::popular_products(&state, &staff(), TopProductsQuery { limit: Some(2) })
        .await?;
    assert_eq!(top.data.unwrap().len(), 2);
    Ok(())
}

#[tokio::test]
async fn status_changes_are_unrestricted_for_staff() -> anyhow::Result<()> {
    let orders = sample();
    let cancelled = orders[2].order.id;
    let state = state_with(orders).await?;

    let resp = admin_service::update_order_status(
        &state,
        &staff(),
        cancelled,
        UpdateOrderStatusRequest {
            status: "entregado".into(),
        },
    )
    .await?;
    assert_eq!(resp.data.unwrap().status, OrderStatus::Delivered);

    let unknown = admin_service::update_order_status(
        &state,
        &staff(),
        cancelled,
        UpdateOrderStatusRequest {
            status: "lost".into(),
        },
    )
    .await;
    assert!(unknown.is_err());

    let missing = admin_service::get_order_admin(&state, &staff(), Uuid::new_v4()).await;
    assert!(missing.is_err());
    Ok(())
}
