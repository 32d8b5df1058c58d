//! Dashboard figures for staff. Cancelled orders never count as sales.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Duration, NaiveDate};

use crate::{
    dto::{
        admin::{
            Bucket, DashboardSummary, SalesPoint, SalesQuery, SalesSeries, StatusCount,
            TopProduct, TopProductsQuery,
        },
        orders::OrderWithItems,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::OrderStatus,
    response::{ApiResponse, Meta},
    services::admin_service::{end_of_day, start_of_day},
    state::AppState,
    store::{ProductFilter, UserFilter},
};

pub const DEFAULT_TOP_PRODUCTS: usize = 10;
const MAX_TOP_PRODUCTS: usize = 100;

/// First day of the bucket `date` falls in. Weeks start on Monday.
pub fn bucket_start(date: NaiveDate, bucket: Bucket) -> NaiveDate {
    match bucket {
        Bucket::Day => date,
        Bucket::Week => date - Duration::days(i64::from(date.weekday().num_days_from_monday())),
        Bucket::Month => date.with_day(1).unwrap_or(date),
    }
}

pub fn sales_series(orders: &[OrderWithItems], bucket: Bucket) -> Vec<SalesPoint> {
    let mut points: BTreeMap<NaiveDate, (i64, i64)> = BTreeMap::new();
    for order in orders.iter().filter(|o| o.order.status.is_billable()) {
        let period = bucket_start(order.order.created_at.date_naive(), bucket);
        let entry = points.entry(period).or_default();
        entry.0 += 1;
        entry.1 += order.order.total;
    }
    points
        .into_iter()
        .map(|(period, (order_count, revenue))| SalesPoint {
            period,
            order_count,
            revenue,
        })
        .collect()
}

/// Best sellers by units; ties broken by revenue, then product id.
pub fn top_products(orders: &[OrderWithItems], limit: usize) -> Vec<TopProduct> {
    let mut totals: HashMap<&str, TopProduct> = HashMap::new();
    for order in orders.iter().filter(|o| o.order.status.is_billable()) {
        for item in &order.items {
            let entry = totals
                .entry(item.product_id.as_str())
                .or_insert_with(|| TopProduct {
                    product_id: item.product_id.clone(),
                    name: item.name.clone(),
                    quantity: 0,
                    revenue: 0,
                });
            entry.quantity += i64::from(item.quantity);
            entry.revenue += item.line_total();
        }
    }
    let mut ranked: Vec<TopProduct> = totals.into_values().collect();
    ranked.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| b.revenue.cmp(&a.revenue))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    ranked.truncate(limit);
    ranked
}

pub fn orders_by_status(orders: &[OrderWithItems]) -> Vec<StatusCount> {
    OrderStatus::ALL
        .iter()
        .map(|status| StatusCount {
            status: *status,
            count: orders.iter().filter(|o| o.order.status == *status).count() as i64,
        })
        .collect()
}

pub async fn summary(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<DashboardSummary>> {
    ensure_admin(user, &state.config.auth)?;
    let orders = state.store.orders_in_range(None, None).await?;
    let billable: Vec<&OrderWithItems> = orders
        .iter()
        .filter(|o| o.order.status.is_billable())
        .collect();

    let order_count = billable.len() as i64;
    let revenue: i64 = billable.iter().map(|o| o.order.total).sum();
    let average_ticket = if order_count > 0 {
        revenue / order_count
    } else {
        0
    };

    let threshold = state.config.low_stock_threshold;
    let low_stock = state
        .store
        .list_products(&ProductFilter {
            max_stock: Some(threshold),
            limit: 1,
            ..ProductFilter::default()
        })
        .await?;
    let users = state
        .store
        .list_users(&UserFilter {
            limit: 1,
            ..UserFilter::default()
        })
        .await?;

    Ok(ApiResponse::ok(
        "Summary",
        DashboardSummary {
            order_count,
            revenue,
            average_ticket,
            low_stock_count: low_stock.total,
            low_stock_threshold: threshold,
            user_count: users.total,
        },
    ))
}

pub async fn sales(
    state: &AppState,
    user: &AuthUser,
    query: SalesQuery,
) -> AppResult<ApiResponse<SalesSeries>> {
    ensure_admin(user, &state.config.auth)?;
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(AppError::BadRequest("from must not be after to".into()));
        }
    }
    let bucket = query.bucket.unwrap_or_default();
    let orders = state
        .store
        .orders_in_range(query.from.map(start_of_day), query.to.map(end_of_day))
        .await?;
    let points = sales_series(&orders, bucket);
    let meta = Meta::whole(points.len());
    Ok(ApiResponse::success(
        "Sales",
        SalesSeries { bucket, points },
        Some(meta),
    ))
}

pub async fn popular_products(
    state: &AppState,
    user: &AuthUser,
    query: TopProductsQuery,
) -> AppResult<ApiResponse<Vec<TopProduct>>> {
    ensure_admin(user, &state.config.auth)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TOP_PRODUCTS)
        .clamp(1, MAX_TOP_PRODUCTS);
    let orders = state.store.orders_in_range(None, None).await?;
    let ranked = top_products(&orders, limit);
    let meta = Meta::whole(ranked.len());
    Ok(ApiResponse::success("Top products", ranked, Some(meta)))
}

pub async fn status_breakdown(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<Vec<StatusCount>>> {
    ensure_admin(user, &state.config.auth)?;
    let orders = state.store.orders_in_range(None, None).await?;
    Ok(ApiResponse::ok("Orders by status", orders_by_status(&orders)))
}
