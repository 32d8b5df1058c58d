//! Persistence boundary.
//!
//! Services only talk to the repository traits below. Two backends exist:
//! [`postgres::PgStore`] (sea-orm over a sqlx pool) and
//! [`memory::MemoryStore`] (in-process, optionally snapshotted to a JSON file).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    cart::{Cart, CartOwner},
    dto::orders::OrderWithItems,
    error::{AppError, AppResult},
    models::{AuditEntry, Order, OrderStatus, Product, Role, User},
    routes::params::{ProductSortBy, SortOrder},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Matches before `limit`/`offset` were applied.
    pub total: i64,
}

// In every filter a `limit` of zero or less means "no limit".

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub in_stock: bool,
    /// Upper bound on stock, inclusive (low-stock listings).
    pub max_stock: Option<i32>,
    pub sort_by: ProductSortBy,
    pub sort_order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub email: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub sort_order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn list_products(&self, filter: &ProductFilter) -> AppResult<Page<Product>>;
    async fn list_categories(&self) -> AppResult<Vec<String>>;
    async fn find_product(&self, id: &str) -> AppResult<Option<Product>>;
    /// Fails with `Conflict` when the id is taken.
    async fn insert_product(&self, product: Product) -> AppResult<Product>;
    /// Replaces a product wholesale; `NotFound` when absent.
    async fn update_product(&self, product: Product) -> AppResult<Product>;
    async fn delete_product(&self, id: &str) -> AppResult<bool>;
    /// Atomically adds `delta` to the stock, refusing to go below zero.
    async fn adjust_stock(&self, id: &str, delta: i32) -> AppResult<Product>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>>;
    /// Case-insensitive lookup.
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    /// Fails with `Conflict` when the email is taken.
    async fn insert_user(&self, user: User) -> AppResult<User>;
    async fn update_user(&self, user: User) -> AppResult<User>;
    async fn delete_user(&self, id: Uuid) -> AppResult<bool>;
    async fn list_users(&self, filter: &UserFilter) -> AppResult<Page<User>>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    /// `None` when the owner has no saved cart.
    async fn load_cart(&self, owner: CartOwner) -> AppResult<Option<Cart>>;
    /// Saving an empty cart evicts the record.
    async fn save_cart(&self, owner: CartOwner, cart: &Cart) -> AppResult<()>;
    async fn delete_cart(&self, owner: CartOwner) -> AppResult<()>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persists an order in one unit of work: re-checks and decrements stock
    /// for every line, stores the order and its items, clears `cart_owner`.
    /// A line whose stock no longer covers its quantity aborts everything
    /// with `Conflict`.
    async fn place_order(&self, order: OrderWithItems, cart_owner: CartOwner)
    -> AppResult<OrderWithItems>;
    async fn find_order(&self, id: Uuid) -> AppResult<Option<OrderWithItems>>;
    async fn list_orders(&self, filter: &OrderFilter) -> AppResult<Page<Order>>;
    async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> AppResult<Order>;
    /// Cancels a pending order and puts its quantities back in stock.
    async fn cancel_order(&self, id: Uuid) -> AppResult<Order>;
    /// Every order created within the range, items included, oldest first.
    async fn orders_in_range(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<OrderWithItems>>;
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record_audit(&self, entry: AuditEntry) -> AppResult<()>;
}

pub trait Store:
    ProductRepository + UserRepository + CartRepository + OrderRepository + AuditLog
{
    fn backend(&self) -> &'static str;
}

pub type DynStore = Arc<dyn Store>;

/// Case-insensitive containment used by search filters.
pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub const EMAIL_TAKEN: &str = "Email is already registered";

pub(crate) fn insufficient_stock(product_id: &str) -> AppError {
    AppError::Conflict(format!("Insufficient stock for product {product_id}"))
}
