//! In-process store.
//!
//! Everything lives behind one `RwLock`. When a snapshot path is configured,
//! each mutation rewrites a versioned JSON file so a restart picks up where
//! the previous process stopped. A mutation becomes visible only once its
//! snapshot is on disk.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AuditLog, CartRepository, EMAIL_TAKEN, OrderFilter, OrderRepository, Page, ProductFilter,
    ProductRepository, Store, UserFilter, UserRepository, contains_ci, insufficient_stock,
};
use crate::{
    cart::{Cart, CartOwner},
    dto::orders::OrderWithItems,
    error::{AppError, AppResult},
    models::{AuditEntry, Order, OrderStatus, Product, User},
    routes::params::{ProductSortBy, SortOrder},
};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Default, Clone)]
struct Inner {
    products: BTreeMap<String, Product>,
    users: HashMap<Uuid, User>,
    carts: HashMap<CartOwner, Cart>,
    orders: HashMap<Uuid, OrderWithItems>,
    audit: Vec<AuditEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SavedCart {
    owner: CartOwner,
    cart: Cart,
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    products: Vec<Product>,
    users: Vec<User>,
    carts: Vec<SavedCart>,
    orders: Vec<OrderWithItems>,
    #[serde(default)]
    audit: Vec<AuditEntry>,
}

impl From<Snapshot> for Inner {
    fn from(snapshot: Snapshot) -> Self {
        Inner {
            products: snapshot
                .products
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
            users: snapshot.users.into_iter().map(|u| (u.id, u)).collect(),
            carts: snapshot
                .carts
                .into_iter()
                .map(|saved| (saved.owner, saved.cart))
                .collect(),
            orders: snapshot
                .orders
                .into_iter()
                .map(|o| (o.order.id, o))
                .collect(),
            audit: snapshot.audit,
        }
    }
}

impl Inner {
    fn snapshot(&self) -> Snapshot {
        let mut orders: Vec<OrderWithItems> = self.orders.values().cloned().collect();
        orders.sort_by_key(|o| (o.order.created_at, o.order.id));
        let mut users: Vec<User> = self.users.values().cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Snapshot {
            version: SNAPSHOT_VERSION,
            products: self.products.values().cloned().collect(),
            users,
            carts: self
                .carts
                .iter()
                .map(|(owner, cart)| SavedCart {
                    owner: *owner,
                    cart: cart.clone(),
                })
                .collect(),
            orders,
            audit: self.audit.clone(),
        }
    }

    fn user_by_email(&self, email: &str) -> Option<&User> {
        let email = email.trim().to_lowercase();
        self.users.values().find(|u| u.email.to_lowercase() == email)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a store backed by the JSON file at `path`, loading it when it exists.
    pub async fn with_snapshot(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: Snapshot = serde_json::from_slice(&bytes)
                    .with_context(|| format!("parsing snapshot {}", path.display()))?;
                if snapshot.version != SNAPSHOT_VERSION {
                    anyhow::bail!(
                        "snapshot {} has version {}, expected {}",
                        path.display(),
                        snapshot.version,
                        SNAPSHOT_VERSION
                    );
                }
                tracing::info!(path = %path.display(), "loaded store snapshot");
                Inner::from(snapshot)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Inner::default(),
            Err(err) => {
                return Err(err).with_context(|| format!("reading snapshot {}", path.display()));
            }
        };

        Ok(Self {
            inner: RwLock::new(inner),
            snapshot_path: Some(path),
        })
    }

    /// Runs `change` against a draft of the state and publishes the draft
    /// once it has been written out. A failed change or write leaves the
    /// state untouched.
    async fn commit<T, F>(&self, change: F) -> AppResult<T>
    where
        T: Send,
        F: FnOnce(&mut Inner) -> AppResult<T> + Send,
    {
        let mut inner = self.inner.write().await;
        if self.snapshot_path.is_none() {
            return change(&mut *inner);
        }
        let mut draft = (*inner).clone();
        let value = change(&mut draft)?;
        self.persist(&draft).await?;
        *inner = draft;
        Ok(value)
    }

    // Called with the write guard held so snapshots land in mutation order.
    async fn persist(&self, inner: &Inner) -> AppResult<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(&inner.snapshot())
            .context("serializing store snapshot")?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }
}

fn paginate<T>(items: Vec<T>, limit: i64, offset: i64) -> Page<T> {
    let total = items.len() as i64;
    let skip = offset.max(0) as usize;
    let items = if limit > 0 {
        items.into_iter().skip(skip).take(limit as usize).collect()
    } else {
        items.into_iter().skip(skip).collect()
    };
    Page { items, total }
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

fn compare_products(a: &Product, b: &Product, by: ProductSortBy, order: SortOrder) -> Ordering {
    let primary = match by {
        ProductSortBy::CreatedAt => a.created_at.cmp(&b.created_at),
        ProductSortBy::Price => a.price.cmp(&b.price),
        ProductSortBy::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    };
    directed(primary, order).then_with(|| a.id.cmp(&b.id))
}

fn in_range(at: DateTime<Utc>, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
    from.is_none_or(|from| at >= from) && to.is_none_or(|to| at <= to)
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn list_products(&self, filter: &ProductFilter) -> AppResult<Page<Product>> {
        let inner = self.inner.read().await;
        let category = filter.category.as_deref().map(str::to_lowercase);
        let mut items: Vec<Product> = inner
            .products
            .values()
            .filter(|p| {
                category
                    .as_deref()
                    .is_none_or(|c| p.category.to_lowercase() == c)
            })
            .filter(|p| {
                filter
                    .search
                    .as_deref()
                    .is_none_or(|q| contains_ci(&p.name, q) || contains_ci(&p.description, q))
            })
            .filter(|p| filter.min_price.is_none_or(|min| p.price >= min))
            .filter(|p| filter.max_price.is_none_or(|max| p.price <= max))
            .filter(|p| !filter.in_stock || p.stock > 0)
            .filter(|p| filter.max_stock.is_none_or(|max| p.stock <= max))
            .cloned()
            .collect();
        items.sort_by(|a, b| compare_products(a, b, filter.sort_by, filter.sort_order));
        Ok(paginate(items, filter.limit, filter.offset))
    }

    async fn list_categories(&self) -> AppResult<Vec<String>> {
        let inner = self.inner.read().await;
        let mut categories: Vec<String> =
            inner.products.values().map(|p| p.category.clone()).collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    async fn find_product(&self, id: &str) -> AppResult<Option<Product>> {
        Ok(self.inner.read().await.products.get(id).cloned())
    }

    async fn insert_product(&self, product: Product) -> AppResult<Product> {
        self.commit(|inner| {
            if inner.products.contains_key(&product.id) {
                return Err(AppError::Conflict(format!(
                    "Product {} already exists",
                    product.id
                )));
            }
            inner.products.insert(product.id.clone(), product.clone());
            Ok(product)
        })
        .await
    }

    async fn update_product(&self, product: Product) -> AppResult<Product> {
        self.commit(|inner| {
            let slot = inner
                .products
                .get_mut(&product.id)
                .ok_or(AppError::NotFound)?;
            *slot = product.clone();
            Ok(product)
        })
        .await
    }

    async fn delete_product(&self, id: &str) -> AppResult<bool> {
        if !self.inner.read().await.products.contains_key(id) {
            return Ok(false);
        }
        self.commit(|inner| {
            let removed = inner.products.remove(id).is_some();
            for cart in inner.carts.values_mut() {
                cart.remove(id);
            }
            inner.carts.retain(|_, cart| !cart.is_empty());
            Ok(removed)
        })
        .await
    }

    async fn adjust_stock(&self, id: &str, delta: i32) -> AppResult<Product> {
        self.commit(|inner| {
            let product = inner.products.get_mut(id).ok_or(AppError::NotFound)?;
            product.stock = product
                .stock
                .checked_add(delta)
                .filter(|s| *s >= 0)
                .ok_or_else(|| AppError::BadRequest("Stock cannot be negative".into()))?;
            Ok(product.clone())
        })
        .await
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.inner.read().await.user_by_email(email).cloned())
    }

    async fn insert_user(&self, user: User) -> AppResult<User> {
        self.commit(|inner| {
            if inner.users.contains_key(&user.id) || inner.user_by_email(&user.email).is_some() {
                return Err(AppError::Conflict(EMAIL_TAKEN.into()));
            }
            inner.users.insert(user.id, user.clone());
            Ok(user)
        })
        .await
    }

    async fn update_user(&self, user: User) -> AppResult<User> {
        self.commit(|inner| {
            if inner
                .user_by_email(&user.email)
                .is_some_and(|other| other.id != user.id)
            {
                return Err(AppError::Conflict(EMAIL_TAKEN.into()));
            }
            let slot = inner.users.get_mut(&user.id).ok_or(AppError::NotFound)?;
            *slot = user.clone();
            Ok(user)
        })
        .await
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        if !self.inner.read().await.users.contains_key(&id) {
            return Ok(false);
        }
        self.commit(|inner| {
            let removed = inner.users.remove(&id).is_some();
            inner.carts.remove(&CartOwner::User(id));
            for entry in inner.audit.iter_mut().filter(|e| e.user_id == Some(id)) {
                entry.user_id = None;
            }
            Ok(removed)
        })
        .await
    }

    async fn list_users(&self, filter: &UserFilter) -> AppResult<Page<User>> {
        let inner = self.inner.read().await;
        let mut items: Vec<User> = inner
            .users
            .values()
            .filter(|u| filter.role.is_none_or(|role| u.role == role))
            .filter(|u| {
                filter
                    .search
                    .as_deref()
                    .is_none_or(|q| contains_ci(&u.email, q) || contains_ci(&u.name, q))
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.email.cmp(&b.email))
        });
        Ok(paginate(items, filter.limit, filter.offset))
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn load_cart(&self, owner: CartOwner) -> AppResult<Option<Cart>> {
        Ok(self.inner.read().await.carts.get(&owner).cloned())
    }

    async fn save_cart(&self, owner: CartOwner, cart: &Cart) -> AppResult<()> {
        self.commit(|inner| {
            if cart.is_empty() {
                inner.carts.remove(&owner);
            } else {
                inner.carts.insert(owner, cart.clone());
            }
            Ok(())
        })
        .await
    }

    async fn delete_cart(&self, owner: CartOwner) -> AppResult<()> {
        if !self.inner.read().await.carts.contains_key(&owner) {
            return Ok(());
        }
        self.commit(|inner| {
            inner.carts.remove(&owner);
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn place_order(
        &self,
        order: OrderWithItems,
        cart_owner: CartOwner,
    ) -> AppResult<OrderWithItems> {
        self.commit(|inner| {
            // Check every line before touching anything.
            for item in &order.items {
                let available = inner
                    .products
                    .get(&item.product_id)
                    .map(|p| p.stock)
                    .unwrap_or(0);
                if available < item.quantity {
                    return Err(insufficient_stock(&item.product_id));
                }
            }
            for item in &order.items {
                if let Some(product) = inner.products.get_mut(&item.product_id) {
                    product.stock -= item.quantity;
                }
            }

            inner.orders.insert(order.order.id, order.clone());
            inner.carts.remove(&cart_owner);
            Ok(order)
        })
        .await
    }

    async fn find_order(&self, id: Uuid) -> AppResult<Option<OrderWithItems>> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> AppResult<Page<Order>> {
        let inner = self.inner.read().await;
        let email = filter.email.as_deref().map(|e| e.trim().to_lowercase());
        let mut items: Vec<Order> = inner
            .orders
            .values()
            .map(|o| &o.order)
            .filter(|o| filter.user_id.is_none_or(|id| o.user_id == id))
            .filter(|o| filter.status.is_none_or(|s| o.status == s))
            .filter(|o| {
                email
                    .as_deref()
                    .is_none_or(|e| o.user_email.to_lowercase() == e)
            })
            .filter(|o| in_range(o.created_at, filter.from, filter.to))
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            directed(a.created_at.cmp(&b.created_at), filter.sort_order)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(paginate(items, filter.limit, filter.offset))
    }

    async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> AppResult<Order> {
        self.commit(|inner| {
            let entry = inner.orders.get_mut(&id).ok_or(AppError::NotFound)?;
            entry.order.status = status;
            entry.order.updated_at = Utc::now();
            Ok(entry.order.clone())
        })
        .await
    }

    async fn cancel_order(&self, id: Uuid) -> AppResult<Order> {
        self.commit(|inner| {
            let entry = inner.orders.get_mut(&id).ok_or(AppError::NotFound)?;
            if entry.order.status != OrderStatus::Pending {
                return Err(AppError::BadRequest(
                    "Only pending orders can be cancelled".into(),
                ));
            }
            entry.order.status = OrderStatus::Cancelled;
            entry.order.updated_at = Utc::now();
            let order = entry.order.clone();
            let restock: Vec<(String, i32)> = entry
                .items
                .iter()
                .map(|item| (item.product_id.clone(), item.quantity))
                .collect();

            for (product_id, quantity) in restock {
                if let Some(product) = inner.products.get_mut(&product_id) {
                    product.stock = product.stock.saturating_add(quantity);
                }
            }
            Ok(order)
        })
        .await
    }

    async fn orders_in_range(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<OrderWithItems>> {
        let inner = self.inner.read().await;
        let mut orders: Vec<OrderWithItems> = inner
            .orders
            .values()
            .filter(|o| in_range(o.order.created_at, from, to))
            .cloned()
            .collect();
        orders.sort_by_key(|o| (o.order.created_at, o.order.id));
        Ok(orders)
    }
}

#[async_trait]
impl AuditLog for MemoryStore {
    async fn record_audit(&self, entry: AuditEntry) -> AppResult<()> {
        self.commit(|inner| {
            inner.audit.push(entry);
            Ok(())
        })
        .await
    }
}

impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }
}

impl MemoryStore {
    /// Audit entries in insertion order.
    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.inner.read().await.audit.clone()
    }
}
