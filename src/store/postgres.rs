//! Postgres store: sea-orm entities on top of the sqlx pool.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, SqlxPostgresConnector,
    TransactionTrait,
    sea_query::{Expr, Func, LockType, SimpleExpr, extension::postgres::PgExpr},
};
use uuid::Uuid;

use super::{
    AuditLog, CartRepository, EMAIL_TAKEN, OrderFilter, OrderRepository, Page, ProductFilter,
    ProductRepository, Store, UserFilter, UserRepository, insufficient_stock,
};
use crate::{
    cart::{Cart, CartOwner},
    db::DbPool,
    dto::orders::OrderWithItems,
    entity::{
        audit_logs::{self, Entity as AuditLogs},
        cart_items::{self, Column as CartCol, Entity as CartItems},
        order_items::{self, Column as OrderItemCol, Entity as OrderItems},
        orders::{self, Column as OrderCol, Entity as Orders},
        products::{self, Column as ProdCol, Entity as Products},
        users::{self, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    models::{
        AuditEntry, CartLine, Order, OrderItem, OrderStatus, PaymentMethod, Product, User,
    },
    routes::params::{ProductSortBy, SortOrder},
};

#[derive(Clone)]
pub struct PgStore {
    orm: DatabaseConnection,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            orm: SqlxPostgresConnector::from_sqlx_postgres_pool(pool),
        }
    }
}

/// A unique index can still fire when two writers pass the existence check
/// together; the loser gets the same conflict as a sequential duplicate.
fn conflict_on_unique(message: String) -> impl FnOnce(DbErr) -> AppError {
    move |err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(message),
        _ => AppError::OrmError(err),
    }
}

fn ilike_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn product_from_entity(model: products::Model) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        category: model.category,
        stock: model.stock,
        image: model.image,
        personalizable: model.personalizable,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn product_active(product: &Product) -> products::ActiveModel {
    products::ActiveModel {
        id: Set(product.id.clone()),
        name: Set(product.name.clone()),
        description: Set(product.description.clone()),
        price: Set(product.price),
        category: Set(product.category.clone()),
        stock: Set(product.stock),
        image: Set(product.image.clone()),
        personalizable: Set(product.personalizable),
        created_at: Set(product.created_at.into()),
    }
}

fn user_from_entity(model: users::Model) -> AppResult<User> {
    let addresses: Vec<String> = serde_json::from_value(model.addresses)
        .map_err(|err| AppError::Internal(err.into()))?;
    Ok(User {
        id: model.id,
        email: model.email,
        password_hash: model.password_hash,
        name: model.name,
        phone: model.phone,
        birth_date: model.birth_date,
        role: model.role.parse()?,
        protected: model.protected,
        discount_percent: model.discount_percent,
        promo_code: model.promo_code,
        is_student: model.is_student,
        addresses,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

fn user_active(user: &User) -> users::ActiveModel {
    users::ActiveModel {
        id: Set(user.id),
        email: Set(user.email.trim().to_lowercase()),
        password_hash: Set(user.password_hash.clone()),
        name: Set(user.name.clone()),
        phone: Set(user.phone.clone()),
        birth_date: Set(user.birth_date),
        role: Set(user.role.as_str().to_string()),
        protected: Set(user.protected),
        discount_percent: Set(user.discount_percent),
        promo_code: Set(user.promo_code.clone()),
        is_student: Set(user.is_student),
        addresses: Set(serde_json::Value::from(user.addresses.clone())),
        created_at: Set(user.created_at.into()),
    }
}

fn order_from_entity(model: orders::Model) -> AppResult<Order> {
    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        user_email: model.user_email,
        subtotal: model.subtotal,
        discount: model.discount,
        total: model.total,
        status: model.status.parse()?,
        payment_method: model.payment_method.parse::<PaymentMethod>()?,
        card_last4: model.card_last4,
        delivery_address: model.delivery_address,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn order_item_from_entity(model: order_items::Model) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        name: model.name,
        image: model.image,
        quantity: model.quantity,
        unit_price: model.unit_price,
        personalization: model.personalization,
    }
}

fn cart_owner_condition(owner: CartOwner) -> Condition {
    Condition::all()
        .add(CartCol::OwnerKind.eq(owner.kind()))
        .add(CartCol::OwnerId.eq(owner.id()))
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn list_products(&self, filter: &ProductFilter) -> AppResult<Page<Product>> {
        let mut condition = Condition::all();
        if let Some(category) = filter.category.as_deref() {
            condition = condition.add(
                Expr::expr(Func::lower(Expr::col(ProdCol::Category))).eq(category.to_lowercase()),
            );
        }
        if let Some(search) = filter.search.as_deref() {
            let pattern = ilike_pattern(search);
            condition = condition.add(
                Condition::any()
                    .add(Expr::col(ProdCol::Name).ilike(pattern.clone()))
                    .add(Expr::col(ProdCol::Description).ilike(pattern)),
            );
        }
        if let Some(min) = filter.min_price {
            condition = condition.add(ProdCol::Price.gte(min));
        }
        if let Some(max) = filter.max_price {
            condition = condition.add(ProdCol::Price.lte(max));
        }
        if filter.in_stock {
            condition = condition.add(ProdCol::Stock.gt(0));
        }
        if let Some(max) = filter.max_stock {
            condition = condition.add(ProdCol::Stock.lte(max));
        }

        let mut finder = Products::find().filter(condition);
        let sort_expr: SimpleExpr = match filter.sort_by {
            ProductSortBy::CreatedAt => Expr::col(ProdCol::CreatedAt).into(),
            ProductSortBy::Price => Expr::col(ProdCol::Price).into(),
            ProductSortBy::Name => Func::lower(Expr::col(ProdCol::Name)).into(),
        };
        finder = match filter.sort_order {
            SortOrder::Asc => finder.order_by_asc(sort_expr),
            SortOrder::Desc => finder.order_by_desc(sort_expr),
        }
        .order_by_asc(ProdCol::Id);

        let total = finder.clone().count(&self.orm).await? as i64;
        if filter.offset > 0 {
            finder = finder.offset(filter.offset as u64);
        }
        if filter.limit > 0 {
            finder = finder.limit(filter.limit as u64);
        }
        let items = finder
            .all(&self.orm)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect();
        Ok(Page { items, total })
    }

    async fn list_categories(&self) -> AppResult<Vec<String>> {
        let categories = Products::find()
            .select_only()
            .column(ProdCol::Category)
            .distinct()
            .order_by_asc(ProdCol::Category)
            .into_tuple::<String>()
            .all(&self.orm)
            .await?;
        Ok(categories)
    }

    async fn find_product(&self, id: &str) -> AppResult<Option<Product>> {
        let model = Products::find_by_id(id.to_string()).one(&self.orm).await?;
        Ok(model.map(product_from_entity))
    }

    async fn insert_product(&self, product: Product) -> AppResult<Product> {
        let exists = Products::find_by_id(product.id.clone())
            .one(&self.orm)
            .await?
            .is_some();
        if exists {
            return Err(AppError::Conflict(format!(
                "Product {} already exists",
                product.id
            )));
        }
        let model = product_active(&product)
            .insert(&self.orm)
            .await
            .map_err(conflict_on_unique(format!(
                "Product {} already exists",
                product.id
            )))?;
        Ok(product_from_entity(model))
    }

    async fn update_product(&self, product: Product) -> AppResult<Product> {
        Products::find_by_id(product.id.clone())
            .one(&self.orm)
            .await?
            .ok_or(AppError::NotFound)?;
        let model = product_active(&product).update(&self.orm).await?;
        Ok(product_from_entity(model))
    }

    async fn delete_product(&self, id: &str) -> AppResult<bool> {
        let result = Products::delete_by_id(id.to_string())
            .exec(&self.orm)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn adjust_stock(&self, id: &str, delta: i32) -> AppResult<Product> {
        let txn = self.orm.begin().await?;
        let model = Products::find_by_id(id.to_string())
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;

        let stock = model
            .stock
            .checked_add(delta)
            .filter(|s| *s >= 0)
            .ok_or_else(|| AppError::BadRequest("Stock cannot be negative".into()))?;

        let mut active: products::ActiveModel = model.into();
        active.stock = Set(stock);
        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(product_from_entity(updated))
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Users::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(user_from_entity)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Users::find()
            .filter(UserCol::Email.eq(email.trim().to_lowercase()))
            .one(&self.orm)
            .await?
            .map(user_from_entity)
            .transpose()
    }

    async fn insert_user(&self, user: User) -> AppResult<User> {
        if self.find_user_by_email(&user.email).await?.is_some() {
            return Err(AppError::Conflict(EMAIL_TAKEN.into()));
        }
        let model = user_active(&user)
            .insert(&self.orm)
            .await
            .map_err(conflict_on_unique(EMAIL_TAKEN.into()))?;
        user_from_entity(model)
    }

    async fn update_user(&self, user: User) -> AppResult<User> {
        if let Some(other) = self.find_user_by_email(&user.email).await? {
            if other.id != user.id {
                return Err(AppError::Conflict(EMAIL_TAKEN.into()));
            }
        }
        Users::find_by_id(user.id)
            .one(&self.orm)
            .await?
            .ok_or(AppError::NotFound)?;
        let model = user_active(&user)
            .update(&self.orm)
            .await
            .map_err(conflict_on_unique(EMAIL_TAKEN.into()))?;
        user_from_entity(model)
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let txn = self.orm.begin().await?;
        CartItems::delete_many()
            .filter(cart_owner_condition(CartOwner::User(id)))
            .exec(&txn)
            .await?;
        let result = Users::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    async fn list_users(&self, filter: &UserFilter) -> AppResult<Page<User>> {
        let mut condition = Condition::all();
        if let Some(role) = filter.role {
            condition = condition.add(UserCol::Role.eq(role.as_str()));
        }
        if let Some(search) = filter.search.as_deref() {
            let pattern = ilike_pattern(search);
            condition = condition.add(
                Condition::any()
                    .add(Expr::col(UserCol::Email).ilike(pattern.clone()))
                    .add(Expr::col(UserCol::Name).ilike(pattern)),
            );
        }

        let mut finder = Users::find()
            .filter(condition)
            .order_by_asc(UserCol::CreatedAt)
            .order_by_asc(UserCol::Email);
        let total = finder.clone().count(&self.orm).await? as i64;
        if filter.offset > 0 {
            finder = finder.offset(filter.offset as u64);
        }
        if filter.limit > 0 {
            finder = finder.limit(filter.limit as u64);
        }
        let items = finder
            .all(&self.orm)
            .await?
            .into_iter()
            .map(user_from_entity)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Page { items, total })
    }
}

#[async_trait]
impl CartRepository for PgStore {
    async fn load_cart(&self, owner: CartOwner) -> AppResult<Option<Cart>> {
        let rows = CartItems::find()
            .filter(cart_owner_condition(owner))
            .order_by_asc(CartCol::CreatedAt)
            .all(&self.orm)
            .await?;
        if rows.is_empty() {
            return Ok(None);
        }
        let lines = rows
            .into_iter()
            .map(|row| CartLine {
                product_id: row.product_id,
                quantity: row.quantity,
                personalization: row.personalization,
                added_at: row.created_at.with_timezone(&Utc),
            })
            .collect();
        Ok(Some(Cart::new(lines)))
    }

    async fn save_cart(&self, owner: CartOwner, cart: &Cart) -> AppResult<()> {
        let txn = self.orm.begin().await?;
        CartItems::delete_many()
            .filter(cart_owner_condition(owner))
            .exec(&txn)
            .await?;
        for line in &cart.lines {
            cart_items::ActiveModel {
                id: Set(Uuid::new_v4()),
                owner_kind: Set(owner.kind().to_string()),
                owner_id: Set(owner.id()),
                product_id: Set(line.product_id.clone()),
                quantity: Set(line.quantity),
                personalization: Set(line.personalization.clone()),
                created_at: Set(line.added_at.into()),
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;
        Ok(())
    }

    async fn delete_cart(&self, owner: CartOwner) -> AppResult<()> {
        CartItems::delete_many()
            .filter(cart_owner_condition(owner))
            .exec(&self.orm)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn place_order(
        &self,
        order: OrderWithItems,
        cart_owner: CartOwner,
    ) -> AppResult<OrderWithItems> {
        let txn = self.orm.begin().await?;

        // Lock in a fixed order so concurrent checkouts cannot deadlock.
        let mut wanted: Vec<(&str, i32)> = order
            .items
            .iter()
            .map(|item| (item.product_id.as_str(), item.quantity))
            .collect();
        wanted.sort_by(|a, b| a.0.cmp(b.0));

        for (product_id, quantity) in &wanted {
            let product = Products::find_by_id(product_id.to_string())
                .lock(LockType::Update)
                .one(&txn)
                .await?;
            match product {
                Some(product) if product.stock >= *quantity => {}
                _ => return Err(insufficient_stock(product_id)),
            }
        }

        for (product_id, quantity) in &wanted {
            Products::update_many()
                .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(*quantity))
                .filter(ProdCol::Id.eq(*product_id))
                .exec(&txn)
                .await?;
        }

        let header = &order.order;
        orders::ActiveModel {
            id: Set(header.id),
            user_id: Set(header.user_id),
            user_email: Set(header.user_email.clone()),
            subtotal: Set(header.subtotal),
            discount: Set(header.discount),
            total: Set(header.total),
            status: Set(header.status.as_str().to_string()),
            payment_method: Set(header.payment_method.as_str().to_string()),
            card_last4: Set(header.card_last4.clone()),
            delivery_address: Set(header.delivery_address.clone()),
            created_at: Set(header.created_at.into()),
            updated_at: Set(header.updated_at.into()),
        }
        .insert(&txn)
        .await?;

        for item in &order.items {
            order_items::ActiveModel {
                id: Set(item.id),
                order_id: Set(item.order_id),
                product_id: Set(item.product_id.clone()),
                name: Set(item.name.clone()),
                image: Set(item.image.clone()),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                personalization: Set(item.personalization.clone()),
            }
            .insert(&txn)
            .await?;
        }

        CartItems::delete_many()
            .filter(cart_owner_condition(cart_owner))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(order)
    }

    async fn find_order(&self, id: Uuid) -> AppResult<Option<OrderWithItems>> {
        let Some(model) = Orders::find_by_id(id).one(&self.orm).await? else {
            return Ok(None);
        };
        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(id))
            .order_by_asc(OrderItemCol::ProductId)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(order_item_from_entity)
            .collect();
        Ok(Some(OrderWithItems {
            order: order_from_entity(model)?,
            items,
        }))
    }

    async fn list_orders(&self, filter: &OrderFilter) -> AppResult<Page<Order>> {
        let mut condition = Condition::all();
        if let Some(user_id) = filter.user_id {
            condition = condition.add(OrderCol::UserId.eq(user_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(OrderCol::Status.eq(status.as_str()));
        }
        if let Some(email) = filter.email.as_deref() {
            condition = condition.add(OrderCol::UserEmail.eq(email.trim().to_lowercase()));
        }
        if let Some(from) = filter.from {
            condition = condition.add(OrderCol::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            condition = condition.add(OrderCol::CreatedAt.lte(to));
        }

        let mut finder = Orders::find().filter(condition);
        finder = match filter.sort_order {
            SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
            SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
        };

        let total = finder.clone().count(&self.orm).await? as i64;
        if filter.offset > 0 {
            finder = finder.offset(filter.offset as u64);
        }
        if filter.limit > 0 {
            finder = finder.limit(filter.limit as u64);
        }
        let items = finder
            .all(&self.orm)
            .await?
            .into_iter()
            .map(order_from_entity)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Page { items, total })
    }

    async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> AppResult<Order> {
        let model = Orders::find_by_id(id)
            .one(&self.orm)
            .await?
            .ok_or(AppError::NotFound)?;
        let mut active: orders::ActiveModel = model.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&self.orm).await?;
        order_from_entity(updated)
    }

    async fn cancel_order(&self, id: Uuid) -> AppResult<Order> {
        let txn = self.orm.begin().await?;
        let model = Orders::find_by_id(id)
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;
        if model.status != OrderStatus::Pending.as_str() {
            return Err(AppError::BadRequest(
                "Only pending orders can be cancelled".into(),
            ));
        }

        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(id))
            .all(&txn)
            .await?;
        for item in &items {
            // Products deleted since the purchase simply match no row.
            Products::update_many()
                .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(item.quantity))
                .filter(ProdCol::Id.eq(item.product_id.clone()))
                .exec(&txn)
                .await?;
        }

        let mut active: orders::ActiveModel = model.into();
        active.status = Set(OrderStatus::Cancelled.as_str().to_string());
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await?;
        txn.commit().await?;
        order_from_entity(updated)
    }

    async fn orders_in_range(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<OrderWithItems>> {
        let mut condition = Condition::all();
        if let Some(from) = from {
            condition = condition.add(OrderCol::CreatedAt.gte(from));
        }
        if let Some(to) = to {
            condition = condition.add(OrderCol::CreatedAt.lte(to));
        }
        let headers = Orders::find()
            .filter(condition)
            .order_by_asc(OrderCol::CreatedAt)
            .order_by_asc(OrderCol::Id)
            .all(&self.orm)
            .await?;
        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = headers.iter().map(|o| o.id).collect();
        let mut items_by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for item in OrderItems::find()
            .filter(OrderItemCol::OrderId.is_in(ids))
            .all(&self.orm)
            .await?
        {
            items_by_order
                .entry(item.order_id)
                .or_default()
                .push(order_item_from_entity(item));
        }

        headers
            .into_iter()
            .map(|model| -> AppResult<OrderWithItems> {
                let items = items_by_order.remove(&model.id).unwrap_or_default();
                Ok(OrderWithItems {
                    order: order_from_entity(model)?,
                    items,
                })
            })
            .collect()
    }
}

#[async_trait]
impl AuditLog for PgStore {
    async fn record_audit(&self, entry: AuditEntry) -> AppResult<()> {
        let model = audit_logs::ActiveModel {
            id: Set(entry.id),
            user_id: Set(entry.user_id),
            action: Set(entry.action),
            resource: Set(entry.resource),
            metadata: Set(entry.metadata),
            created_at: Set(entry.created_at.into()),
        };
        AuditLogs::insert(model).exec(&self.orm).await?;
        Ok(())
    }
}

impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }
}
