//! Bootstrap data: staff accounts and the bakery catalog.

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Product, Role, User},
    services::auth_service::hash_password,
    store::{DynStore, ProductFilter},
};

pub const SYSTEM_ACCOUNT_EMAIL: &str = "system@admin.cl";
pub const ADMIN_ACCOUNT_EMAIL: &str = "admin@admin.cl";

#[derive(Debug, Clone)]
pub struct SeedAccounts {
    pub system_password: String,
    pub admin_password: String,
}

impl Default for SeedAccounts {
    fn default() -> Self {
        Self {
            system_password: "system".to_string(),
            admin_password: "admin".to_string(),
        }
    }
}

impl SeedAccounts {
    /// `SEED_SYSTEM_PASSWORD` / `SEED_ADMIN_PASSWORD`, falling back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            system_password: std::env::var("SEED_SYSTEM_PASSWORD")
                .unwrap_or(defaults.system_password),
            admin_password: std::env::var("SEED_ADMIN_PASSWORD")
                .unwrap_or(defaults.admin_password),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users_created: usize,
    pub products_created: usize,
}

/// Idempotent: existing accounts are left alone and the catalog is only
/// loaded into an empty product table.
pub async fn seed_store(store: &DynStore, accounts: &SeedAccounts) -> AppResult<SeedReport> {
    let mut report = SeedReport::default();

    let staff = [
        (SYSTEM_ACCOUNT_EMAIL, "System", Role::System, true, &accounts.system_password),
        (ADMIN_ACCOUNT_EMAIL, "Administrador", Role::Admin, false, &accounts.admin_password),
    ];
    for (email, name, role, protected, password) in staff {
        if store.find_user_by_email(email).await?.is_some() {
            continue;
        }
        store
            .insert_user(User {
                id: Uuid::new_v4(),
                email: email.to_string(),
                password_hash: hash_password(password)?,
                name: name.to_string(),
                phone: None,
                birth_date: None,
                role,
                protected,
                discount_percent: 0,
                promo_code: None,
                is_student: false,
                addresses: Vec::new(),
                created_at: Utc::now(),
            })
            .await?;
        tracing::info!(%email, role = %role, "seeded account");
        report.users_created += 1;
    }

    let existing = store
        .list_products(&ProductFilter {
            limit: 1,
            ..ProductFilter::default()
        })
        .await?;
    if existing.total == 0 {
        for product in catalog() {
            store.insert_product(product).await?;
            report.products_created += 1;
        }
        tracing::info!(count = report.products_created, "seeded catalog");
    }

    Ok(report)
}

/// The shop's standard catalog.
pub fn catalog() -> Vec<Product> {
    const ITEMS: &[(&str, &str, &str, &str, i64, &str, bool, i32)] = &[
        (
            "TC001",
            "tc001.jpg",
            "Tortas Cuadradas",
            "Torta Cuadrada de Chocolate",
            45000,
            "Deliciosa torta de chocolate con capas de ganache y un toque de avellanas. Personalizable con mensajes especiales.",
            true,
            10,
        ),
        (
            "TC002",
            "tc002.jpg",
            "Tortas Cuadradas",
            "Torta Cuadrada de Frutas",
            50000,
            "Una mezcla de frutas frescas y crema chantilly sobre un suave bizcocho de vainilla, ideal para celebraciones.",
            false,
            8,
        ),
        (
            "TT001",
            "tt001.jpg",
            "Tortas Circulares",
            "Torta Circular de Vainilla",
            40000,
            "Bizcocho de vainilla clásico relleno con crema pastelera y cubierto con un glaseado dulce, perfecto para cualquier ocasión.",
            false,
            12,
        ),
        (
            "TT002",
            "tt002.jpg",
            "Tortas Circulares",
            "Torta Circular de Manjar",
            42000,
            "Torta tradicional chilena con manjar y nueces, un deleite para los amantes de los sabores dulces y clásicos.",
            false,
            15,
        ),
        (
            "P1001",
            "pi001.jpg",
            "Postres Individuales",
            "Mousse de Chocolate",
            5000,
            "Postre individual cremoso y suave, hecho con chocolate de alta calidad, ideal para los amantes del chocolate.",
            false,
            20,
        ),
        (
            "P1002",
            "pi002.jpg",
            "Postres Individuales",
            "Tiramisú Clásico",
            5500,
            "Un postre italiano individual con capas de café, mascarpone y cacao, perfecto para finalizar cualquier comida.",
            false,
            18,
        ),
        (
            "PSA001",
            "psa001.jpg",
            "Productos Sin Azúcar",
            "Torta Sin Azúcar de Naranja",
            48000,
            "Torta ligera y deliciosa, endulzada naturalmente, ideal para quienes buscan opciones más saludables.",
            false,
            8,
        ),
        (
            "PSA002",
            "psa002.jpg",
            "Productos Sin Azúcar",
            "Cheesecake Sin Azúcar",
            47000,
            "Suave y cremoso, este cheesecake es una opción perfecta para disfrutar sin culpa.",
            false,
            6,
        ),
        (
            "PT001",
            "pt001.jpg",
            "Pastelería Tradicional",
            "Empanada de Manzana",
            3000,
            "Pastelería tradicional rellena de manzanas especiadas, perfecta para un dulce desayuno o merienda.",
            false,
            25,
        ),
        (
            "PT002",
            "pt002.jpg",
            "Pastelería Tradicional",
            "Tarta de Santiago",
            6000,
            "Tradicional tarta española hecha con almendras, azúcar, y huevos, una delicia para los amantes de los postres clásicos.",
            false,
            15,
        ),
        (
            "PG001",
            "pg001.jpg",
            "Productos Sin Gluten",
            "Brownie Sin Gluten",
            4000,
            "Rico y denso, este brownie es perfecto para quienes necesitan evitar el gluten sin sacrificar el sabor.",
            false,
            30,
        ),
        (
            "PG002",
            "pg002.jpg",
            "Productos Sin Gluten",
            "Pan Sin Gluten",
            3500,
            "Suave y esponjoso, ideal para sandwiches o para acompañar cualquier comida.",
            false,
            40,
        ),
        (
            "PV001",
            "pv001.jpg",
            "Productos Vegana",
            "Torta Vegana de Chocolate",
            50000,
            "Torta de chocolate húmeda y deliciosa, hecha sin productos de origen animal, perfecta para veganos.",
            false,
            10,
        ),
        (
            "PV002",
            "pv002.jpg",
            "Productos Vegana",
            "Galletas Veganas de Avena",
            4500,
            "Crujientes y sabrosas, estas galletas son una excelente opción para un snack saludable y vegano.",
            false,
            45,
        ),
        (
            "TE001",
            "te001.jpg",
            "Tortas Especiales",
            "Torta Especial de Cumpleaños",
            55000,
            "Diseñada especialmente para celebraciones, personalizable con decoraciones y mensajes únicos.",
            true,
            5,
        ),
        (
            "TE002",
            "te002.jpg",
            "Tortas Especiales",
            "Torta Especial de Boda",
            60000,
            "Elegante y deliciosa, esta torta está diseñada para ser el centro de atención en cualquier boda.",
            true,
            3,
        ),
    ];

    let now = Utc::now();
    ITEMS
        .iter()
        .map(
            |&(id, image, category, name, price, description, personalizable, stock)| Product {
                id: id.to_string(),
                name: name.to_string(),
                description: description.to_string(),
                price,
                category: category.to_string(),
                stock,
                image: Some(image.to_string()),
                personalizable,
                created_at: now,
            },
        )
        .collect()
}
