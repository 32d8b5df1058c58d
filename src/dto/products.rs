use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Product;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductDto {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub category: String,
    pub stock: i32,
    pub image: Option<String>,
    /// Browser-loadable image location, placeholder when the product has none
    pub image_url: String,
    pub personalizable: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Product> for ProductDto {
    fn from(product: Product) -> Self {
        let image_url = product.image_url();
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            category: product.category,
            stock: product.stock,
            image: product.image,
            image_url,
            personalizable: product.personalizable,
            created_at: product.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    /// Product code, 4 to 6 letters or digits; generated when omitted
    #[serde(alias = "codigo")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    pub category: String,
    #[serde(default)]
    pub stock: i32,
    pub image: Option<String>,
    #[serde(default)]
    pub personalizable: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub category: Option<String>,
    pub stock: Option<i32>,
    pub image: Option<String>,
    pub personalizable: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetStockRequest {
    #[serde(alias = "nuevoStock")]
    pub stock: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InventoryAdjustRequest {
    pub delta: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<ProductDto>)]
    pub items: Vec<ProductDto>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryList {
    #[schema(value_type = Vec<String>)]
    pub items: Vec<String>,
}
