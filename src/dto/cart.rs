use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{dto::products::ProductDto, pricing::PriceBreakdown};

fn one() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: String,
    #[serde(default = "one")]
    pub quantity: i32,
    /// Message written on the product, only for personalizable items
    pub personalization: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemDto {
    pub product: ProductDto,
    pub quantity: i32,
    pub personalization: Option<String>,
    pub line_total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartItemDto>,
    pub item_count: i64,
    pub summary: PriceBreakdown,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineUpdate {
    pub product_id: String,
    /// Line quantity after the change, 0 when the line was removed
    pub quantity: i32,
    /// The requested quantity exceeded the available stock
    pub capped: bool,
}
