use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Order, OrderItem, PaymentMethod};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CardDetails {
    pub number: String,
    /// MM/YY
    pub expiry: String,
    pub holder: String,
    pub cvv: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    /// One of the saved addresses or a new one; defaults to the first saved address
    #[serde(alias = "direccionEnvio")]
    pub delivery_address: Option<String>,
    #[serde(alias = "metodoPago")]
    pub payment_method: PaymentMethod,
    pub card: Option<CardDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct OrderList {
    #[schema(value_type = Vec<Order>)]
    pub items: Vec<Order>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    #[serde(alias = "estado")]
    pub status: String,
}
