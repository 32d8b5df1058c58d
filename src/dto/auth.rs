use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::users::UserProfile;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddressInput {
    pub street: String,
    pub number: String,
    pub region: String,
    pub commune: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: Option<String>,
    /// Required; absent values are reported as field errors
    pub phone: Option<String>,
    /// Required; registrants must be 18 to 99 years old
    pub birth_date: Option<NaiveDate>,
    /// Required first delivery address
    pub address: Option<AddressInput>,
    pub promo_code: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub user: UserProfile,
    /// Perks granted at sign-up, e.g. the discount applied to the account
    pub benefits: Vec<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Guest cart to carry over into the account
    pub guest_cart_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
    pub cart_migrated: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: usize,
}
