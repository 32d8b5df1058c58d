//! Order pricing: subtotal, per-user discount and total.
//!
//! Amounts are integer currency units. The discount is floored, so it never
//! exceeds the subtotal and `subtotal - discount == total` holds exactly.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::error::AppError;

pub const SENIOR_AGE: i32 = 50;
pub const SENIOR_DISCOUNT_PERCENT: i32 = 50;
pub const PROMO_CODE: &str = "FELICES50";
pub const PROMO_DISCOUNT_PERCENT: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
pub struct PriceBreakdown {
    pub subtotal: i64,
    pub discount_percent: i32,
    pub discount: i64,
    pub total: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("line has a negative price or quantity")]
    NegativeLine,
    #[error("order amount is too large")]
    Overflow,
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Prices `(unit_price, quantity)` lines with a percentage discount.
pub fn price_lines<I>(lines: I, discount_percent: i32) -> Result<PriceBreakdown, PricingError>
where
    I: IntoIterator<Item = (i64, i32)>,
{
    let mut subtotal: i64 = 0;
    for (unit_price, quantity) in lines {
        if unit_price < 0 || quantity < 0 {
            return Err(PricingError::NegativeLine);
        }
        let line = unit_price
            .checked_mul(i64::from(quantity))
            .ok_or(PricingError::Overflow)?;
        subtotal = subtotal.checked_add(line).ok_or(PricingError::Overflow)?;
    }

    let discount_percent = discount_percent.clamp(0, 100);
    let discount = discount_amount(subtotal, discount_percent);
    Ok(PriceBreakdown {
        subtotal,
        discount_percent,
        discount,
        total: subtotal - discount,
    })
}

pub fn discount_amount(subtotal: i64, discount_percent: i32) -> i64 {
    let pct = i128::from(discount_percent.clamp(0, 100));
    (i128::from(subtotal.max(0)) * pct / 100) as i64
}

/// Discount granted at sign-up: the larger of the senior tier and the promo bonus.
pub fn registration_discount(age: Option<i32>, promo_code: Option<&str>) -> i32 {
    let by_age = match age {
        Some(age) if age >= SENIOR_AGE => SENIOR_DISCOUNT_PERCENT,
        _ => 0,
    };
    let by_code = match promo_code.map(str::trim) {
        Some(code) if code.eq_ignore_ascii_case(PROMO_CODE) => PROMO_DISCOUNT_PERCENT,
        _ => 0,
    };
    by_age.max(by_code)
}
