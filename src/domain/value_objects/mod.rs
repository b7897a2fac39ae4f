//! Value Objects for the storefront cart

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog product identifier. Cart lines are keyed by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(u32);

impl ProductId {
    pub const fn new(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
}

impl From<u32> for ProductId {
    fn from(value: u32) -> Self { Self(value) }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Promo codes the storefront honours, with their fractional rate.
const DISCOUNT_RATES: [(&str, i64); 3] = [("WELCOME10", 10), ("SUMMER20", 20), ("VIP30", 30)];

/// Promo code value object, normalized to trimmed upper case.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscountCode(String);

impl DiscountCode {
    pub fn new(value: impl Into<String>) -> Result<Self, DiscountCodeError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(DiscountCodeError::Empty); }
        if value.len() > 32 { return Err(DiscountCodeError::TooLong); }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str { &self.0 }

    /// Fraction of the subtotal this code takes off, if the code is known.
    pub fn rate(&self) -> Option<Decimal> {
        DISCOUNT_RATES
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, percent)| Decimal::new(*percent, 2))
    }
}

impl fmt::Display for DiscountCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum DiscountCodeError { Empty, TooLong }
impl std::error::Error for DiscountCodeError {}
impl fmt::Display for DiscountCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Empty => write!(f, "Discount code empty"), Self::TooLong => write!(f, "Discount code too long") }
    }
}
