//! Pricing and quantity utilities
//!
//! Pure functions over cart lines. Amounts are whole CFA francs carried as
//! [`Decimal`] so percentage discounts stay exact.

use rust_decimal::{Decimal, RoundingStrategy};
use rusty_money::{iso, Formatter, Money, Params, Position};
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::CartLine;
use crate::domain::value_objects::ProductId;

const GROUP_SEPARATOR: &str = "\u{202F}";
const CURRENCY_SUFFIX: &str = "\u{A0}F\u{A0}CFA";

/// Renders an amount the way the storefront displays prices (`26 600 F CFA`),
/// rounded half away from zero to whole francs.
pub fn format_price(amount: Decimal) -> String {
    let francs = Money::from_decimal(amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero), iso::XOF);
    // The formatter indexes its digit string by byte, so group with an ASCII
    // space and swap in the narrow no-break space afterwards.
    let params = Params {
        digit_separator: ' ',
        separator_pattern: &[3; 10],
        positions: &[Position::Sign, Position::Amount],
        rounding: Some(0),
        ..Params::default()
    };
    let mut formatted = Formatter::money(&francs, params).replace(' ', GROUP_SEPARATOR);
    formatted.push_str(CURRENCY_SUFFIX);
    formatted
}

/// Sum of `price * quantity` over all lines, saturating at [`Decimal::MAX`].
pub fn calculate_subtotal(lines: &[CartLine]) -> Decimal {
    lines.iter().fold(Decimal::ZERO, |acc, line| acc.saturating_add(line.line_total()))
}

/// Like [`calculate_subtotal`], but `None` when the sum does not fit in a
/// [`Decimal`].
pub fn checked_subtotal(lines: &[CartLine]) -> Option<Decimal> {
    lines.iter().try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.checked_line_total()?))
}

/// `subtotal + shipping - discount`. Not clamped.
pub fn calculate_total(lines: &[CartLine], shipping: Decimal, discount: Decimal) -> Decimal {
    calculate_subtotal(lines).saturating_add(shipping).saturating_sub(discount)
}

pub fn is_cart_empty(lines: &[CartLine]) -> bool {
    lines.is_empty()
}

/// Applies `change` to `current_quantity`, bounded below by 1 and above by
/// `available_stock`. A result of 0 only happens when stock is 0 and means the
/// change is blocked.
pub fn validate_quantity(current_quantity: u32, change: i32, available_stock: u32) -> u32 {
    let requested = i64::from(current_quantity) + i64::from(change);
    if requested < 1 {
        return 1;
    }
    u32::try_from(requested).map_or(available_stock, |quantity| quantity.min(available_stock))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockStatus {
    pub is_available: bool,
    pub message: String,
}

pub fn check_stock_availability(line: &CartLine) -> StockStatus {
    if line.quantity > line.available_stock {
        return StockStatus {
            is_available: false,
            message: format!("Stock insuffisant. Disponible : {}", line.available_stock),
        };
    }
    if line.available_stock == 0 {
        return StockStatus { is_available: false, message: "Produit épuisé".into() };
    }
    StockStatus { is_available: true, message: String::new() }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    pub item_count: u64,
    pub unique_items: usize,
    pub formatted_subtotal: String,
}

pub fn generate_cart_summary(lines: &[CartLine]) -> CartSummary {
    let subtotal = calculate_subtotal(lines);
    CartSummary {
        subtotal,
        item_count: lines.iter().map(|line| u64::from(line.quantity)).sum(),
        unique_items: lines.len(),
        formatted_subtotal: format_price(subtotal),
    }
}

/// Wire projection of a cart line for the remote cart API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl From<&CartLine> for ApiCartLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.id,
            quantity: line.quantity,
            size: line.size.clone().filter(|s| !s.is_empty()),
            color: line.color.clone().filter(|c| !c.is_empty()),
        }
    }
}

pub fn format_cart_for_api(lines: &[CartLine]) -> Vec<ApiCartLine> {
    lines.iter().map(ApiCartLine::from).collect()
}
