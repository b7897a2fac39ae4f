//! Domain events
use crate::domain::value_objects::{DiscountCode, ProductId};
use crate::pricing::ApiCartLine;

/// Raised by the cart aggregate for every change the remote cart should mirror.
#[derive(Clone, Debug, PartialEq)]
pub enum CartEvent {
    ItemAdded { line: ApiCartLine },
    QuantityUpdated { product_id: ProductId, quantity: u32 },
    ItemRemoved { product_id: ProductId },
    Cleared,
    DiscountApplied { code: DiscountCode },
    DiscountRemoved,
    ShippingOptionSelected { option_id: u32 },
}
