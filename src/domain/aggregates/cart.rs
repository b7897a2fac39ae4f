//! Cart Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::domain::aggregates::Product;
use crate::domain::events::CartEvent;
use crate::domain::value_objects::{DiscountCode, ProductId};
use crate::pricing::{self, ApiCartLine};
use crate::CartError;

/// One purchasable line. Display fields and stock are a snapshot taken when
/// the product was added.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_line_amounts"))]
pub struct CartLine {
    pub id: ProductId,
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "rust_decimal::serde::float_option")]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub image: String,
    #[validate(range(min = 1))]
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub available_stock: u32,
}

impl CartLine {
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            category: product.category.clone(),
            price: product.price,
            original_price: product.original_price,
            image: product.image.clone(),
            quantity,
            size: None,
            color: None,
            available_stock: product.stock(),
        }
    }

    /// `price * quantity`, saturating at [`Decimal::MAX`].
    pub fn line_total(&self) -> Decimal { self.price.saturating_mul(Decimal::from(self.quantity)) }
    pub fn checked_line_total(&self) -> Option<Decimal> { self.price.checked_mul(Decimal::from(self.quantity)) }
    pub fn is_out_of_stock(&self) -> bool { self.available_stock == 0 }
}

fn validate_line_amounts(line: &CartLine) -> Result<(), ValidationError> {
    if line.price.is_sign_negative() || line.original_price.is_some_and(|p| p.is_sign_negative()) {
        return Err(ValidationError::new("negative_price"));
    }
    if !line.is_out_of_stock() && line.quantity > line.available_stock {
        return Err(ValidationError::new("quantity_exceeds_stock"));
    }
    Ok(())
}

/// Shipping choice offered at checkout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingOption {
    pub id: u32,
    pub name: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub estimated_days: u32,
}

impl ShippingOption {
    /// Options offered when the remote list cannot be fetched.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                id: 1,
                name: "Livraison Standard".into(),
                description: "Livraison sous 5-7 jours ouvrables".into(),
                price: Decimal::ZERO,
                estimated_days: 7,
            },
            Self {
                id: 2,
                name: "Livraison Express".into(),
                description: "Livraison sous 2-3 jours ouvrables".into(),
                price: Decimal::from(5000),
                estimated_days: 3,
            },
        ]
    }
}

/// The cart. `subtotal` and `total` are derived from the lines on every
/// mutation and never set directly.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_cart_amounts"))]
pub struct Cart {
    #[validate]
    items: Vec<CartLine>,
    #[serde(default, with = "rust_decimal::serde::float")]
    total: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    subtotal: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    shipping: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "rust_decimal::serde::float_option")]
    discount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    discount_code: Option<DiscountCode>,
    #[serde(skip)]
    events: Vec<CartEvent>,
}

fn validate_cart_amounts(cart: &Cart) -> Result<(), ValidationError> {
    if cart.shipping.is_sign_negative() || cart.discount.is_some_and(|d| d.is_sign_negative()) {
        return Err(ValidationError::new("negative_amount"));
    }
    if pricing::checked_subtotal(&cart.items).and_then(|s| s.checked_add(cart.shipping)).is_none() {
        return Err(ValidationError::new("amount_overflow"));
    }
    Ok(())
}

impl PartialEq for Cart {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
            && self.total == other.total
            && self.subtotal == other.subtotal
            && self.shipping == other.shipping
            && self.discount == other.discount
            && self.discount_code == other.discount_code
    }
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    /// Shape-check a cart that came from storage or the remote API and
    /// rebuild its derived totals.
    pub fn restore(mut cart: Cart) -> Result<Self, ValidationErrors> {
        cart.validate()?;
        cart.events.clear();
        cart.recalculate();
        Ok(cart)
    }

    pub fn items(&self) -> &[CartLine] { &self.items }
    pub fn subtotal(&self) -> Decimal { self.subtotal }
    pub fn total(&self) -> Decimal { self.total }
    pub fn shipping(&self) -> Decimal { self.shipping }
    pub fn discount(&self) -> Option<Decimal> { self.discount }
    pub fn discount_code(&self) -> Option<&DiscountCode> { self.discount_code.as_ref() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn unique_items(&self) -> usize { self.items.len() }
    pub fn item_count(&self) -> u64 { self.items.iter().map(|i| u64::from(i.quantity)).sum() }
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> { self.items.iter().find(|i| i.id == product_id) }
    pub fn contains(&self, product_id: ProductId) -> bool { self.line(product_id).is_some() }
    pub fn product_ids(&self) -> Vec<ProductId> { self.items.iter().map(|i| i.id).collect() }

    /// Adds `quantity` units of `product`, merging into an existing line for
    /// the same product. Fails without touching the cart when the line would
    /// exceed its stock snapshot.
    pub fn add_product(&mut self, product: &Product, quantity: u32) -> Result<(), CartError> {
        let quantity = quantity.max(1);
        let line = if let Some(existing) = self.items.iter_mut().find(|i| i.id == product.id) {
            let requested = existing.quantity.saturating_add(quantity);
            if existing.is_out_of_stock() || requested > existing.available_stock {
                return Err(CartError::StockExceeded { product_id: product.id, available: existing.available_stock });
            }
            existing.quantity = requested;
            ApiCartLine { quantity, ..ApiCartLine::from(&*existing) }
        } else {
            if !product.is_in_stock() {
                return Err(CartError::StockExceeded { product_id: product.id, available: 0 });
            }
            let line = CartLine::from_product(product, quantity);
            if quantity > line.available_stock {
                return Err(CartError::StockExceeded { product_id: product.id, available: line.available_stock });
            }
            let payload = ApiCartLine::from(&line);
            self.items.push(line);
            payload
        };
        self.raise_event(CartEvent::ItemAdded { line });
        self.recalculate();
        Ok(())
    }

    /// Sets a line's quantity. Returns `Ok(false)` when no line matches.
    /// Raising the quantity past the line's stock snapshot is refused;
    /// lowering it is always allowed.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> Result<bool, CartError> {
        if quantity == 0 {
            return Ok(self.remove_line(product_id));
        }
        let Some(line) = self.items.iter_mut().find(|i| i.id == product_id) else { return Ok(false) };
        if quantity > line.quantity && quantity > line.available_stock {
            return Err(CartError::StockExceeded { product_id, available: line.available_stock });
        }
        line.quantity = quantity;
        self.raise_event(CartEvent::QuantityUpdated { product_id, quantity });
        self.recalculate();
        Ok(true)
    }

    /// Returns whether a line was removed.
    pub fn remove_line(&mut self, product_id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.id != product_id);
        if self.items.len() == before { return false; }
        self.raise_event(CartEvent::ItemRemoved { product_id });
        self.recalculate();
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.shipping = Decimal::ZERO;
        self.discount = None;
        self.discount_code = None;
        self.raise_event(CartEvent::Cleared);
        self.recalculate();
    }

    /// Applies `code` as a percentage of the current subtotal, replacing any
    /// previous discount. Returns the discount amount.
    pub fn apply_discount(&mut self, code: DiscountCode) -> Result<Decimal, CartError> {
        let rate = code.rate().ok_or(CartError::InvalidDiscountCode)?;
        let amount = self.subtotal * rate;
        self.discount = Some(amount);
        self.discount_code = Some(code.clone());
        self.raise_event(CartEvent::DiscountApplied { code });
        self.recalculate();
        Ok(amount)
    }

    pub fn remove_discount(&mut self) {
        self.discount = None;
        self.discount_code = None;
        self.raise_event(CartEvent::DiscountRemoved);
        self.recalculate();
    }

    /// Sets the shipping amount locally. Negative amounts count as free shipping.
    pub fn set_shipping(&mut self, amount: Decimal) {
        self.shipping = amount.max(Decimal::ZERO);
        self.recalculate();
    }

    pub fn select_shipping(&mut self, option: &ShippingOption) {
        self.set_shipping(option.price);
        self.raise_event(CartEvent::ShippingOptionSelected { option_id: option.id });
    }

    pub fn take_events(&mut self) -> Vec<CartEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: CartEvent) { self.events.push(e); }

    fn recalculate(&mut self) {
        self.subtotal = pricing::calculate_subtotal(&self.items);
        self.discount = self.discount.map(|d| d.min(self.subtotal)).filter(|d| *d > Decimal::ZERO);
        if self.discount.is_none() { self.discount_code = None; }
        self.total = pricing::calculate_total(&self.items, self.shipping, self.discount.unwrap_or_default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    fn product(id: u32, price: i64, stock: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            category: "HAUTE COUTURE".into(),
            price: Decimal::from(price),
            original_price: None,
            image: format!("/p{id}.jpg"),
            available_stock: Some(stock),
        }
    }

    #[test]
    fn test_add_merges_and_respects_stock() -> TestResult {
        let mut cart = Cart::new();
        let a = product(1, 1000, 2);
        cart.add_product(&a, 1)?;
        cart.add_product(&a, 1)?;
        assert_eq!(cart.unique_items(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.subtotal(), Decimal::from(2000));

        let err = cart.add_product(&a, 1).unwrap_err();
        assert!(matches!(err, CartError::StockExceeded { available: 2, .. }));
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.take_events().len(), 2);
        Ok(())
    }

    #[test]
    fn test_add_out_of_stock_product() {
        let mut cart = Cart::new();
        assert!(cart.add_product(&product(9, 500, 0), 1).is_err());
        assert!(cart.is_empty());
        assert!(cart.take_events().is_empty());
    }

    #[test]
    fn test_add_event_carries_the_delta() -> TestResult {
        let mut cart = Cart::new();
        let a = product(1, 1000, 5);
        cart.add_product(&a, 1)?;
        cart.add_product(&a, 3)?;
        assert_eq!(cart.items()[0].quantity, 4);
        let deltas: Vec<u32> = cart
            .take_events()
            .into_iter()
            .filter_map(|e| match e { CartEvent::ItemAdded { line } => Some(line.quantity), _ => None })
            .collect();
        assert_eq!(deltas, vec![1, 3]);
        Ok(())
    }

    #[test]
    fn test_add_to_sold_out_line() -> TestResult {
        let stored: Cart = serde_json::from_str(r#"{"items":[{"id":1,"name":"X","price":10,"quantity":2,"availableStock":0}]}"#)?;
        let mut cart = Cart::restore(stored)?;
        let err = cart.add_product(&product(1, 10, 5), 1).unwrap_err();
        assert!(matches!(err, CartError::StockExceeded { available: 0, .. }));
        assert_eq!(cart.items()[0].quantity, 2);
        Ok(())
    }

    #[test]
    fn test_set_quantity() -> TestResult {
        let mut cart = Cart::new();
        cart.add_product(&product(1, 1000, 5), 1)?;
        assert!(cart.set_quantity(ProductId::new(1), 4)?);
        assert_eq!(cart.total(), Decimal::from(4000));
        assert!(cart.set_quantity(ProductId::new(1), 6).is_err());
        assert_eq!(cart.items()[0].quantity, 4);
        assert!(!cart.set_quantity(ProductId::new(2), 3)?);
        assert!(cart.set_quantity(ProductId::new(1), 0)?);
        assert!(cart.is_empty());
        Ok(())
    }

    #[test]
    fn test_discount_overwrites_rather_than_stacks() -> TestResult {
        let mut cart = Cart::new();
        cart.add_product(&product(1, 10_000, 5), 1)?;
        cart.set_shipping(Decimal::from(5000));

        let amount = cart.apply_discount(DiscountCode::new("WELCOME10")?)?;
        assert_eq!(amount, Decimal::from(1000));
        assert_eq!(cart.discount(), Some(Decimal::from(1000)));
        assert_eq!(cart.total(), Decimal::from(10_000 - 1000 + 5000));

        cart.apply_discount(DiscountCode::new("SUMMER20")?)?;
        assert_eq!(cart.discount(), Some(Decimal::from(2000)));
        assert_eq!(cart.discount_code().map(DiscountCode::as_str), Some("SUMMER20"));

        assert!(matches!(cart.apply_discount(DiscountCode::new("FAKE")?), Err(CartError::InvalidDiscountCode)));
        assert_eq!(cart.discount(), Some(Decimal::from(2000)));

        cart.remove_discount();
        assert_eq!(cart.discount(), None);
        assert_eq!(cart.total(), Decimal::from(15_000));
        Ok(())
    }

    #[test]
    fn test_removing_last_line_leaves_shipping() -> TestResult {
        let mut cart = Cart::new();
        cart.add_product(&product(1, 3000, 5), 1)?;
        cart.set_shipping(Decimal::from(5000));
        cart.apply_discount(DiscountCode::new("VIP30")?)?;
        assert!(cart.remove_line(ProductId::new(1)));
        assert_eq!(cart.unique_items(), 0);
        assert_eq!(cart.subtotal(), Decimal::ZERO);
        assert_eq!(cart.total(), cart.shipping());
        assert_eq!(cart.discount(), None);
        assert_eq!(cart.discount_code(), None);
        assert!(!cart.remove_line(ProductId::new(1)));
        Ok(())
    }

    #[test]
    fn test_clear_resets_shipping_and_discount() -> TestResult {
        let mut cart = Cart::new();
        cart.add_product(&product(1, 3000, 5), 2)?;
        cart.set_shipping(Decimal::from(5000));
        cart.apply_discount(DiscountCode::new("WELCOME10")?)?;
        cart.take_events();
        cart.clear();
        assert_eq!(cart, Cart::new());
        assert_eq!(cart.take_events(), vec![CartEvent::Cleared]);
        Ok(())
    }

    #[test]
    fn test_json_round_trip() -> TestResult {
        let mut cart = Cart::new();
        let mut dress = product(1, 26_600, 5);
        dress.original_price = Some(Decimal::from(38_000));
        cart.add_product(&dress, 2)?;
        cart.add_product(&product(2, 28_000, 10), 1)?;
        cart.set_shipping(Decimal::from(5000));
        cart.apply_discount(DiscountCode::new("VIP30")?)?;

        let json = serde_json::to_string(&cart)?;
        let reloaded = Cart::restore(serde_json::from_str(&json)?)?;
        assert_eq!(reloaded, cart);
        Ok(())
    }

    #[test]
    fn test_restore_rejects_bad_shape() -> TestResult {
        let zero_quantity: Cart = serde_json::from_str(
            r#"{"items":[{"id":1,"name":"X","price":10,"quantity":0,"availableStock":3}],"total":0,"subtotal":0,"shipping":0}"#,
        )?;
        assert!(Cart::restore(zero_quantity).is_err());

        let negative_shipping: Cart = serde_json::from_str(r#"{"items":[],"shipping":-5}"#)?;
        assert!(Cart::restore(negative_shipping).is_err());

        let over_stock: Cart = serde_json::from_str(r#"{"items":[{"id":1,"name":"X","price":10,"quantity":4,"availableStock":3}]}"#)?;
        assert!(Cart::restore(over_stock).is_err());

        let sold_out: Cart = serde_json::from_str(r#"{"items":[{"id":1,"name":"X","price":10,"quantity":4,"availableStock":0}]}"#)?;
        assert!(Cart::restore(sold_out).is_ok());
        Ok(())
    }

    #[test]
    fn test_restore_rejects_overflowing_amounts() -> TestResult {
        let huge: Cart = serde_json::from_str(r#"{"items":[{"id":1,"name":"X","price":1e28,"quantity":10,"availableStock":10}]}"#)?;
        let errors = Cart::restore(huge).unwrap_err();
        assert!(errors.to_string().contains("amount_overflow"), "{errors}");
        Ok(())
    }

    #[test]
    fn test_restore_recomputes_totals() -> TestResult {
        let stale: Cart = serde_json::from_str(
            r#"{"items":[{"id":1,"name":"X","price":100,"quantity":3,"availableStock":3}],"total":1,"subtotal":1,"shipping":50}"#,
        )?;
        let cart = Cart::restore(stale)?;
        assert_eq!(cart.subtotal(), Decimal::from(300));
        assert_eq!(cart.total(), Decimal::from(350));
        Ok(())
    }
}
