//! Aggregates module
pub mod product;
pub mod cart;

pub use product::{Product, ProductCatalog, StaticCatalog, DEFAULT_AVAILABLE_STOCK};
pub use cart::{Cart, CartLine, ShippingOption};
