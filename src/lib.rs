//! Storefront Cart
//!
//! Client-side cart engine for the storefront: line bookkeeping, price and
//! discount arithmetic, local persistence and best-effort mirroring to the
//! remote cart API.
//!
//! ## Features
//! - Pricing utilities (formatting, subtotal/total, stock checks)
//! - Cart aggregate with derived totals
//! - Local key/value persistence with guarded reloads
//! - Remote cart gateway over HTTP
//! - Cart controller with optimistic updates and one-shot reconciliation

pub mod config;
pub mod controller;
pub mod domain;
pub mod gateway;
pub mod pricing;
pub mod storage;

use thiserror::Error;

pub use controller::{CartController, CartOutcome, Navigation};
pub use domain::aggregates::{Cart, CartLine, Product, ProductCatalog, ShippingOption, StaticCatalog};
pub use domain::value_objects::{DiscountCode, ProductId};
pub use gateway::{CartGateway, GatewayError, HttpCartGateway};
pub use storage::{FileStore, KeyValueStore, LocalCartStore, MemoryStore, StorageError};

// =============================================================================
// Error Types
// =============================================================================

/// Everything a cart operation can fail with. Messages are the storefront's
/// user-facing wording.
#[derive(Error, Debug)]
pub enum CartError {
    #[error("Stock insuffisant")]
    StockExceeded { product_id: ProductId, available: u32 },

    #[error("Code promo invalide")]
    InvalidDiscountCode,

    #[error("Votre panier est vide")]
    EmptyCart,

    #[error("Produit non trouvé")]
    ProductNotFound(ProductId),

    #[error("Panier distant invalide")]
    InvalidRemoteCart,

    #[error(transparent)]
    RemoteSync(#[from] GatewayError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, CartError>;
