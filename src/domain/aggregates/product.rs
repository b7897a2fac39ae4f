//! Product snapshots and catalog lookup

use std::path::Path;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::ProductId;
use crate::storage::StorageError;
use crate::CartError;

/// Stock assumed for catalog entries that do not carry one.
pub const DEFAULT_AVAILABLE_STOCK: u32 = 10;

/// Display data and stock for one product, as the catalog reports it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "rust_decimal::serde::float_option")]
    pub original_price: Option<Decimal>,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_stock: Option<u32>,
}

impl Product {
    pub fn stock(&self) -> u32 { self.available_stock.unwrap_or(DEFAULT_AVAILABLE_STOCK) }
    pub fn is_in_stock(&self) -> bool { self.stock() > 0 }
}

/// Resolves product display data for `add_to_cart`.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn product(&self, id: ProductId) -> Result<Product, CartError>;
}

/// In-memory catalog snapshot.
#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    products: Vec<Product>,
}

impl StaticCatalog {
    pub fn new(products: Vec<Product>) -> Self { Self { products } }

    /// The products the storefront's cart ships with.
    pub fn storefront() -> Self {
        Self::new(vec![
            Product {
                id: ProductId::new(1),
                name: "ROBE SCULPTURALE NOIR".into(),
                category: "HAUTE COUTURE".into(),
                price: Decimal::from(26_600),
                original_price: Some(Decimal::from(38_000)),
                image: "/robe-noir.jpg".into(),
                available_stock: Some(5),
            },
            Product {
                id: ProductId::new(2),
                name: "SAC SCULPTÉ CUIR".into(),
                category: "ACCESSOIRES".into(),
                price: Decimal::from(28_000),
                original_price: Some(Decimal::from(35_000)),
                image: "/sac-en-cuir.jpg".into(),
                available_stock: Some(10),
            },
        ])
    }

    /// Load a catalog from a JSON array of products.
    pub fn from_json_file(path: &Path) -> Result<Self, StorageError> {
        let raw = std::fs::read_to_string(path)?;
        let products: Vec<Product> = serde_json::from_str(&raw)?;
        Ok(Self::new(products))
    }

    pub fn products(&self) -> &[Product] { &self.products }
}

#[async_trait]
impl ProductCatalog for StaticCatalog {
    async fn product(&self, id: ProductId) -> Result<Product, CartError> {
        self.products
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(CartError::ProductNotFound(id))
    }
}
