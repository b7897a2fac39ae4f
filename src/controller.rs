//! Cart state controller
//!
//! Owns the session's [`Cart`]. Every mutation is applied and persisted
//! locally first; when a session token exists the change is then mirrored to
//! the remote cart. A failed mirror never rolls the local cart back.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::aggregates::{Cart, ProductCatalog, ShippingOption};
use crate::domain::events::CartEvent;
use crate::domain::value_objects::{DiscountCode, ProductId};
use crate::gateway::CartGateway;
use crate::pricing::{self, CartSummary};
use crate::storage::{KeyValueStore, LocalCartStore};
use crate::{CartError, Result};

pub const CHECKOUT_PATH: &str = "/checkout";
pub const LOGIN_PATH: &str = "/login";

/// Result of a cart operation as the UI consumes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CartOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CartOutcome {
    fn succeeded(message: Option<String>) -> Self { Self { success: true, message, error: None } }
    fn failed(error: String) -> Self { Self { success: false, message: None, error: Some(error) } }
}

/// Where the UI should go after `proceed_to_checkout`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Navigation {
    Checkout,
    /// Not signed in; the checkout path was stored as the post-login redirect.
    Login,
}

impl Navigation {
    pub fn path(&self) -> &'static str {
        match self { Self::Checkout => CHECKOUT_PATH, Self::Login => LOGIN_PATH }
    }
}

pub struct CartController {
    cart: Cart,
    is_loading: bool,
    error: Option<String>,
    is_synced: bool,
    last_updated: Option<DateTime<Utc>>,
    store: LocalCartStore,
    gateway: Arc<dyn CartGateway>,
    catalog: Arc<dyn ProductCatalog>,
}

impl fmt::Debug for CartController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartController")
            .field("cart", &self.cart)
            .field("is_loading", &self.is_loading)
            .field("error", &self.error)
            .field("is_synced", &self.is_synced)
            .field("last_updated", &self.last_updated)
            .finish_non_exhaustive()
    }
}

impl CartController {
    /// Creates the controller with the cart persisted in `store`, or an empty
    /// one.
    pub fn new(store: Arc<dyn KeyValueStore>, gateway: Arc<dyn CartGateway>, catalog: Arc<dyn ProductCatalog>) -> Self {
        let store = LocalCartStore::new(store);
        Self {
            cart: store.load_cart(),
            is_loading: false,
            error: None,
            is_synced: false,
            last_updated: None,
            store,
            gateway,
            catalog,
        }
    }

    pub fn cart(&self) -> &Cart { &self.cart }
    pub fn is_loading(&self) -> bool { self.is_loading }
    pub fn error(&self) -> Option<&str> { self.error.as_deref() }
    pub fn is_synced(&self) -> bool { self.is_synced }
    pub fn last_updated(&self) -> Option<DateTime<Utc>> { self.last_updated }
    pub fn is_authenticated(&self) -> bool { self.store.auth_token().is_some() }
    pub fn is_in_cart(&self, product_id: ProductId) -> bool { self.cart.contains(product_id) }
    pub fn cart_item_ids(&self) -> Vec<ProductId> { self.cart.product_ids() }
    pub fn total_items(&self) -> u64 { self.cart.item_count() }
    pub fn summary(&self) -> CartSummary { pricing::generate_cart_summary(self.cart.items()) }

    pub fn set_error(&mut self, error: impl Into<String>) { self.error = Some(error.into()); }
    pub fn clear_error(&mut self) { self.error = None; }

    /// Session start: runs the one-time reconciliation.
    pub async fn mount(&mut self) { self.sync_cart().await; }

    /// One-time reconciliation with the remote cart. A non-empty remote cart
    /// replaces the local one; otherwise local lines are pushed up. The latch
    /// is set whatever the outcome.
    pub async fn sync_cart(&mut self) {
        if self.is_synced { return; }
        let Some(token) = self.store.auth_token() else { return };

        self.is_loading = true;
        if let Err(e) = self.reconcile(&token).await {
            warn!(error = %e, "cart sync failed");
            self.error = Some(e.to_string());
        }
        self.is_synced = true;
        self.is_loading = false;
    }

    async fn reconcile(&mut self, token: &str) -> Result<()> {
        let remote = self.gateway.get_cart(token).await?;
        if !remote.is_empty() {
            let remote = Cart::restore(remote).map_err(|e| {
                warn!(error = %e, "remote cart failed shape check, keeping local cart");
                CartError::InvalidRemoteCart
            })?;
            info!(lines = remote.unique_items(), "adopting remote cart");
            self.cart = remote;
            self.persist()?;
        } else if !self.cart.is_empty() {
            info!(lines = self.cart.unique_items(), "pushing local cart to remote");
            self.gateway.sync(token, self.cart.items()).await?;
        }
        Ok(())
    }

    pub async fn add_to_cart(&mut self, product_id: ProductId, quantity: u32) -> CartOutcome {
        self.begin();
        let result = self.try_add_to_cart(product_id, quantity).await;
        self.finish(result)
    }

    async fn try_add_to_cart(&mut self, product_id: ProductId, quantity: u32) -> Result<Option<String>> {
        let product = self.catalog.product(product_id).await?;
        self.cart.add_product(&product, quantity)?;
        self.commit().await?;
        Ok(Some("Produit ajouté au panier".into()))
    }

    /// Sets a line's quantity; zero removes the line.
    pub async fn update_quantity(&mut self, product_id: ProductId, quantity: u32) -> CartOutcome {
        if quantity == 0 {
            return self.remove_from_cart(product_id).await;
        }
        self.begin();
        let result = self.try_update_quantity(product_id, quantity).await;
        self.finish(result)
    }

    async fn try_update_quantity(&mut self, product_id: ProductId, quantity: u32) -> Result<Option<String>> {
        if self.cart.set_quantity(product_id, quantity)? {
            self.commit().await?;
        }
        Ok(None)
    }

    pub async fn remove_from_cart(&mut self, product_id: ProductId) -> CartOutcome {
        self.begin();
        self.cart.remove_line(product_id);
        let result = self.commit().await.map(|()| Some("Produit retiré du panier".into()));
        self.finish(result)
    }

    pub async fn clear_cart(&mut self) -> CartOutcome {
        self.begin();
        self.cart.clear();
        let result = self.commit().await.map(|()| Some("Panier vidé".into()));
        self.finish(result)
    }

    pub async fn apply_discount(&mut self, code: &str) -> CartOutcome {
        self.begin();
        let result = self.try_apply_discount(code).await;
        self.finish(result)
    }

    async fn try_apply_discount(&mut self, code: &str) -> Result<Option<String>> {
        let code = DiscountCode::new(code).map_err(|_| CartError::InvalidDiscountCode)?;
        let amount = self.cart.apply_discount(code.clone())?;
        self.commit().await?;
        Ok(Some(format!("Code promo appliqué : {code} (-{})", pricing::format_price(amount))))
    }

    pub async fn remove_discount(&mut self) -> CartOutcome {
        self.begin();
        self.cart.remove_discount();
        let result = self.commit().await.map(|()| None);
        self.finish(result)
    }

    /// Sets the shipping amount. Local only; nothing is mirrored.
    pub async fn update_shipping(&mut self, amount: Decimal) -> CartOutcome {
        self.begin();
        self.cart.set_shipping(amount);
        let result = self.commit().await.map(|()| None);
        self.finish(result)
    }

    /// Shipping options from the API, or the built-in ones when there is no
    /// session or the call fails.
    pub async fn shipping_options(&self) -> Vec<ShippingOption> {
        let Some(token) = self.store.auth_token() else { return ShippingOption::defaults() };
        match self.gateway.shipping_options(&token).await {
            Ok(options) => options,
            Err(e) => {
                warn!(error = %e, "falling back to default shipping options");
                ShippingOption::defaults()
            }
        }
    }

    pub async fn select_shipping_option(&mut self, option: &ShippingOption) -> CartOutcome {
        self.begin();
        self.cart.select_shipping(option);
        let result = self.commit().await.map(|()| None);
        self.finish(result)
    }

    /// Checkout handoff. An empty cart is refused and reported through
    /// [`error`](Self::error).
    pub fn proceed_to_checkout(&mut self) -> Result<Navigation> {
        if self.cart.is_empty() {
            self.error = Some(CartError::EmptyCart.to_string());
            return Err(CartError::EmptyCart);
        }
        if self.is_authenticated() {
            return Ok(Navigation::Checkout);
        }
        if let Err(e) = self.store.set_redirect_url(CHECKOUT_PATH) {
            self.error = Some(e.to_string());
            return Err(e.into());
        }
        Ok(Navigation::Login)
    }

    fn begin(&mut self) {
        self.is_loading = true;
        self.error = None;
    }

    fn finish(&mut self, result: Result<Option<String>>) -> CartOutcome {
        self.is_loading = false;
        match result {
            Ok(message) => CartOutcome::succeeded(message),
            Err(e) => {
                let message = e.to_string();
                self.error = Some(message.clone());
                CartOutcome::failed(message)
            }
        }
    }

    fn persist(&mut self) -> Result<()> {
        self.store.save_cart(&self.cart)?;
        self.last_updated = Some(Utc::now());
        Ok(())
    }

    /// Persists the cart, then mirrors the pending events when signed in.
    async fn commit(&mut self) -> Result<()> {
        let events = self.cart.take_events();
        self.persist()?;
        info!(lines = self.cart.unique_items(), total = %self.cart.total(), "cart updated");

        let Some(token) = self.store.auth_token() else { return Ok(()) };
        for event in events {
            if let Err(e) = self.mirror(&token, event).await {
                warn!(error = %e, "remote cart mirror failed");
                return Err(e);
            }
        }
        Ok(())
    }

    async fn mirror(&self, token: &str, event: CartEvent) -> Result<()> {
        match event {
            CartEvent::ItemAdded { line } => self.gateway.add_item(token, &line).await?,
            CartEvent::QuantityUpdated { product_id, quantity } => self.gateway.update_quantity(token, product_id, quantity).await?,
            CartEvent::ItemRemoved { product_id } => self.gateway.remove_item(token, product_id).await?,
            CartEvent::Cleared => self.gateway.clear(token).await?,
            CartEvent::DiscountApplied { code } => self.gateway.apply_discount(token, &code).await?,
            CartEvent::DiscountRemoved => self.gateway.remove_discount(token).await?,
            CartEvent::ShippingOptionSelected { option_id } => self.gateway.update_shipping_option(token, option_id).await?,
        };
        Ok(())
    }
}
