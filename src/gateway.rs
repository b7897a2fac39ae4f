//! Remote cart API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::GatewayConfig;
use crate::domain::aggregates::{Cart, CartLine, ShippingOption};
use crate::domain::value_objects::{DiscountCode, ProductId};
use crate::pricing::ApiCartLine;

const GENERIC_ERROR_MESSAGE: &str = "Une erreur est survenue";

/// Errors that can occur when talking to the remote cart API.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failure or an undecodable success body.
    #[error("Erreur réseau : {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },
}

/// Body of every mutating cart endpoint. The server's cart is kept as raw
/// JSON: the local cart stays authoritative, so any 2xx JSON body counts as
/// success whatever shape its `cart` has.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CartResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart: Option<Value>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct CartEnvelope {
    cart: Cart,
}

#[derive(Debug, Deserialize)]
struct ShippingOptionsEnvelope {
    options: Vec<ShippingOption>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// The remote cart endpoints the controller mirrors to. Every call carries
/// the session's bearer token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartGateway: Send + Sync {
    /// `GET cart`
    async fn get_cart(&self, token: &str) -> Result<Cart, GatewayError>;

    /// `POST cart/items`
    async fn add_item(&self, token: &str, item: &ApiCartLine) -> Result<CartResponse, GatewayError>;

    /// `PUT cart/items/{id}`
    async fn update_quantity(&self, token: &str, product_id: ProductId, quantity: u32) -> Result<CartResponse, GatewayError>;

    /// `DELETE cart/items/{id}`
    async fn remove_item(&self, token: &str, product_id: ProductId) -> Result<CartResponse, GatewayError>;

    /// `DELETE cart`
    async fn clear(&self, token: &str) -> Result<CartResponse, GatewayError>;

    /// `POST cart/discount`
    async fn apply_discount(&self, token: &str, code: &DiscountCode) -> Result<CartResponse, GatewayError>;

    /// `DELETE cart/discount`
    async fn remove_discount(&self, token: &str) -> Result<CartResponse, GatewayError>;

    /// `GET cart/shipping-options`
    async fn shipping_options(&self, token: &str) -> Result<Vec<ShippingOption>, GatewayError>;

    /// `PUT cart/shipping`
    async fn update_shipping_option(&self, token: &str, option_id: u32) -> Result<CartResponse, GatewayError>;

    /// `POST cart/sync`
    async fn sync(&self, token: &str, items: &[CartLine]) -> Result<CartResponse, GatewayError>;
}

/// [`CartGateway`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCartGateway {
    base_url: String,
    http: Client,
}

impl HttpCartGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        Ok(Self { base_url: config.api_url.trim_end_matches('/').to_owned(), http })
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    fn url(&self, path: &str) -> String { format!("{}/{}", self.base_url, path) }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, token: &str) -> Result<T, GatewayError> {
        let response = request.bearer_auth(token).send().await?;
        Ok(check_status(response).await?.json().await?)
    }
}

/// Turns a non-success response into [`GatewayError::Api`], preferring the
/// server's own `message`.
async fn check_status(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.json::<ErrorBody>().await {
        Ok(ErrorBody { message: Some(message) }) if !message.is_empty() => message,
        Ok(_) => format!("Erreur {}", status.as_u16()),
        Err(_) => GENERIC_ERROR_MESSAGE.to_owned(),
    };
    Err(GatewayError::Api { status: status.as_u16(), message })
}

#[async_trait]
impl CartGateway for HttpCartGateway {
    async fn get_cart(&self, token: &str) -> Result<Cart, GatewayError> {
        debug!("GET cart");
        let envelope: CartEnvelope = self.send(self.http.get(self.url("cart")), token).await?;
        Ok(envelope.cart)
    }

    async fn add_item(&self, token: &str, item: &ApiCartLine) -> Result<CartResponse, GatewayError> {
        debug!(product_id = %item.product_id, quantity = item.quantity, "POST cart/items");
        self.send(self.http.post(self.url("cart/items")).json(item), token).await
    }

    async fn update_quantity(&self, token: &str, product_id: ProductId, quantity: u32) -> Result<CartResponse, GatewayError> {
        debug!(%product_id, quantity, "PUT cart/items");
        let body = serde_json::json!({ "quantity": quantity });
        self.send(self.http.put(self.url(&format!("cart/items/{product_id}"))).json(&body), token).await
    }

    async fn remove_item(&self, token: &str, product_id: ProductId) -> Result<CartResponse, GatewayError> {
        debug!(%product_id, "DELETE cart/items");
        self.send(self.http.delete(self.url(&format!("cart/items/{product_id}"))), token).await
    }

    async fn clear(&self, token: &str) -> Result<CartResponse, GatewayError> {
        debug!("DELETE cart");
        self.send(self.http.delete(self.url("cart")), token).await
    }

    async fn apply_discount(&self, token: &str, code: &DiscountCode) -> Result<CartResponse, GatewayError> {
        debug!(%code, "POST cart/discount");
        let body = serde_json::json!({ "code": code.as_str() });
        self.send(self.http.post(self.url("cart/discount")).json(&body), token).await
    }

    async fn remove_discount(&self, token: &str) -> Result<CartResponse, GatewayError> {
        debug!("DELETE cart/discount");
        self.send(self.http.delete(self.url("cart/discount")), token).await
    }

    async fn shipping_options(&self, token: &str) -> Result<Vec<ShippingOption>, GatewayError> {
        debug!("GET cart/shipping-options");
        let envelope: ShippingOptionsEnvelope = self.send(self.http.get(self.url("cart/shipping-options")), token).await?;
        Ok(envelope.options)
    }

    async fn update_shipping_option(&self, token: &str, option_id: u32) -> Result<CartResponse, GatewayError> {
        debug!(option_id, "PUT cart/shipping");
        let body = serde_json::json!({ "optionId": option_id });
        self.send(self.http.put(self.url("cart/shipping")).json(&body), token).await
    }

    async fn sync(&self, token: &str, items: &[CartLine]) -> Result<CartResponse, GatewayError> {
        debug!(lines = items.len(), "POST cart/sync");
        let body = serde_json::json!({ "items": items });
        self.send(self.http.post(self.url("cart/sync")).json(&body), token).await
    }
}
