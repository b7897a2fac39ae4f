use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use storefront_cart::config::GatewayConfig;
use storefront_cart::pricing::ApiCartLine;
use storefront_cart::storage::AUTH_TOKEN_KEY;
use storefront_cart::{CartController, CartGateway, DiscountCode, GatewayError, HttpCartGateway, KeyValueStore, MemoryStore, ProductId, StaticCatalog};
use testresult::TestResult;
use tower_http::trace::TraceLayer;

#[derive(Debug, Clone, PartialEq)]
struct Call {
    method: Method,
    path: String,
    auth: Option<String>,
    body: Value,
}

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Recorder {
    fn calls(&self) -> Vec<Call> { self.calls.lock().unwrap().clone() }
}

fn remote_cart() -> Value {
    json!({
        "items": [{
            "id": 2,
            "name": "SAC SCULPTÉ CUIR",
            "category": "ACCESSOIRES",
            "price": 28000,
            "originalPrice": 35000,
            "image": "/sac-en-cuir.jpg",
            "quantity": 1,
            "availableStock": 10
        }],
        "total": 28000,
        "subtotal": 28000,
        "shipping": 0
    })
}

async fn fake_api(State(recorder): State<Recorder>, method: Method, uri: Uri, headers: HeaderMap, body: String) -> Response {
    let auth = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_owned);
    let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    let path = uri.path().to_owned();
    recorder.calls.lock().unwrap().push(Call { method: method.clone(), path: path.clone(), auth: auth.clone(), body });

    match auth.as_deref() {
        Some("Bearer down") => {
            return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "message": "Service indisponible" }))).into_response()
        }
        Some("Bearer broken") => return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        Some("Bearer bare") => return (StatusCode::BAD_REQUEST, Json(json!({}))).into_response(),
        Some("Bearer terse") if method != Method::GET => return Json(json!({ "message": "Produit ajouté" })).into_response(),
        _ => {}
    }

    match (method, path.as_str()) {
        (Method::GET, "/api/cart") if auth.as_deref() == Some("Bearer invalid-cart") => Json(json!({
            "cart": { "items": [{ "id": 2, "name": "", "price": 28000, "quantity": 0, "availableStock": 10 }], "total": 0, "subtotal": 0, "shipping": 0 }
        }))
        .into_response(),
        (Method::GET, "/api/cart") => Json(json!({ "cart": remote_cart() })).into_response(),
        (Method::GET, "/api/cart/shipping-options") => Json(json!({
            "options": [{ "id": 7, "name": "Coursier", "description": "Livraison le jour même", "price": 8000, "estimatedDays": 0 }]
        }))
        .into_response(),
        _ => Json(json!({ "cart": { "items": [], "total": 0, "subtotal": 0, "shipping": 0 }, "message": "ok" })).into_response(),
    }
}

async fn spawn_api() -> TestResult<(String, Recorder)> {
    let recorder = Recorder::default();
    let app = Router::new().fallback(fake_api).with_state(recorder.clone()).layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/api/"), recorder))
}

fn gateway(base_url: &str) -> TestResult<HttpCartGateway> {
    Ok(HttpCartGateway::new(&GatewayConfig { api_url: base_url.to_owned(), timeout_secs: 5 })?)
}

#[tokio::test]
async fn requests_follow_the_cart_contract() -> TestResult {
    let (base_url, recorder) = spawn_api().await?;
    let gateway = gateway(&base_url)?;
    let robe = ProductId::new(1);

    let cart = gateway.get_cart("tok").await?;
    assert_eq!(cart.items()[0].id, ProductId::new(2));

    let item = ApiCartLine { product_id: robe, quantity: 2, size: Some("M".into()), color: None };
    assert_eq!(gateway.add_item("tok", &item).await?.message, "ok");
    gateway.update_quantity("tok", robe, 3).await?;
    gateway.remove_item("tok", robe).await?;
    gateway.apply_discount("tok", &DiscountCode::new("VIP30")?).await?;
    gateway.remove_discount("tok").await?;
    gateway.update_shipping_option("tok", 2).await?;
    gateway.sync("tok", cart.items()).await?;
    gateway.clear("tok").await?;

    let calls = recorder.calls();
    let summary: Vec<(Method, &str)> = calls.iter().map(|c| (c.method.clone(), c.path.as_str())).collect();
    assert_eq!(
        summary,
        vec![
            (Method::GET, "/api/cart"),
            (Method::POST, "/api/cart/items"),
            (Method::PUT, "/api/cart/items/1"),
            (Method::DELETE, "/api/cart/items/1"),
            (Method::POST, "/api/cart/discount"),
            (Method::DELETE, "/api/cart/discount"),
            (Method::PUT, "/api/cart/shipping"),
            (Method::POST, "/api/cart/sync"),
            (Method::DELETE, "/api/cart"),
        ]
    );
    assert!(calls.iter().all(|c| c.auth.as_deref() == Some("Bearer tok")));
    assert_eq!(calls[1].body, json!({ "productId": 1, "quantity": 2, "size": "M" }));
    assert_eq!(calls[2].body, json!({ "quantity": 3 }));
    assert_eq!(calls[4].body, json!({ "code": "VIP30" }));
    assert_eq!(calls[6].body, json!({ "optionId": 2 }));
    assert_eq!(calls[7].body["items"][0]["availableStock"], json!(10));
    Ok(())
}

#[tokio::test]
async fn error_statuses_carry_the_server_message() -> TestResult {
    let (base_url, _) = spawn_api().await?;
    let gateway = gateway(&base_url)?;

    let err = gateway.clear("down").await.unwrap_err();
    assert!(matches!(err, GatewayError::Api { status: 503, .. }));
    assert_eq!(err.to_string(), "Service indisponible");

    assert_eq!(gateway.clear("broken").await.unwrap_err().to_string(), "Une erreur est survenue");
    assert_eq!(gateway.clear("bare").await.unwrap_err().to_string(), "Erreur 400");
    Ok(())
}

#[tokio::test]
async fn success_without_cart_body_is_still_success() -> TestResult {
    let (base_url, recorder) = spawn_api().await?;
    let gateway = gateway(&base_url)?;

    let item = ApiCartLine { product_id: ProductId::new(1), quantity: 1, size: None, color: None };
    let response = gateway.add_item("terse", &item).await?;
    assert_eq!(response.message, "Produit ajouté");
    assert_eq!(response.cart, None);

    let store = Arc::new(MemoryStore::new());
    store.set(AUTH_TOKEN_KEY, "terse")?;
    let mut controller = CartController::new(store, Arc::new(gateway), Arc::new(StaticCatalog::storefront()));
    let outcome = controller.add_to_cart(ProductId::new(2), 1).await;
    assert!(outcome.success, "{outcome:?}");
    assert_eq!(controller.error(), None);
    assert_eq!(recorder.calls().len(), 2);
    Ok(())
}

#[tokio::test]
async fn remote_cart_failing_shape_check_is_reported() -> TestResult {
    let (base_url, _) = spawn_api().await?;
    let store = Arc::new(MemoryStore::new());
    store.set(AUTH_TOKEN_KEY, "invalid-cart")?;

    let mut controller = CartController::new(store, Arc::new(gateway(&base_url)?), Arc::new(StaticCatalog::storefront()));
    controller.mount().await;
    assert!(controller.is_synced());
    assert_eq!(controller.error(), Some("Panier distant invalide"));
    assert!(controller.cart().is_empty());
    Ok(())
}

#[tokio::test]
async fn unreachable_api_is_a_transport_error() -> TestResult {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);

    let err = gateway(&format!("http://{addr}/api"))?.get_cart("tok").await.unwrap_err();
    assert!(matches!(err, GatewayError::Http(_)));
    Ok(())
}

#[tokio::test]
async fn controller_reconciles_and_mirrors_over_http() -> TestResult {
    let (base_url, recorder) = spawn_api().await?;
    let store = Arc::new(MemoryStore::new());
    store.set(AUTH_TOKEN_KEY, "tok")?;

    let mut controller = CartController::new(store, Arc::new(gateway(&base_url)?), Arc::new(StaticCatalog::storefront()));
    controller.mount().await;
    assert!(controller.is_synced());
    assert_eq!(controller.cart_item_ids(), vec![ProductId::new(2)]);

    let outcome = controller.add_to_cart(ProductId::new(1), 1).await;
    assert!(outcome.success, "{outcome:?}");
    assert_eq!(controller.cart().subtotal(), Decimal::from(28_000 + 26_600));

    let options = controller.shipping_options().await;
    assert_eq!(options[0].name, "Coursier");
    assert!(controller.select_shipping_option(&options[0]).await.success);
    assert_eq!(controller.cart().total(), Decimal::from(28_000 + 26_600 + 8000));

    let paths: Vec<String> = recorder.calls().into_iter().map(|c| c.path).collect();
    assert_eq!(paths, vec!["/api/cart", "/api/cart/items", "/api/cart/shipping-options", "/api/cart/shipping"]);
    Ok(())
}
