//! Client tests against an in-process fake of the analysis service.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use scanwise_auth::{AuthSession, StaticTokenProvider, UserIdentity};
use scanwise_client::{AnalysisService, ClientError, HttpAnalysisClient, SubmitOutcome};
use scanwise_core::{
    AnalysisResult, CanonicalRequest, FavoriteStatus, IngredientsText, ProductId, ServiceConfig,
    UsageContext, UserProfile,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

const TOKEN: &str = "token-1";

#[derive(Clone, Default)]
struct FakeService {
    requests: Arc<Mutex<Vec<(String, Value)>>>,
    favorites: Arc<Mutex<HashSet<String>>>,
    profile: Arc<Mutex<Option<Value>>>,
}

impl FakeService {
    fn record(&self, path: &str, body: Value) {
        self.requests
            .lock()
            .unwrap()
            .push((path.to_string(), body));
    }

    fn requests_to(&self, path: &str) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, body)| body.clone())
            .collect()
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {TOKEN}").as_str())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Invalid token"})),
    )
        .into_response()
}

async fn scan_product(State(fake): State<FakeService>, Json(body): Json<Value>) -> Response {
    fake.record("/scan-product", body.clone());
    let name = body["product_name"].as_str().unwrap_or_default().to_string();
    match name.as_str() {
        "Unknown" => Json(json!({"error": "Ingredients not found for this product."}))
            .into_response(),
        "Empty" => Json(json!({})).into_response(),
        "Broken" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        _ => Json(json!({
            "product_name": name.clone(),
            "ingredients": ["aqua", "parfum"],
            "toxicity_report": [
                {"ingredient": "aqua", "label": "SAFE", "score": 0.0},
                {"ingredient": "parfum", "label": "MODERATE RISK", "score": 0.5}
            ],
            "product_toxicity_score": 0.42,
            "product_status": "MODERATE",
            "detailed_score_breakdown": {"base_score": 0.4, "usage_factor": 1.05},
            "not_suitable_for_skin_type": ["parfum"],
            "not_suitable_for_skin_tone": [],
            "category": body["category"].clone()
        }))
        .into_response(),
    }
}

async fn scan_barcode(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    match params.get("barcode").map(String::as_str) {
        Some("3600523614") => Json(json!({
            "product_name": "Sun Lotion",
            "ingredients_text": "aqua, octocrylene",
            "category": "sunscreen"
        })),
        _ => Json(json!({"error": "Product not found"})),
    }
}

async fn search_products(
    State(fake): State<FakeService>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let q = params.get("q").cloned().unwrap_or_default();
    fake.record("/search-products", json!({"q": q}));
    Json(json!([
        {"id": "p-1", "product_name": format!("{q} Cream"), "brand": "Acme"},
        {"id": "p-2", "product_name": format!("{q} Serum")}
    ]))
}

async fn alternatives(State(fake): State<FakeService>, Json(body): Json<Value>) -> Json<Value> {
    fake.record("/recommend-alternatives", body);
    Json(json!([
        {"product_name": "Gentle Cream", "brand": "Acme", "toxicity_score": 0.1},
        {"product_name": "Plain Cream", "brand": null, "toxicity_score": 0.2}
    ]))
}

async fn record_history(
    State(fake): State<FakeService>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    fake.record("/history", body);
    Json(json!({"status": "saved"})).into_response()
}

async fn list_history(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!([
        {"product_name": "Hydra Cream", "toxicity_score": 0.25, "timestamp": "2026-01-05T10:00:00Z"},
        {"product_name": null, "toxicity_score": 0.7}
    ]))
    .into_response()
}

async fn add_favorite(
    State(fake): State<FakeService>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let name = body["product_name"].as_str().unwrap_or_default().to_string();
    let inserted = fake.favorites.lock().unwrap().insert(name);
    if inserted {
        Json(json!({"status": "added"})).into_response()
    } else {
        Json(json!({"status": "exists"})).into_response()
    }
}

async fn get_profile(State(fake): State<FakeService>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let profile = fake.profile.lock().unwrap().clone();
    Json(profile.unwrap_or(Value::Null)).into_response()
}

async fn save_profile(
    State(fake): State<FakeService>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    *fake.profile.lock().unwrap() = Some(body);
    Json(json!({"status": "ok"})).into_response()
}

async fn spawn_fake() -> (String, FakeService) {
    let fake = FakeService::default();
    let app = Router::new()
        .route("/scan-product", post(scan_product))
        .route("/scan-barcode", get(scan_barcode))
        .route("/search-products", get(search_products))
        .route("/recommend-alternatives", post(alternatives))
        .route("/history", post(record_history).get(list_history))
        .route("/favorites", post(add_favorite))
        .route("/users/profile", get(get_profile).post(save_profile))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake service");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve fake service");
    });

    (format!("http://{addr}"), fake)
}

fn client(base_url: &str, auth: AuthSession) -> HttpAnalysisClient {
    let config = ServiceConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        ..ServiceConfig::default()
    };
    HttpAnalysisClient::new(&config, auth).expect("create client")
}

fn signed_in() -> AuthSession {
    let auth = AuthSession::new();
    let mut identity = UserIdentity::new("user-1");
    identity.email = Some("user@example.com".to_string());
    auth.sign_in(identity, Arc::new(StaticTokenProvider::new(TOKEN)));
    auth
}

fn ingredients_request(name: &str) -> CanonicalRequest {
    CanonicalRequest::for_ingredients(
        IngredientsText::new("aqua, parfum").unwrap(),
        Some(name.to_string()),
        UsageContext::default(),
        Some("cream".to_string()),
    )
}

#[tokio::test]
async fn test_scan_product_sends_canonical_payload() {
    let (url, fake) = spawn_fake().await;
    let client = client(&url, AuthSession::new());

    let outcome = client
        .scan_product(&ingredients_request("Hydra Cream"))
        .await
        .expect("submit");

    let SubmitOutcome::Analysis(result) = outcome else {
        panic!("expected an analysis");
    };
    assert_eq!(result.product_name.as_deref(), Some("Hydra Cream"));
    assert_eq!(result.category.as_deref(), Some("cream"));
    assert!(result.skin_type_warnings.contains("parfum"));

    let sent = fake.requests_to("/scan-product");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["ingredients_list"], "aqua, parfum");
    assert!(sent[0]["barcode"].is_null());
    assert_eq!(sent[0]["skin_type"], "Normal");
    assert_eq!(sent[0]["amount_applied"], "Normal");
}

#[tokio::test]
async fn test_scan_product_outcomes() {
    let (url, _fake) = spawn_fake().await;
    let client = client(&url, AuthSession::new());

    match client.scan_product(&ingredients_request("Unknown")).await {
        Err(ClientError::Remote(message)) => {
            assert_eq!(message, "Ingredients not found for this product.");
        }
        other => panic!("expected remote error, got {other:?}"),
    }

    assert!(matches!(
        client.scan_product(&ingredients_request("Empty")).await,
        Ok(SubmitOutcome::Empty)
    ));

    assert!(matches!(
        client.scan_product(&ingredients_request("Broken")).await,
        Err(ClientError::Remote(msg)) if msg.contains("500")
    ));
}

#[tokio::test]
async fn test_connection_failure() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("local addr")
    };
    let client = client(&format!("http://{addr}"), AuthSession::new());

    let err = client
        .scan_product(&ingredients_request("Hydra Cream"))
        .await
        .unwrap_err();
    assert!(err.is_connection(), "expected connection error, got {err:?}");
    assert_eq!(
        err.user_message(),
        "Failed to connect to the server. Please try again."
    );
}

#[tokio::test]
async fn test_lookup_barcode() {
    let (url, _fake) = spawn_fake().await;
    let client = client(&url, AuthSession::new());

    let product = client
        .lookup_barcode(&ProductId::new("3600523614").unwrap())
        .await
        .expect("lookup");
    assert_eq!(product.product_name.as_deref(), Some("Sun Lotion"));
    assert_eq!(product.ingredients_text.as_deref(), Some("aqua, octocrylene"));

    assert!(matches!(
        client.lookup_barcode(&ProductId::new("000").unwrap()).await,
        Err(ClientError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_search_catalog() {
    let (url, fake) = spawn_fake().await;
    let client = client(&url, AuthSession::new());

    assert!(client.search_catalog(" a ").await.expect("short query").is_empty());
    assert!(fake.requests_to("/search-products").is_empty());

    let products = client.search_catalog("Hydra").await.expect("search");
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].id, "p-1");
    assert_eq!(products[0].brand.as_deref(), Some("Acme"));
    assert!(products[1].brand.is_none());
}

#[tokio::test]
async fn test_recommend_alternatives() {
    let (url, fake) = spawn_fake().await;
    let client = client(&url, AuthSession::new());

    let alternatives = client
        .recommend_alternatives("cream", 0.42)
        .await
        .expect("alternatives");
    assert_eq!(alternatives.len(), 2);
    assert_eq!(alternatives[0].product_name, "Gentle Cream");

    let sent = fake.requests_to("/recommend-alternatives");
    assert_eq!(sent[0]["category"], "cream");
    assert_eq!(sent[0]["current_score"], 0.42);
}

#[tokio::test]
async fn test_history_requires_sign_in() {
    let (url, fake) = spawn_fake().await;
    let result: AnalysisResult = serde_json::from_value(json!({
        "ingredients": ["aqua"],
        "toxicity_report": [{"ingredient": "aqua", "label": "SAFE", "score": 0.0}],
        "product_toxicity_score": 0.1,
        "product_status": "SAFE"
    }))
    .unwrap();

    let anonymous = client(&url, AuthSession::new());
    assert!(matches!(
        anonymous.record_history(&result).await,
        Err(ClientError::NotAuthenticated)
    ));
    assert!(fake.requests_to("/history").is_empty());

    let client = client(&url, signed_in());
    client.record_history(&result).await.expect("record history");
    let sent = fake.requests_to("/history");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["user_id"], "user-1");
    assert_eq!(sent[0]["product_name"], "Unknown Product");
    assert_eq!(sent[0]["ingredients"], json!(["aqua"]));

    let history = client.fetch_history().await.expect("fetch history");
    assert_eq!(history.len(), 2);
    assert!(history[0].timestamp.is_some());
    assert!(history[1].product_name.is_none());
}

#[tokio::test]
async fn test_favorites_duplicate_is_informational() {
    let (url, _fake) = spawn_fake().await;
    let client = client(&url, signed_in());

    assert_eq!(
        client.add_favorite("Hydra Cream").await.expect("first add"),
        FavoriteStatus::Added
    );
    assert_eq!(
        client.add_favorite("Hydra Cream").await.expect("second add"),
        FavoriteStatus::AlreadyExists
    );
}

#[tokio::test]
async fn test_profile_round_trip() {
    let (url, fake) = spawn_fake().await;
    let client = client(&url, signed_in());

    assert_eq!(
        client.fetch_profile().await.expect("empty profile"),
        UserProfile::default()
    );

    let profile = UserProfile {
        skin_type: Some("Dry".to_string()),
        skin_tone: Some("Fair".to_string()),
        theme_preference: None,
    };
    client.save_profile(&profile).await.expect("save profile");

    let stored = fake.profile.lock().unwrap().clone().expect("stored profile");
    assert_eq!(stored["uid"], "user-1");
    assert_eq!(stored["email"], "user@example.com");
    assert_eq!(stored["skin_type"], "Dry");

    let loaded = client.fetch_profile().await.expect("load profile");
    assert_eq!(loaded.skin_tone.as_deref(), Some("Fair"));
}
