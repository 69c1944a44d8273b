//! `reqwest` implementation of [`AnalysisService`].

use crate::error::{ClientError, Result};
use crate::service::{AnalysisService, SubmitOutcome};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use scanwise_auth::AuthSession;
use scanwise_core::{
    Alternative, AnalysisResult, CanonicalRequest, CatalogProduct, FavoriteStatus, HistoryEntry,
    ProductData, ProductId, ServiceConfig, UserProfile,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Remote message used when a 2xx analysis body cannot be decoded.
pub const UNEXPECTED_RESPONSE_MESSAGE: &str = "unexpected response from analysis service";

/// Catalog queries shorter than this (after trimming) are not sent.
pub const MIN_SEARCH_QUERY_CHARS: usize = 2;

#[derive(Serialize)]
struct HistoryPayload<'a> {
    user_id: &'a str,
    product_name: &'a str,
    ingredients: &'a [String],
    toxicity_score: f64,
}

#[derive(Serialize)]
struct FavoritePayload<'a> {
    user_id: &'a str,
    product_name: &'a str,
}

#[derive(Serialize)]
struct AlternativesPayload<'a> {
    category: &'a str,
    current_score: f64,
}

#[derive(Serialize)]
struct ProfilePayload<'a> {
    uid: &'a str,
    email: Option<&'a str>,
    #[serde(flatten)]
    profile: &'a UserProfile,
}

/// Build the HTTP client used for every service call.
pub fn build_http_client(config: &ServiceConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| ClientError::Internal(format!("failed to create HTTP client: {e}")))
}

/// Analysis service client over HTTP.
///
/// Authenticated calls fetch a bearer token from the [`AuthSession`] for every
/// request; the token is never logged.
#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    client: Client,
    base_url: String,
    auth: AuthSession,
}

impl HttpAnalysisClient {
    /// Create a client for the service described by `config`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &ServiceConfig, auth: AuthSession) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Attach the bearer token and return the user id it belongs to.
    async fn authorized(&self, builder: RequestBuilder) -> Result<(RequestBuilder, String)> {
        let credentials = self.auth.credentials().await?;
        let builder = builder.bearer_auth(credentials.token.as_str());
        Ok((builder, credentials.uid))
    }
}

/// Pull a human-readable message out of an `error` or `detail` field.
fn message_field(body: &Value, field: &str) -> Option<String> {
    match body.get(field)? {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        other => Some(other.to_string()),
    }
}

fn status_message(status: StatusCode) -> String {
    format!(
        "analysis service returned {} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("error")
    )
}

/// Classify a `POST /scan-product` response.
///
/// An `error` field wins over the status code. Empty bodies, `null`, `{}` and
/// results without ingredients are [`SubmitOutcome::Empty`].
pub fn classify_scan_response(status: StatusCode, body: &str) -> Result<SubmitOutcome> {
    let body = body.trim();
    if body.is_empty() {
        return if status.is_success() {
            Ok(SubmitOutcome::Empty)
        } else {
            Err(ClientError::Remote(status_message(status)))
        };
    }

    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Err(ClientError::Remote(if status.is_success() {
            UNEXPECTED_RESPONSE_MESSAGE.to_string()
        } else {
            status_message(status)
        }));
    };

    if let Some(message) = message_field(&value, "error") {
        return Err(ClientError::Remote(message));
    }
    if !status.is_success() {
        return Err(ClientError::Remote(
            message_field(&value, "detail").unwrap_or_else(|| status_message(status)),
        ));
    }
    if value.is_null() || value.as_object().is_some_and(serde_json::Map::is_empty) {
        return Ok(SubmitOutcome::Empty);
    }

    match serde_json::from_value::<AnalysisResult>(value) {
        Ok(result) if result.is_empty() => Ok(SubmitOutcome::Empty),
        Ok(result) => Ok(SubmitOutcome::Analysis(result)),
        Err(e) => {
            tracing::warn!("Failed to decode analysis result: {}", e);
            Err(ClientError::Remote(UNEXPECTED_RESPONSE_MESSAGE.to_string()))
        }
    }
}

/// Message for a non-2xx response: its `error` or `detail` field, else the status.
fn remote_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| message_field(&v, "error").or_else(|| message_field(&v, "detail")))
        .unwrap_or_else(|| status_message(status))
}

/// Read a JSON body, turning non-2xx responses into `Remote` errors.
async fn read_json<T: DeserializeOwned>(response: Response, endpoint: &str) -> Result<T> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(ClientError::Remote(remote_message(status, &text)));
    }

    serde_json::from_str(&text).map_err(|e| ClientError::Parse {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

/// Check the status of a call whose body is not used.
async fn expect_success(response: Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let text = response.text().await?;
    Err(ClientError::Remote(remote_message(status, &text)))
}

#[async_trait]
impl AnalysisService for HttpAnalysisClient {
    async fn scan_product(&self, request: &CanonicalRequest) -> Result<SubmitOutcome> {
        tracing::debug!("Submitting analysis for '{}'", request.product_name());
        let response = self
            .client
            .post(self.url("/scan-product"))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        classify_scan_response(status, &body)
    }

    async fn lookup_barcode(&self, barcode: &ProductId) -> Result<ProductData> {
        let response = self
            .client
            .get(self.url("/scan-barcode"))
            .query(&[("barcode", barcode.as_str())])
            .send()
            .await?;

        let value: Value = read_json(response, "/scan-barcode").await?;
        if let Some(message) = message_field(&value, "error") {
            tracing::debug!("Barcode {} not found: {}", barcode, message);
            return Err(ClientError::NotFound(message));
        }

        serde_json::from_value(value).map_err(|e| ClientError::Parse {
            endpoint: "/scan-barcode".to_string(),
            message: e.to_string(),
        })
    }

    async fn search_catalog(&self, query: &str) -> Result<Vec<CatalogProduct>> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_QUERY_CHARS {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .get(self.url("/search-products"))
            .query(&[("q", query)])
            .send()
            .await?;
        read_json(response, "/search-products").await
    }

    async fn recommend_alternatives(
        &self,
        category: &str,
        current_score: f64,
    ) -> Result<Vec<Alternative>> {
        let response = self
            .client
            .post(self.url("/recommend-alternatives"))
            .json(&AlternativesPayload {
                category,
                current_score,
            })
            .send()
            .await?;
        read_json(response, "/recommend-alternatives").await
    }

    async fn record_history(&self, result: &AnalysisResult) -> Result<()> {
        let (builder, uid) = self.authorized(self.client.post(self.url("/history"))).await?;
        let response = builder
            .json(&HistoryPayload {
                user_id: &uid,
                product_name: result.product_name_or_unknown(),
                ingredients: &result.ingredients,
                toxicity_score: result.toxicity_score,
            })
            .send()
            .await?;

        expect_success(response).await
    }

    async fn add_favorite(&self, product_name: &str) -> Result<FavoriteStatus> {
        let (builder, uid) = self
            .authorized(self.client.post(self.url("/favorites")))
            .await?;
        let response = builder
            .json(&FavoritePayload {
                user_id: &uid,
                product_name,
            })
            .send()
            .await?;

        let value: Value = read_json(response, "/favorites").await?;
        if value.get("status").and_then(Value::as_str) == Some("exists") {
            Ok(FavoriteStatus::AlreadyExists)
        } else {
            Ok(FavoriteStatus::Added)
        }
    }

    async fn fetch_history(&self) -> Result<Vec<HistoryEntry>> {
        let (builder, _) = self.authorized(self.client.get(self.url("/history"))).await?;
        let response = builder.send().await?;
        read_json(response, "/history").await
    }

    async fn fetch_profile(&self) -> Result<UserProfile> {
        let (builder, _) = self
            .authorized(self.client.get(self.url("/users/profile")))
            .await?;
        let response = builder.send().await?;

        let profile: Option<UserProfile> = read_json(response, "/users/profile").await?;
        Ok(profile.unwrap_or_default())
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        let email = self.auth.user().and_then(|user| user.email);
        let (builder, uid) = self
            .authorized(self.client.post(self.url("/users/profile")))
            .await?;
        let response = builder
            .json(&ProfilePayload {
                uid: &uid,
                email: email.as_deref(),
                profile,
            })
            .send()
            .await?;

        expect_success(response).await
    }
}
