//! The analysis service seam.

use crate::error::Result;
use async_trait::async_trait;
use scanwise_core::{
    Alternative, AnalysisResult, CanonicalRequest, CatalogProduct, FavoriteStatus, HistoryEntry,
    ProductData, ProductId, UserProfile,
};

/// Message shown when a submission succeeds but carries no analysis.
pub const EMPTY_RESULT_MESSAGE: &str = "No analysis data was returned for this product.";

/// Successful outcome of a submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The service analyzed the product
    Analysis(AnalysisResult),
    /// The service answered without analysis data
    Empty,
}

/// Operations offered by the remote analysis service.
///
/// Every call is a single attempt; nothing is retried automatically.
/// Authenticated calls fail with
/// [`ClientError::NotAuthenticated`](crate::ClientError::NotAuthenticated)
/// when nobody is signed in.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Submit a canonical request for analysis.
    async fn scan_product(&self, request: &CanonicalRequest) -> Result<SubmitOutcome>;

    /// Resolve a barcode to product data.
    async fn lookup_barcode(&self, barcode: &ProductId) -> Result<ProductData>;

    /// Search the product catalog by name.
    async fn search_catalog(&self, query: &str) -> Result<Vec<CatalogProduct>>;

    /// Fetch lower-scoring products of the same category, best first.
    async fn recommend_alternatives(
        &self,
        category: &str,
        current_score: f64,
    ) -> Result<Vec<Alternative>>;

    /// Append a result to the signed-in user's history.
    async fn record_history(&self, result: &AnalysisResult) -> Result<()>;

    /// Register a product as a favorite of the signed-in user.
    async fn add_favorite(&self, product_name: &str) -> Result<FavoriteStatus>;

    /// List the signed-in user's history.
    async fn fetch_history(&self) -> Result<Vec<HistoryEntry>>;

    /// Load the signed-in user's stored preferences.
    async fn fetch_profile(&self) -> Result<UserProfile>;

    /// Store the signed-in user's preferences.
    async fn save_profile(&self, profile: &UserProfile) -> Result<()>;
}
