//! Category and note listings, search suggestions, and note detail.
//!
//! Nothing here is cached: entering the library re-fetches categories,
//! entering a category re-fetches its notes, and opening a note always
//! fetches full detail even when a summary is already on screen. The
//! acceptable staleness window is one navigation.

use std::sync::Arc;

use crate::gateway::{ApiError, ApiGateway};
use crate::models::{Category, Note, NoteSummary};

/// Queries shorter than this never hit the network.
pub const MIN_SEARCH_LEN: usize = 2;

/// Cap on rendered search suggestions.
pub const MAX_SUGGESTIONS: usize = 6;

pub struct ContentCatalog {
    gateway: Arc<ApiGateway>,
}

impl ContentCatalog {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self { gateway }
    }

    /// Fetch the category listing, fresh on every library entry.
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.gateway.get("/api/categories").await
    }

    /// Fetch the note summaries for one category.
    pub async fn list_notes(&self, category: &str) -> Result<Vec<NoteSummary>, ApiError> {
        let path = format!("/api/notes?category={}", urlencoding::encode(category));
        self.gateway.get(&path).await
    }

    /// Search note titles and content. Short queries suppress the request
    /// entirely and clear any existing suggestions; results are capped at
    /// [`MAX_SUGGESTIONS`].
    pub async fn search(&self, query: &str) -> Result<Vec<NoteSummary>, ApiError> {
        if query.chars().count() < MIN_SEARCH_LEN {
            return Ok(Vec::new());
        }

        let path = format!("/api/notes?search={}", urlencoding::encode(query));
        let mut results: Vec<NoteSummary> = self.gateway.get(&path).await?;
        results.truncate(MAX_SUGGESTIONS);
        Ok(results)
    }

    /// Fetch full note detail by id.
    pub async fn fetch_note(&self, id: u64) -> Result<Note, ApiError> {
        self.gateway.get(&format!("/api/note/{}", id)).await
    }
}
