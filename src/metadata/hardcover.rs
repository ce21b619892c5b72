//! Hardcover GraphQL client.

use super::BookMetadata;
use crate::config::ApiSettings;
use crate::error::{BinderyError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const GET_BOOK_QUERY: &str = r#"
query GetBook($id: ID!) {
    book(id: $id) {
        title
        author
        description
        isbn
        publicationYear
        publisher
    }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<BookData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct BookData {
    book: Option<BookMetadata>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Client for the Hardcover book catalog.
pub struct HardcoverClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HardcoverClient {
    /// Create a client from the API settings.
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.hardcover_api_key.clone(),
        })
    }

    /// Fetch a book by its catalog ID.
    ///
    /// Returns `None` on any failure; the reason is logged.
    pub async fn fetch_book(&self, book_id: &str) -> Option<BookMetadata> {
        match self.try_fetch_book(book_id).await {
            Ok(Some(book)) => {
                info!("Retrieved metadata for book {}", book_id);
                Some(book)
            }
            Ok(None) => {
                warn!("Book not found with ID: {}", book_id);
                None
            }
            Err(e) => {
                warn!("Error fetching metadata for book {}: {}", book_id, e);
                None
            }
        }
    }

    /// Fetch a book, distinguishing "not found" from request failures.
    #[instrument(skip(self))]
    pub async fn try_fetch_book(&self, book_id: &str) -> Result<Option<BookMetadata>> {
        let body = serde_json::json!({
            "query": GET_BOOK_QUERY,
            "variables": { "id": book_id },
        });

        debug!("POST {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BinderyError::Metadata(format!(
                "Failed to fetch metadata for book {} (Status: {})",
                book_id, status
            )));
        }

        let text = response.text().await?;
        let parsed: GraphQlResponse = serde_json::from_str(&text)
            .map_err(|e| BinderyError::Metadata(format!("Malformed response: {e}")))?;

        for error in &parsed.errors {
            warn!("Catalog reported an error: {}", error.message);
        }

        Ok(parsed
            .data
            .and_then(|d| d.book)
            .filter(|book| !book.is_empty()))
    }
}
