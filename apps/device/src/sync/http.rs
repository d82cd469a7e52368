//! HTTP catalog client.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use quiz_core::Item;

use super::{CatalogPage, RemoteCatalog, SyncError};

#[derive(Debug, Deserialize)]
struct ChangesResponse {
    items: Vec<Item>,
    #[serde(default)]
    next_cursor: Option<String>,
}

/// Catalog source backed by the hosted changes endpoint.
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl RemoteCatalog for HttpCatalog {
    async fn fetch_page(
        &self,
        since: DateTime<Utc>,
        cursor: Option<&str>,
        page_size: usize,
    ) -> Result<CatalogPage, SyncError> {
        let url = format!("{}/api/catalog/changes", self.base_url);
        let mut request = self.client.get(&url).query(&[
            ("updated_after", since.to_rfc3339()),
            ("limit", page_size.to_string()),
        ]);
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SyncError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChangesResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Parse(e.to_string()))?;

        Ok(CatalogPage {
            items: body.items,
            cursor: body.next_cursor,
        })
    }
}
