//! Ledger catalog client.
//!
//! The ledger is the system of record; this module reads its dataset
//! catalog in a single request. The pagination cursor is decoded and
//! logged when present, but not followed — if the catalog ever paginates
//! past one page the index silently covers only the first, so the warning
//! makes that visible.

use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use crate::error::{Error, Result};
use crate::models::CatalogPage;

/// Source of catalog records for a sync pass.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the catalog. A transport failure or non-success status is a
    /// [`Error::Connection`]; an undecodable body is a [`Error::Decode`].
    /// Both abort the whole sync pass.
    async fn fetch_catalog(&self) -> Result<CatalogPage>;
}

/// HTTP client for the ledger's read API.
pub struct LedgerClient {
    client: reqwest::Client,
    catalog_url: String,
}

impl LedgerClient {
    pub fn new(base_url: &str, catalog_path: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            catalog_url: format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                catalog_path.trim_start_matches('/')
            ),
        })
    }
}

#[async_trait]
impl CatalogSource for LedgerClient {
    async fn fetch_catalog(&self) -> Result<CatalogPage> {
        let response = self
            .client
            .get(&self.catalog_url)
            .send()
            .await
            .map_err(|e| Error::Connection(format!("failed to fetch catalog: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Connection(format!(
                "ledger API returned status {status}: {body}"
            )));
        }

        let page: CatalogPage = response
            .json()
            .await
            .map_err(|e| Error::Decode(format!("failed to decode catalog response: {e}")))?;

        if let Some(next_key) = page
            .pagination
            .next_key
            .as_deref()
            .filter(|k| !k.is_empty())
        {
            warn!(next_key, "catalog reports more pages; only the first page is indexed");
        }

        Ok(page)
    }
}
