//! Core data types that flow through the sync and query pipeline.

use serde::{Deserialize, Serialize};

/// A dataset record from the ledger's catalog.
///
/// `id` is the stable external identifier and must parse as a `u64` — it
/// becomes the vector-store point id. Every field defaults so a sparse
/// catalog entry still decodes; instances are rebuilt fresh on every sync
/// pass and never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dataset {
    pub id: String,
    pub title: String,
    pub description: String,
    pub ipfs_cid: String,
    pub file_size: u64,
    pub checksum_sha256: String,
    pub agency: String,
    pub category: String,
    pub submitter: String,
    pub timestamp: i64,
    pub pin_count: u64,
}

/// One page of the ledger's catalog endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogPage {
    #[serde(rename = "Dataset", default)]
    pub datasets: Vec<Dataset>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Pagination block of a catalog page. `next_key` is decoded so that a
/// truncated fetch is observable, but the cursor is not followed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub next_key: Option<String>,
    #[serde(default)]
    pub total: Option<String>,
}

/// A semantic search request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Requested result count; values `<= 0` fall back to 10.
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub agency: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Ranked search results, reconstructed from vector-store payloads in
/// descending similarity order.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub count: usize,
    pub results: Vec<Dataset>,
}

/// Outcome of one sync pass. Partial failures never abort the pass; they
/// are collected here instead.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Records returned by the ledger.
    pub fetched: usize,
    /// Records successfully upserted into the index.
    pub indexed: usize,
    pub failures: Vec<SyncFailure>,
}

/// A single record that failed during a sync pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    pub dataset_id: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Which step of the per-record pipeline failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The dataset id did not parse as a `u64`.
    InvalidId,
    /// The embedding call failed or returned nothing.
    Embedding,
    /// The vector-store write failed.
    Upsert,
}
