//! Query engine: free text plus optional structured filters in, ranked
//! datasets out.

use std::sync::Arc;

use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::index::{SearchFilter, VectorIndex};
use crate::models::{Dataset, SearchRequest, SearchResponse};

const DEFAULT_LIMIT: u64 = 10;

pub struct QueryEngine {
    embedder: Arc<Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl QueryEngine {
    pub fn new(embedder: Arc<Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Run a semantic search: embed the query, apply the conjunctive
    /// agency/category filter, and reconstruct datasets from the returned
    /// payloads in the store's rank order.
    pub async fn search(&self, req: &SearchRequest) -> Result<SearchResponse> {
        // Re-asserted here even though the HTTP layer rejects it first.
        if req.query.trim().is_empty() {
            return Err(Error::Validation("query must not be empty".to_string()));
        }

        let limit = if req.limit > 0 {
            req.limit as u64
        } else {
            DEFAULT_LIMIT
        };

        let filter = build_filter(req);
        let vector = self.embedder.embed(&req.query).await?;

        let hits = self
            .index
            .query(&vector, filter.as_ref(), limit)
            .await?;

        let results: Vec<Dataset> = hits
            .iter()
            .map(|hit| dataset_from_payload(&hit.payload))
            .collect();

        Ok(SearchResponse {
            query: req.query.clone(),
            count: results.len(),
            results,
        })
    }
}

/// A clause is added iff the field is present and non-empty; both present
/// are ANDed. Neither present means no filter at all.
fn build_filter(req: &SearchRequest) -> Option<SearchFilter> {
    let non_empty = |s: &Option<String>| s.as_deref().filter(|v| !v.is_empty()).map(String::from);

    let filter = SearchFilter {
        agency: non_empty(&req.agency),
        category: non_empty(&req.category),
    };

    if filter.is_empty() {
        None
    } else {
        Some(filter)
    }
}

/// Rebuild a [`Dataset`] from a point payload.
///
/// Reconstruction is lossy for the unsigned counters: a stored zero and an
/// absent field both come back as 0 (`fileSize`, `pinCount`). Kept as-is —
/// real catalog entries describe actual uploads, so zero-valued records are
/// not expected, and distinguishing the cases would require a payload
/// schema change for deployed collections.
fn dataset_from_payload(payload: &serde_json::Map<String, serde_json::Value>) -> Dataset {
    Dataset {
        id: payload_str(payload, "id"),
        title: payload_str(payload, "title"),
        description: payload_str(payload, "description"),
        ipfs_cid: payload_str(payload, "ipfsCid"),
        file_size: payload_u64(payload, "fileSize"),
        checksum_sha256: payload_str(payload, "checksumSha256"),
        agency: payload_str(payload, "agency"),
        category: payload_str(payload, "category"),
        submitter: payload_str(payload, "submitter"),
        timestamp: payload_i64(payload, "timestamp"),
        pin_count: payload_u64(payload, "pinCount"),
    }
}

fn payload_str(payload: &serde_json::Map<String, serde_json::Value>, key: &str) -> String {
    payload
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn payload_u64(payload: &serde_json::Map<String, serde_json::Value>, key: &str) -> u64 {
    payload.get(key).and_then(|v| v.as_u64()).unwrap_or(0)
}

fn payload_i64(payload: &serde_json::Map<String, serde_json::Value>, key: &str) -> i64 {
    payload.get(key).and_then(|v| v.as_i64()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::memory::InMemoryIndex;

    fn engine_with_empty_index() -> QueryEngine {
        QueryEngine::new(
            Arc::new(Embedder::fallback(16)),
            Arc::new(InMemoryIndex::new()),
        )
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let engine = engine_with_empty_index();
        let err = engine
            .search(&SearchRequest {
                query: "   ".into(),
                ..SearchRequest::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn filter_skips_empty_strings() {
        let req = SearchRequest {
            query: "q".into(),
            agency: Some(String::new()),
            category: Some("water".into()),
            ..SearchRequest::default()
        };
        let filter = build_filter(&req).unwrap();
        assert!(filter.agency.is_none());
        assert_eq!(filter.category.as_deref(), Some("water"));
    }

    #[test]
    fn no_filter_when_neither_field_set() {
        let req = SearchRequest {
            query: "q".into(),
            ..SearchRequest::default()
        };
        assert!(build_filter(&req).is_none());
    }

    #[test]
    fn payload_reconstruction_defaults_absent_fields() {
        let payload = serde_json::json!({
            "id": "42",
            "title": "Air Quality 2023",
            "fileSize": 2048,
        })
        .as_object()
        .unwrap()
        .clone();

        let ds = dataset_from_payload(&payload);
        assert_eq!(ds.id, "42");
        assert_eq!(ds.file_size, 2048);
        assert_eq!(ds.description, "");
        assert_eq!(ds.pin_count, 0);
        assert_eq!(ds.timestamp, 0);
    }

    #[test]
    fn stored_zero_and_absent_are_indistinguishable() {
        let with_zero = serde_json::json!({"fileSize": 0})
            .as_object()
            .unwrap()
            .clone();
        let without = serde_json::Map::new();
        assert_eq!(payload_u64(&with_zero, "fileSize"), payload_u64(&without, "fileSize"));
    }

    #[tokio::test]
    async fn nonpositive_limit_defaults_to_ten() {
        let embedder = Arc::new(Embedder::fallback(8));
        let index = Arc::new(InMemoryIndex::new());
        for i in 1..=15u64 {
            index
                .upsert(crate::index::IndexedPoint {
                    id: i,
                    vector: embedder.embed(&format!("dataset {i}")).await.unwrap(),
                    payload: serde_json::json!({"id": i.to_string()})
                        .as_object()
                        .unwrap()
                        .clone(),
                })
                .await
                .unwrap();
        }
        let engine = QueryEngine::new(embedder, index);

        let zero = engine
            .search(&SearchRequest {
                query: "rivers".into(),
                limit: 0,
                ..SearchRequest::default()
            })
            .await
            .unwrap();
        let ten = engine
            .search(&SearchRequest {
                query: "rivers".into(),
                limit: 10,
                ..SearchRequest::default()
            })
            .await
            .unwrap();

        assert_eq!(zero.count, 10);
        assert_eq!(zero.count, ten.count);
        let ids = |r: &SearchResponse| r.results.iter().map(|d| d.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&zero), ids(&ten));
    }
}
