//! Qdrant REST gateway.
//!
//! Owns the collection's existence and shape: on startup the collection
//! is created with the embedder's dimensionality and cosine distance —
//! cosine because embedding magnitude carries no meaning here, only
//! direction. Upserts replace a point wholesale by numeric id; queries
//! return payload-bearing hits in descending similarity order.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

use crate::error::{Error, Result};

use super::{IndexedPoint, ScoredPoint, SearchFilter, VectorIndex};

pub struct QdrantIndex {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    dims: usize,
}

impl QdrantIndex {
    pub fn new(base_url: &str, collection: &str, dims: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
            dims,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    async fn read_json(response: reqwest::Response, what: &str) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Connection(format!(
                "{what} failed with status {status}: {body}"
            )));
        }
        response
            .json()
            .await
            .map_err(|e| Error::Decode(format!("{what} returned invalid JSON: {e}")))
    }

    async fn collection_exists(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/collections", self.base_url))
            .send()
            .await
            .map_err(|e| Error::Connection(format!("failed to list collections: {e}")))?;

        let json = Self::read_json(response, "list collections").await?;
        let names = json["result"]["collections"]
            .as_array()
            .ok_or_else(|| Error::Decode("collection list missing".to_string()))?;

        Ok(names
            .iter()
            .any(|c| c["name"].as_str() == Some(self.collection.as_str())))
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ensure_collection(&self) -> Result<()> {
        // Not transactional: two processes can both see "absent" and both
        // create. The store rejects the duplicate; that guarantee is its.
        if self.collection_exists().await? {
            info!(collection = %self.collection, "collection already exists");
            return Ok(());
        }

        info!(collection = %self.collection, dims = self.dims, "creating collection");
        let body = json!({
            "vectors": {
                "size": self.dims,
                "distance": "Cosine",
            }
        });

        let response = self
            .client
            .put(self.collection_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Connection(format!("failed to create collection: {e}")))?;

        Self::read_json(response, "create collection").await?;
        Ok(())
    }

    async fn upsert(&self, point: IndexedPoint) -> Result<()> {
        let body = json!({
            "points": [{
                "id": point.id,
                "vector": point.vector,
                "payload": point.payload,
            }]
        });

        let response = self
            .client
            .put(format!("{}/points?wait=true", self.collection_url()))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Connection(format!("failed to upsert point: {e}")))?;

        Self::read_json(response, "upsert point").await?;
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        filter: Option<&SearchFilter>,
        limit: u64,
    ) -> Result<Vec<ScoredPoint>> {
        let mut body = json!({
            "query": vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(wire) = filter.and_then(filter_to_json) {
            body["filter"] = wire;
        }

        let response = self
            .client
            .post(format!("{}/points/query", self.collection_url()))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Connection(format!("search request failed: {e}")))?;

        let json = Self::read_json(response, "query points").await?;
        parse_query_response(&json)
    }
}

/// Build the Qdrant `filter` body: one `must` clause per present field.
/// Returns `None` for an empty filter so unfiltered searches send no
/// filter key at all.
fn filter_to_json(filter: &SearchFilter) -> Option<Value> {
    if filter.is_empty() {
        return None;
    }

    let mut must = Vec::new();
    if let Some(agency) = &filter.agency {
        must.push(json!({"key": "agency", "match": {"value": agency}}));
    }
    if let Some(category) = &filter.category {
        must.push(json!({"key": "category", "match": {"value": category}}));
    }

    Some(json!({ "must": must }))
}

fn parse_query_response(json: &Value) -> Result<Vec<ScoredPoint>> {
    let points = json["result"]["points"]
        .as_array()
        .ok_or_else(|| Error::Decode("query response missing points".to_string()))?;

    let mut hits = Vec::with_capacity(points.len());
    for point in points {
        let id = point["id"]
            .as_u64()
            .ok_or_else(|| Error::Decode("query hit missing numeric id".to_string()))?;
        let score = point["score"].as_f64().unwrap_or(0.0) as f32;
        let payload = point["payload"]
            .as_object()
            .cloned()
            .unwrap_or_default();
        hits.push(ScoredPoint { id, score, payload });
    }

    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_sends_nothing() {
        assert!(filter_to_json(&SearchFilter::default()).is_none());
    }

    #[test]
    fn filter_clauses_are_anded_must_conditions() {
        let filter = SearchFilter {
            agency: Some("EPA".into()),
            category: Some("water".into()),
        };
        let wire = filter_to_json(&filter).unwrap();
        assert_eq!(
            wire,
            json!({
                "must": [
                    {"key": "agency", "match": {"value": "EPA"}},
                    {"key": "category", "match": {"value": "water"}},
                ]
            })
        );
    }

    #[test]
    fn single_clause_filter() {
        let filter = SearchFilter {
            agency: None,
            category: Some("environment".into()),
        };
        let wire = filter_to_json(&filter).unwrap();
        assert_eq!(wire["must"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn query_response_parses_hits_in_order() {
        let body = json!({
            "result": {
                "points": [
                    {"id": 42, "score": 0.91, "payload": {"title": "Air Quality 2023"}},
                    {"id": 7, "score": 0.55, "payload": {}},
                ]
            }
        });
        let hits = parse_query_response(&body).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, 42);
        assert!(hits[0].score > hits[1].score);
        assert_eq!(
            hits[0].payload.get("title").and_then(|v| v.as_str()),
            Some("Air Quality 2023")
        );
    }

    #[test]
    fn malformed_response_is_a_decode_error() {
        let err = parse_query_response(&json!({"result": {}})).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
