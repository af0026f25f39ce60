//! In-memory [`VectorIndex`] implementation.
//!
//! `HashMap` behind `std::sync::RwLock`, brute-force cosine similarity
//! over all stored vectors. Backs the integration tests and offline smoke
//! runs; the ranking contract (descending similarity, conjunctive filter,
//! payload attached) matches the Qdrant gateway.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Result;

use super::{IndexedPoint, ScoredPoint, SearchFilter, VectorIndex};

#[derive(Default)]
pub struct InMemoryIndex {
    points: RwLock<HashMap<u64, IndexedPoint>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored points.
    pub fn len(&self) -> usize {
        self.points.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn ensure_collection(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, point: IndexedPoint) -> Result<()> {
        self.points.write().unwrap().insert(point.id, point);
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        filter: Option<&SearchFilter>,
        limit: u64,
    ) -> Result<Vec<ScoredPoint>> {
        let points = self.points.read().unwrap();

        let mut hits: Vec<ScoredPoint> = points
            .values()
            .filter(|p| filter.map_or(true, |f| f.matches(&p.payload)))
            .map(|p| ScoredPoint {
                id: p.id,
                score: cosine_similarity(vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit as usize);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: u64, vector: Vec<f32>, agency: &str) -> IndexedPoint {
        IndexedPoint {
            id,
            vector,
            payload: serde_json::json!({"agency": agency})
                .as_object()
                .unwrap()
                .clone(),
        }
    }

    #[tokio::test]
    async fn upsert_same_id_replaces_point() {
        let index = InMemoryIndex::new();
        index.upsert(point(1, vec![1.0, 0.0], "EPA")).await.unwrap();
        index.upsert(point(1, vec![0.0, 1.0], "DOE")).await.unwrap();

        assert_eq!(index.len(), 1);
        let hits = index.query(&[0.0, 1.0], None, 10).await.unwrap();
        assert_eq!(hits[0].payload["agency"], "DOE");
    }

    #[tokio::test]
    async fn query_ranks_by_descending_similarity() {
        let index = InMemoryIndex::new();
        index.upsert(point(1, vec![1.0, 0.0], "EPA")).await.unwrap();
        index.upsert(point(2, vec![0.0, 1.0], "EPA")).await.unwrap();
        index
            .upsert(point(3, vec![0.7, 0.7], "EPA"))
            .await
            .unwrap();

        let hits = index.query(&[1.0, 0.0], None, 10).await.unwrap();
        let ids: Vec<u64> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[tokio::test]
    async fn query_respects_limit_and_filter() {
        let index = InMemoryIndex::new();
        index.upsert(point(1, vec![1.0, 0.0], "EPA")).await.unwrap();
        index.upsert(point(2, vec![1.0, 0.1], "DOE")).await.unwrap();
        index.upsert(point(3, vec![0.9, 0.0], "EPA")).await.unwrap();

        let filter = SearchFilter {
            agency: Some("EPA".into()),
            category: None,
        };
        let hits = index.query(&[1.0, 0.0], Some(&filter), 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].payload["agency"], "EPA");
    }

    #[test]
    fn cosine_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
