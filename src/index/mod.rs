//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait is the seam between the pipeline and the
//! vector store: the synchronizer writes [`IndexedPoint`]s through it and
//! the query engine reads [`ScoredPoint`]s back. Two implementations:
//!
//! - [`qdrant::QdrantIndex`] — the production backend, talking to Qdrant
//!   over its REST API.
//! - [`memory::InMemoryIndex`] — brute-force cosine ranking over a
//!   `HashMap`, for tests and offline runs.
//!
//! All mutation goes through single-point upsert keyed by numeric id —
//! no read-modify-write — so implementations need no locking beyond their
//! own interior state, and overlapping writers converge to last-write-wins.

pub mod memory;
pub mod qdrant;

use async_trait::async_trait;

use crate::error::Result;

/// A point as stored in the vector index: numeric identity, embedding,
/// and a flat scalar payload carrying every dataset field.
#[derive(Debug, Clone)]
pub struct IndexedPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// A query hit: the stored payload plus the store's similarity score.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: u64,
    pub score: f32,
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// Conjunctive equality filter over payload fields. A clause is present
/// only when set; both present means both must match.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub agency: Option<String>,
    pub category: Option<String>,
}

impl SearchFilter {
    pub fn is_empty(&self) -> bool {
        self.agency.is_none() && self.category.is_none()
    }

    /// Whether a payload satisfies every present clause.
    pub fn matches(&self, payload: &serde_json::Map<String, serde_json::Value>) -> bool {
        let field_eq = |key: &str, want: &Option<String>| match want {
            Some(value) => payload.get(key).and_then(|v| v.as_str()) == Some(value.as_str()),
            None => true,
        };
        field_eq("agency", &self.agency) && field_eq("category", &self.category)
    }
}

/// Abstract nearest-neighbor index holding one point per dataset.
///
/// Implementations must be `Send + Sync`; the scheduler task and HTTP
/// handlers call into the same instance concurrently.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the collection if it does not exist yet.
    ///
    /// The existence check and the creation are not transactional against
    /// concurrent creators; the store itself must reject or merge a
    /// duplicate creation.
    async fn ensure_collection(&self) -> Result<()>;

    /// Insert or fully replace the point with this id.
    async fn upsert(&self, point: IndexedPoint) -> Result<()>;

    /// Return up to `limit` points ordered by descending cosine
    /// similarity to `vector`, with payloads attached. `None` filter
    /// means unfiltered search.
    async fn query(
        &self,
        vector: &[f32],
        filter: Option<&SearchFilter>,
        limit: u64,
    ) -> Result<Vec<ScoredPoint>>;
}
