//! Catalog synchronization.
//!
//! One pass fetches the full catalog, embeds every record's searchable
//! text, and upserts one point per record. Failures are isolated per
//! record: a bad id or a failed embedding skips that record only, and the
//! pass reports what happened instead of raising. Only an unreachable
//! ledger or an undecodable catalog body aborts the pass.

use std::sync::Arc;
use tracing::{info, warn};

use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::index::{IndexedPoint, VectorIndex};
use crate::ledger::CatalogSource;
use crate::models::{Dataset, FailureKind, SyncFailure, SyncReport};

pub struct Synchronizer {
    catalog: Arc<dyn CatalogSource>,
    embedder: Arc<Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl Synchronizer {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        embedder: Arc<Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            catalog,
            embedder,
            index,
        }
    }

    /// Run one full sync pass.
    pub async fn sync(&self) -> Result<SyncReport> {
        let page = self.catalog.fetch_catalog().await?;
        info!(count = page.datasets.len(), "fetched catalog");

        let mut report = SyncReport {
            fetched: page.datasets.len(),
            ..SyncReport::default()
        };

        for dataset in &page.datasets {
            match self.index_dataset(dataset).await {
                Ok(()) => {
                    info!(id = %dataset.id, title = %dataset.title, "indexed dataset");
                    report.indexed += 1;
                }
                Err(failure) => {
                    warn!(
                        id = %failure.dataset_id,
                        kind = ?failure.kind,
                        "failed to index dataset: {}",
                        failure.message
                    );
                    report.failures.push(failure);
                }
            }
        }

        Ok(report)
    }

    /// Index one record: embed its searchable text and upsert the point.
    async fn index_dataset(&self, dataset: &Dataset) -> std::result::Result<(), SyncFailure> {
        let fail = |kind: FailureKind, message: String| SyncFailure {
            dataset_id: dataset.id.clone(),
            kind,
            message,
        };

        // Point identity comes from the ledger id; anything non-numeric
        // cannot be indexed.
        let point_id: u64 = dataset
            .id
            .parse()
            .map_err(|_| fail(FailureKind::InvalidId, format!("invalid dataset id: {:?}", dataset.id)))?;

        let vector = self
            .embedder
            .embed(&searchable_text(dataset))
            .await
            .map_err(|e| fail(FailureKind::Embedding, e.to_string()))?;

        let payload = match serde_json::to_value(dataset) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => {
                return Err(fail(
                    FailureKind::Upsert,
                    "dataset did not serialize to an object".to_string(),
                ))
            }
        };

        self.index
            .upsert(IndexedPoint {
                id: point_id,
                vector,
                payload,
            })
            .await
            .map_err(|e: Error| fail(FailureKind::Upsert, e.to_string()))?;

        Ok(())
    }
}

/// The text a dataset is searchable by. Field order is fixed: it feeds the
/// fallback embedding's hash, so changing it would silently re-embed the
/// whole catalog differently.
pub fn searchable_text(dataset: &Dataset) -> String {
    format!(
        "{} {} {} {}",
        dataset.title, dataset.description, dataset.agency, dataset.category
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn searchable_text_preserves_field_order() {
        let ds = Dataset {
            title: "Air Quality 2023".into(),
            description: "Hourly readings".into(),
            agency: "EPA".into(),
            category: "environment".into(),
            ..Dataset::default()
        };
        assert_eq!(
            searchable_text(&ds),
            "Air Quality 2023 Hourly readings EPA environment"
        );
    }
}
