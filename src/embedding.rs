//! Embedding generation for indexing and search.
//!
//! A single [`Embedder`] serves both the write path (sync) and the read
//! path (search). It runs in one of two modes, chosen once at startup:
//!
//! - **Remote** — calls the OpenAI embeddings API with a single-text batch
//!   request. Selected when `OPENAI_API_KEY` is present in the environment.
//! - **Fallback** — a deterministic pseudo-embedding derived from a text
//!   hash. No network, fully reproducible, so the whole pipeline stays
//!   functional and testable offline.
//!
//! Callers never observe which mode ran; both produce vectors of the same
//! dimensionality, so index and query vectors stay comparable.
//!
//! # Retry Strategy (remote mode)
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tracing::info;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Text-to-vector converter shared by the synchronizer and the query
/// engine. Stateless after construction; safe for concurrent use.
pub struct Embedder {
    dims: usize,
    mode: Mode,
}

enum Mode {
    Remote(RemoteEmbedder),
    Fallback,
}

struct RemoteEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_retries: u32,
}

impl Embedder {
    /// Build an embedder, selecting the mode from the environment:
    /// remote when `OPENAI_API_KEY` is set, deterministic fallback
    /// otherwise. The choice holds for the process lifetime.
    pub fn from_env(config: &EmbeddingConfig) -> Result<Self> {
        let mode = match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => {
                info!(model = %config.model, "embedding credential found, using remote embeddings");
                let client = reqwest::Client::builder()
                    .timeout(Duration::from_secs(config.timeout_secs))
                    .build()
                    .map_err(|e| Error::Provider(format!("failed to build HTTP client: {e}")))?;
                Mode::Remote(RemoteEmbedder {
                    client,
                    api_key: key.trim().to_string(),
                    model: config.model.clone(),
                    max_retries: config.max_retries,
                })
            }
            _ => {
                info!("no embedding credential, using deterministic fallback embeddings");
                Mode::Fallback
            }
        };

        Ok(Self {
            dims: config.dims,
            mode,
        })
    }

    /// Build an embedder that always uses the deterministic fallback.
    pub fn fallback(dims: usize) -> Self {
        Self {
            dims,
            mode: Mode::Fallback,
        }
    }

    /// The fixed output dimensionality, identical for both modes.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Convert `text` into a vector of length [`dims`](Self::dims).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Provider`] when the remote call fails after retries
    /// or returns no vectors. The fallback mode never fails.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match &self.mode {
            Mode::Remote(remote) => remote.embed(text).await,
            Mode::Fallback => Ok(pseudo_embedding(text, self.dims)),
        }
    }
}

impl RemoteEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(OPENAI_EMBEDDINGS_URL)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await.map_err(|e| {
                            Error::Provider(format!("invalid embedding response: {e}"))
                        })?;
                        return parse_embedding_response(&json);
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(Error::Provider(format!(
                            "embedding API error {status}: {body_text}"
                        )));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    return Err(Error::Provider(format!(
                        "embedding API error {status}: {body_text}"
                    )));
                }
                Err(e) => {
                    last_err = Some(Error::Provider(format!("embedding request failed: {e}")));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| Error::Provider("embedding failed after retries".to_string())))
    }
}

/// Extract the first `data[].embedding` array from the provider response.
fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| Error::Provider("embedding response missing data array".to_string()))?;

    let first = data
        .first()
        .ok_or_else(|| Error::Provider("no embedding returned".to_string()))?;

    let embedding = first
        .get("embedding")
        .and_then(|e| e.as_array())
        .ok_or_else(|| Error::Provider("embedding response missing vector".to_string()))?;

    Ok(embedding
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

/// Deterministic pseudo-embedding.
///
/// Lower-cases the text, folds it into a wrapping 32-bit polynomial hash
/// (`h = h*31 + codepoint`), seeds a PRNG with that hash, and draws `dims`
/// uniform values in `[-1, 1]`. The vector is then scaled by
/// `1 / (sum_of_squares + 1e-4)` — a stabilized approximation of L2
/// normalization, not the exact norm; the ε term guards division by zero
/// and is part of the contract, since equal lowercased text must always
/// yield bit-identical output.
pub fn pseudo_embedding(text: &str, dims: usize) -> Vec<f32> {
    let mut embedding = raw_draws(text, dims);

    let sum_sq: f32 = embedding.iter().map(|v| v * v).sum();
    let scale = (1.0 / (f64::from(sum_sq) + 1e-4)) as f32;
    for v in &mut embedding {
        *v *= scale;
    }

    embedding
}

fn raw_draws(text: &str, dims: usize) -> Vec<f32> {
    let text = text.to_lowercase();

    let mut hash: i32 = 0;
    for c in text.chars() {
        hash = hash.wrapping_mul(31).wrapping_add(c as i32);
    }

    let mut rng = StdRng::seed_from_u64(hash as u32 as u64);
    (0..dims).map(|_| rng.gen::<f32>() * 2.0 - 1.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIMS: usize = 1536;

    #[test]
    fn fallback_is_deterministic() {
        let a = pseudo_embedding("air quality data", DIMS);
        let b = pseudo_embedding("air quality data", DIMS);
        assert_eq!(a, b);
    }

    #[test]
    fn fallback_is_case_insensitive() {
        let a = pseudo_embedding("Air Quality DATA", DIMS);
        let b = pseudo_embedding("air quality data", DIMS);
        assert_eq!(a, b);
    }

    #[test]
    fn different_texts_differ() {
        let a = pseudo_embedding("a", DIMS);
        let b = pseudo_embedding("b", DIMS);
        assert_ne!(a, b);
    }

    #[test]
    fn output_length_is_fixed() {
        assert_eq!(pseudo_embedding("", DIMS).len(), DIMS);
        assert_eq!(pseudo_embedding("x", DIMS).len(), DIMS);
        let long = "water ".repeat(10_000);
        assert_eq!(pseudo_embedding(&long, DIMS).len(), DIMS);
    }

    #[test]
    fn raw_draws_are_bounded() {
        for v in raw_draws("rivers and streams", DIMS) {
            assert!((-1.0..=1.0).contains(&v), "raw value {v} out of range");
        }
    }

    #[test]
    fn scale_matches_stabilized_norm() {
        let raw = raw_draws("epa environment", DIMS);
        let sum_sq: f32 = raw.iter().map(|v| v * v).sum();
        let scale = (1.0 / (f64::from(sum_sq) + 1e-4)) as f32;

        let scaled = pseudo_embedding("epa environment", DIMS);
        for (r, s) in raw.iter().zip(scaled.iter()) {
            assert_eq!(r * scale, *s);
        }
    }

    #[tokio::test]
    async fn fallback_embedder_never_fails() {
        let embedder = Embedder::fallback(8);
        let v = embedder.embed("anything").await.unwrap();
        assert_eq!(v.len(), 8);
        assert_eq!(embedder.dims(), 8);
    }

    #[test]
    fn parse_response_extracts_first_vector() {
        let json = serde_json::json!({
            "data": [{"embedding": [0.25, -0.5], "index": 0}]
        });
        assert_eq!(parse_embedding_response(&json).unwrap(), vec![0.25, -0.5]);
    }

    #[test]
    fn parse_response_rejects_empty_data() {
        let json = serde_json::json!({"data": []});
        let err = parse_embedding_response(&json).unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }
}
