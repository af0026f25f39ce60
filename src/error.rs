use thiserror::Error;

/// Error taxonomy for the indexing and retrieval pipeline.
///
/// The variants map onto how far a failure is allowed to spread:
/// `Connection` against the vector store is fatal at startup, everything
/// else is isolated to one record or one request and logged.
#[derive(Debug, Error)]
pub enum Error {
    /// Could not reach the ledger, the vector store, or the embedding
    /// provider, or the peer answered with a non-success status.
    #[error("connection error: {0}")]
    Connection(String),

    /// The peer answered but the body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Bad input: a non-numeric dataset id, an empty search query.
    #[error("validation error: {0}")]
    Validation(String),

    /// The embedding call failed or returned no vectors.
    #[error("embedding provider error: {0}")]
    Provider(String),
}

pub type Result<T> = std::result::Result<T, Error>;
