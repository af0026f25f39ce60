//! # Catalog Search
//!
//! Keeps a semantic search index synchronized with a ledger's dataset
//! catalog and serves nearest-neighbor queries over it.
//!
//! ## Architecture
//!
//! ```text
//!                  write path
//! ┌───────────┐   ┌──────────────┐   ┌──────────┐   ┌─────────┐
//! │ Scheduler │──▶│ Synchronizer │──▶│ Embedder │──▶│ Qdrant  │
//! └───────────┘   └──────────────┘   └──────────┘   │ (index) │
//!                        │                ▲         └────┬────┘
//!                   ┌────▼────┐      ┌────┴────┐         │
//!                   │ Ledger  │      │  Query  │◀────────┘
//!                   │ catalog │      │ Engine  │  read path
//!                   └─────────┘      └─────────┘
//! ```
//!
//! Both paths share the embedder and the vector index; they are otherwise
//! independent. The embedder runs remote or deterministic-fallback mode,
//! chosen once at startup, so the service works with or without a live
//! embedding provider.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration with documented defaults |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Dataset, catalog page, search and report DTOs |
//! | [`embedding`] | Dual-mode embedding provider |
//! | [`index`] | Vector index trait, Qdrant gateway, in-memory backend |
//! | [`ledger`] | Catalog source trait and ledger HTTP client |
//! | [`sync`] | Full-catalog synchronization with per-record isolation |
//! | [`scheduler`] | Periodic + on-demand sync, single-flight |
//! | [`search`] | Query engine: filters and result reconstruction |
//! | [`server`] | HTTP surface: `/health`, `/search`, `/reindex` |

pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod ledger;
pub mod models;
pub mod scheduler;
pub mod search;
pub mod server;
pub mod sync;
