//! BM25 sparse encoding with a persisted, fit-once state.
//!
//! ```no_run
//! # use ragline_integrations::bm25::SparseEncoderStore;
//! # async fn run() -> anyhow::Result<()> {
//! let store = SparseEncoderStore::new("data/bm25_values.json");
//!
//! // Indexing process
//! let fitted = store.fit_and_persist(&["the cat sat", "the dog ran"]).await?;
//!
//! // Retrieval process
//! let encoder = store.load_or_fail().await?;
//! # Ok(())
//! # }
//! ```
mod encoder;
mod store;
mod tokenizer;

pub use encoder::{Bm25Encoder, Bm25State, DEFAULT_B, DEFAULT_K1};
pub use store::{FittedEncoder, SparseEncoderStore};
pub use tokenizer::tokenize;
