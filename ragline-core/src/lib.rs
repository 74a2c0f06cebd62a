//! Core data model, traits and lifecycles for ragline.
//!
//! Everything that talks to the outside world is behind a trait defined here, with the
//! implementations living in `ragline-integrations`.
pub mod chunk;
pub mod errors;
pub mod file_kind;
pub mod hybrid_index;
pub mod indexing_traits;
mod metadata;
pub mod prompt;
mod query;
mod query_evaluation;
pub mod query_traits;
pub mod retry;
mod search_strategies;
pub mod type_aliases;
pub mod vector_store;

pub use type_aliases::*;

/// All traits are available from the root
pub use crate::indexing_traits::*;
pub use crate::query_traits::*;
pub use crate::vector_store::VectorStore;

pub use chunk::Chunk;
pub use errors::{IndexError, LanguageModelError, SparseEncoderError};
pub use file_kind::FileKind;
pub use hybrid_index::HybridIndex;
pub use metadata::Metadata;
pub use retry::{RetryPolicy, WithRetry};

pub mod indexing {
    pub use crate::chunk::*;
    pub use crate::hybrid_index::*;
    pub use crate::indexing_traits::*;
    pub use crate::metadata::*;
    pub use crate::vector_store::*;
}

pub mod querying {
    pub use crate::query::*;
    pub use crate::query_evaluation::*;
    pub use crate::query_traits::*;
    pub mod search_strategies {
        pub use crate::search_strategies::*;
    }
}

/// Re-export of commonly used dependencies.
pub mod prelude;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub mod util;
