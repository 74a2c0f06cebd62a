//! Search strategies provide a generic way for Retrievers to implement their
//! search in various ways.
//!
//! The strategy is also yielded to the Retriever and can contain additional configuration

mod hybrid_search;

pub(crate) const DEFAULT_TOP_K: usize = 3;
pub(crate) const DEFAULT_ALPHA: f32 = 0.5;

pub use hybrid_search::*;
