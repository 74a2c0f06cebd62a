//! Retrievers fetch the chunks relevant to a query.
mod hybrid;

pub use hybrid::HybridRetriever;
