//! Transform queries that are yet to be made
mod embed;
mod sparse_embed;

pub use embed::Embed;
pub use sparse_embed::SparseEmbed;
