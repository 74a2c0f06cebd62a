//! Integrations with external services and local implementations of the ragline traits.
//!
//! Remote integrations are behind features (enabled by default). Every http client is built
//! from a [`transport::TransportConfig`].
pub mod bm25;
pub mod memory;
pub mod transport;

#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "pinecone")]
pub mod pinecone;
