//! Generate an answer from the retrieved chunks
mod simple;

pub use simple::{Simple, SimpleBuilder};
