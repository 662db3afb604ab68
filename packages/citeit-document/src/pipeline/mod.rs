//! Resolution pipeline: document records and the resolver that creates them.
//!
//! Control flow for one document:
//! normalize -> document cache -> fetch -> classify -> decode -> canonicalize
//! -> extract (plus provider transcripts) -> detect language -> cache.

pub mod document;
pub mod resolver;

pub use document::Document;
pub use resolver::{Resolver, ResolverBuilder};
