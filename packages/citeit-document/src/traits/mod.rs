//! Core trait abstractions for document resolution.
//!
//! These traits define the collaborators the pipeline talks to: network
//! retrieval, text caches and archives, and the optional extraction
//! capabilities.

pub mod extractor;
pub mod fetcher;
pub mod store;
