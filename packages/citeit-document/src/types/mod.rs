//! Core data types.

pub mod cache;
pub mod config;
pub mod doc_type;
pub mod document;
pub mod resource;
