//! Data model shared by both backends and the native wire types of each.
//!
//! Everything in here is plain data; the conversions between shapes live in
//! [`crate::backend`].

pub mod anthropic_types;
pub mod ollama_types;
pub mod types;
