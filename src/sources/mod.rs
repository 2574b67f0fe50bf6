// src/sources/mod.rs
//! Concrete data sources behind the resource caches.
//!
//! - [`seed`]: in-memory payloads (the embedded demo data by default).
//! - [`json_file`]: `<dir>/<key>.json` read from disk.

pub mod json_file;
pub mod seed;

pub use json_file::JsonFileSource;
pub use seed::StaticSource;
