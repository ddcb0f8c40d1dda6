pub mod config;
pub mod ingest_core;
pub mod transform_core;
