//! HTTP transport for the JSON-RPC pipeline
//!
//! Binds the pipeline to a single axum route.

pub mod handlers;
