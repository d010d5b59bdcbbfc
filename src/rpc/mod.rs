//! JSON-RPC 2.0 pipeline stages
//!
//! Decoding, handler invocation and encoding, each independent of the HTTP transport.

pub mod decoder;
pub mod encoder;
pub mod invoker;
pub mod model;
