//! Request body decoding

use serde::de::Error as _;
use serde_json::Value;

use crate::errors::PipelineError;
use crate::rpc::model::Request;

/// Decodes a raw body into a [`Request`].
///
/// Only the shape is checked here: the payload must be a single JSON object.
/// An empty method or a `jsonrpc` other than `"2.0"` is left for the handler
/// to judge.
pub fn decode(bytes: &[u8]) -> Result<Request, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyBody);
    }

    let payload: Value = serde_json::from_slice(bytes).map_err(PipelineError::Decode)?;
    if !payload.is_object() {
        return Err(PipelineError::Decode(serde_json::Error::custom(
            "request must be a json object",
        )));
    }

    serde_json::from_value(payload).map_err(PipelineError::Decode)
}
