//! JSON-RPC error objects and the pipeline fault taxonomy
//!
//! Every failure the pipeline can observe is a [`PipelineError`]; the ones that
//! still allow a well-formed envelope map to an [`ErrorObject`] carrying one of
//! the reserved [`code`]s and a fixed message that never echoes inner detail.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::Stage;
use crate::rpc::model::Payload;

/// Reserved JSON-RPC 2.0 error codes.
pub mod code {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error has occurred";
pub const EMPTY_BODY_MESSAGE: &str = "Unable to deserialize request, it is empty";
pub const DECODE_FAILED_MESSAGE: &str = "Unable to deserialize request";
pub const ENCODE_FAILED_MESSAGE: &str = "Unable to serialize the json-rpc response";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Payload>,
}

impl ErrorObject {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<Payload>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(code::PARSE_ERROR, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(code::INVALID_REQUEST, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(code::METHOD_NOT_FOUND, format!("Method '{method}' not found"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(code::INVALID_PARAMS, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(code::INTERNAL_ERROR, message)
    }

    /// The envelope used for every uncontrolled fault.
    pub fn unknown() -> Self {
        Self::internal_error(UNKNOWN_ERROR_MESSAGE)
    }
}

impl fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code {}: {}", self.code, self.message)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unable to read the request body: {0}")]
    ReadBody(#[source] axum::Error),
    #[error("unable to deserialize request, it is empty")]
    EmptyBody,
    #[error("unable to deserialize request: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("unable to serialize the json-rpc response: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("uncontrolled fault: {0}")]
    Fault(String),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::ReadBody(_) => Stage::Reading,
            Self::EmptyBody | Self::Decode(_) => Stage::Decoding,
            Self::Encode(_) => Stage::Encoding,
            Self::Fault(_) => Stage::Invoking,
        }
    }

    /// Wire error for this failure. `ReadBody` never reaches the wire; the
    /// transport answers it with a bare 500.
    pub fn error_object(&self) -> ErrorObject {
        match self {
            Self::EmptyBody => ErrorObject::parse_error(EMPTY_BODY_MESSAGE),
            Self::Decode(_) => ErrorObject::parse_error(DECODE_FAILED_MESSAGE),
            Self::Encode(_) => ErrorObject::internal_error(ENCODE_FAILED_MESSAGE),
            Self::ReadBody(_) | Self::Fault(_) => ErrorObject::unknown(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn error_object_serializes_null_data() {
        let value = serde_json::to_value(ErrorObject::unknown()).expect("serialize error object");
        assert_eq!(
            value,
            json!({"code": -32603, "message": "An unknown error has occurred", "data": null})
        );
    }

    #[test]
    fn decode_failures_map_to_parse_error_without_inner_text() {
        let inner = serde_json::from_slice::<serde_json::Value>(b"{nope").expect_err("bad json");
        let object = PipelineError::Decode(inner).error_object();

        assert_eq!(object.code, code::PARSE_ERROR);
        assert_eq!(object.message, DECODE_FAILED_MESSAGE);
        assert_eq!(PipelineError::EmptyBody.error_object().code, code::PARSE_ERROR);
    }

    #[test]
    fn faults_map_to_unknown_internal_error() {
        let object = PipelineError::Fault("secret detail".to_string()).error_object();
        assert_eq!(object, ErrorObject::unknown());
        assert!(!object.message.contains("secret"));
    }

    #[test]
    fn method_not_found_names_the_method() {
        let object = ErrorObject::method_not_found("tools/run");
        assert_eq!(object.code, code::METHOD_NOT_FOUND);
        assert_eq!(object.message, "Method 'tools/run' not found");
    }
}
