//! Request and response envelopes exchanged with the embedder's handler

use std::sync::Arc;

use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::errors::ErrorObject;

pub const JSONRPC_VERSION: &str = "2.0";

/// Opaque JSON node carried in `result` and `error.data`.
///
/// Built from a [`Value`] or from any serializable type. A conversion that
/// fails is kept as [`Payload::Unrepresentable`] and only surfaces once the
/// response is encoded.
#[derive(Debug, Clone)]
pub enum Payload {
    Json(Value),
    Unrepresentable(Arc<serde_json::Error>),
}

impl Payload {
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Self::Json(value),
            Err(err) => Self::Unrepresentable(Arc::new(err)),
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Unrepresentable(_) => None,
        }
    }

    pub fn is_representable(&self) -> bool {
        matches!(self, Self::Json(_))
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::Json(Value::Null)
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Json(left), Self::Json(right)) => left == right,
            _ => false,
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Json(Value::String(value.to_string()))
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Json(Value::String(value))
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Json(value) => value.serialize(serializer),
            Self::Unrepresentable(err) => Err(ser::Error::custom(err)),
        }
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::Json)
    }
}

/// A decoded JSON-RPC call. `jsonrpc` is echoed as-is and never validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "jsonrpc", default, deserialize_with = "null_as_empty")]
    pub protocol_version: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Request {
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: Value) -> Self {
        Self {
            protocol_version: JSONRPC_VERSION.to_string(),
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Payload),
    Failure(ErrorObject),
}

/// A JSON-RPC response. Exactly one of `result`/`error` is populated on the
/// wire; the other side is written as `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub protocol_version: String,
    pub id: String,
    pub outcome: Outcome,
}

impl Response {
    pub fn success(id: impl Into<String>, result: impl Into<Payload>) -> Self {
        Self {
            protocol_version: JSONRPC_VERSION.to_string(),
            id: id.into(),
            outcome: Outcome::Success(result.into()),
        }
    }

    pub fn failure(id: impl Into<String>, error: ErrorObject) -> Self {
        Self {
            protocol_version: JSONRPC_VERSION.to_string(),
            id: id.into(),
            outcome: Outcome::Failure(error),
        }
    }

    pub fn result(&self) -> Option<&Payload> {
        match &self.outcome {
            Outcome::Success(result) => Some(result),
            Outcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorObject> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failure(error) => Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Failure(_))
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    jsonrpc: &'a str,
    id: &'a str,
    result: Option<&'a Payload>,
    error: Option<&'a ErrorObject>,
}

#[derive(Deserialize)]
struct EnvelopeOwned {
    #[serde(default)]
    jsonrpc: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    result: Option<Payload>,
    #[serde(default)]
    error: Option<ErrorObject>,
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        EnvelopeRef {
            jsonrpc: &self.protocol_version,
            id: &self.id,
            result: self.result(),
            error: self.error(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Response {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let envelope = EnvelopeOwned::deserialize(deserializer)?;
        let outcome = match (envelope.result, envelope.error) {
            (Some(Payload::Json(Value::Null)) | None, Some(error)) => Outcome::Failure(error),
            (Some(_), Some(_)) => {
                return Err(de::Error::custom(
                    "response must not carry both result and error",
                ))
            }
            (result, None) => Outcome::Success(result.unwrap_or_default()),
        };

        Ok(Self {
            protocol_version: envelope.jsonrpc,
            id: envelope.id,
            outcome,
        })
    }
}
