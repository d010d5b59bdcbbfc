//! Handler invocation behind a fault-isolation boundary

use std::{any::Any, error::Error as StdError, future::Future, panic::AssertUnwindSafe};

use async_trait::async_trait;
use futures::FutureExt;
use thiserror::Error;
use tracing::debug;

use crate::errors::ErrorObject;
use crate::logging::{report_fault, FaultKind, FaultLog, Stage};
use crate::rpc::model::{Request, Response};

#[derive(Debug, Error)]
pub enum HandlerError {
    /// A deliberate protocol error; its code, message and data reach the caller.
    #[error("{0}")]
    Rpc(ErrorObject),
    /// Anything else. Only the logger ever sees the inner error.
    #[error("{0}")]
    Fault(#[source] Box<dyn StdError + Send + Sync + 'static>),
}

impl HandlerError {
    pub fn fault(err: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        Self::Fault(err.into())
    }
}

impl From<ErrorObject> for HandlerError {
    fn from(error: ErrorObject) -> Self {
        Self::Rpc(error)
    }
}

#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: Request) -> Result<Response, HandlerError>;
}

/// Adapts an async closure into a [`RequestHandler`].
#[derive(Debug, Clone, Copy)]
pub struct HandlerFn<F>(F);

pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, HandlerError>> + Send + 'static,
{
    HandlerFn(f)
}

#[async_trait]
impl<F, Fut> RequestHandler for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, HandlerError>> + Send + 'static,
{
    async fn handle(&self, request: Request) -> Result<Response, HandlerError> {
        (self.0)(request).await
    }
}

/// Runs `handler` exactly once for `request`.
///
/// Never fails: a structured [`HandlerError::Rpc`] becomes an error response
/// echoing the request id, while a [`HandlerError::Fault`] or a panic becomes
/// the fixed internal error and is reported to `fault_log`.
pub async fn invoke(
    handler: &dyn RequestHandler,
    request: Request,
    fault_log: &dyn FaultLog,
) -> Response {
    let id = request.id.clone();
    let method = request.method.clone();

    let outcome = AssertUnwindSafe(async move { handler.handle(request).await })
        .catch_unwind()
        .await;

    let response = match outcome {
        Ok(Ok(response)) => response,
        Ok(Err(HandlerError::Rpc(error))) => Response::failure(id, error),
        Ok(Err(HandlerError::Fault(err))) => {
            report_fault(
                fault_log,
                Stage::Invoking,
                FaultKind::Fault,
                &format!("handler for '{method}' failed: {err}"),
            );
            Response::failure(id, ErrorObject::unknown())
        }
        Err(panic) => {
            report_fault(
                fault_log,
                Stage::Invoking,
                FaultKind::Fault,
                &format!("handler for '{method}' panicked: {}", panic_message(panic.as_ref())),
            );
            Response::failure(id, ErrorObject::unknown())
        }
    };

    debug!(
        method = %method,
        id = %response.id,
        outcome = if response.is_error() { "failure" } else { "success" },
        "json-rpc call completed"
    );

    response
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use serde_json::json;

    use super::*;
    use crate::errors::{code, UNKNOWN_ERROR_MESSAGE};
    use crate::logging::testing::RecordingFaultLog;
    use crate::rpc::model::Payload;

    fn ping() -> Request {
        Request::new("42", "ping", json!(null))
    }

    async fn pong(request: Request) -> Result<Response, HandlerError> {
        Ok(Response::success(request.id, "pong"))
    }

    async fn unknown_method(request: Request) -> Result<Response, HandlerError> {
        Err(HandlerError::Rpc(
            ErrorObject::method_not_found(&request.method).with_data(json!({"hint": "try ping"})),
        ))
    }

    async fn broken_backend(_request: Request) -> Result<Response, HandlerError> {
        Err(HandlerError::fault(io::Error::other("database password rejected")))
    }

    async fn exploding(request: Request) -> Result<Response, HandlerError> {
        if request.method == "ping" {
            panic!("handler exploded");
        }
        Ok(Response::success(request.id, "unreachable"))
    }

    #[tokio::test]
    async fn returns_handler_response() {
        let log = RecordingFaultLog::default();

        let response = invoke(&handler_fn(pong), ping(), &log).await;

        assert_eq!(response, Response::success("42", "pong"));
        assert!(log.entries().is_empty());
    }

    #[tokio::test]
    async fn structured_error_keeps_code_and_id() {
        let log = RecordingFaultLog::default();

        let response = invoke(
            &handler_fn(unknown_method),
            Request::new("5", "nope", json!(null)),
            &log,
        )
        .await;

        assert_eq!(response.id, "5");
        let error = response.error().expect("error response");
        assert_eq!(error.code, code::METHOD_NOT_FOUND);
        assert_eq!(error.data, Some(Payload::Json(json!({"hint": "try ping"}))));
        assert!(log.entries().is_empty());
    }

    #[tokio::test]
    async fn fault_is_hidden_from_caller_and_logged() {
        let log = RecordingFaultLog::default();

        let response = invoke(&handler_fn(broken_backend), ping(), &log).await;

        let error = response.error().expect("error response");
        assert_eq!(error.code, code::INTERNAL_ERROR);
        assert_eq!(error.message, UNKNOWN_ERROR_MESSAGE);
        assert_eq!(response.id, "42");

        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].stage, Stage::Invoking);
        assert!(entries[0].message.contains("database password rejected"));
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let log = RecordingFaultLog::default();

        let response = invoke(&handler_fn(exploding), ping(), &log).await;

        assert_eq!(response.error(), Some(&ErrorObject::unknown()));
        assert!(log.entries()[0].message.contains("handler exploded"));
    }

    #[test]
    fn panic_message_handles_unknown_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&"owned".to_string()), "owned");
        assert_eq!(panic_message(&7_u8), "Unknown panic");
    }
}
