//! Axum handler binding one HTTP endpoint to the JSON-RPC pipeline
//!
//! Reads the body, drives decode, invoke and encode, and hands the envelope to
//! axum. Protocol-level errors are transport successes (200); only a body that
//! cannot be read or a fault escaping every boundary ends in a bare 500. Writing
//! the bytes to the socket is owned by hyper once the response is returned.

use std::panic::AssertUnwindSafe;

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use futures::FutureExt;

use crate::errors::PipelineError;
use crate::logging::{report_fault, FaultKind, Stage};
use crate::rpc::{
    decoder::decode,
    encoder::encode,
    invoker::{invoke, panic_message},
    model,
};
use crate::AppState;

const APPLICATION_JSON: &str = "application/json";

pub async fn rpc_endpoint(State(state): State<AppState>, body: Body) -> Response {
    let outcome = AssertUnwindSafe(exchange(&state, body))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            report_fault(
                state.fault_log.as_ref(),
                err.stage(),
                FaultKind::Fault,
                &err.to_string(),
            );
            bare_internal_error()
        }
        Err(panic) => {
            report_fault(
                state.fault_log.as_ref(),
                Stage::Transport,
                FaultKind::Fault,
                &format!(
                    "fault escaped the json-rpc pipeline: {}",
                    panic_message(panic.as_ref())
                ),
            );
            bare_internal_error()
        }
    }
}

async fn exchange(state: &AppState, body: Body) -> Result<Response, PipelineError> {
    let bytes = to_bytes(body, state.max_body_bytes)
        .await
        .map_err(PipelineError::ReadBody)?;

    let response = match AssertUnwindSafe(call(state, &bytes)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            let err = PipelineError::Fault(panic_message(panic.as_ref()));
            report_fault(
                state.fault_log.as_ref(),
                err.stage(),
                FaultKind::Fault,
                &err.to_string(),
            );
            model::Response::failure(String::new(), err.error_object())
        }
    };

    let id = response.id.clone();
    let encoded = match encode(response, state.fault_log.as_ref()) {
        Ok(encoded) => encoded,
        Err(err) => encode(
            model::Response::failure(id, err.error_object()),
            state.fault_log.as_ref(),
        )?,
    };

    Ok(envelope(encoded))
}

async fn call(state: &AppState, bytes: &[u8]) -> model::Response {
    match decode(bytes) {
        Ok(request) => invoke(state.handler.as_ref(), request, state.fault_log.as_ref()).await,
        Err(err) => {
            report_fault(
                state.fault_log.as_ref(),
                err.stage(),
                FaultKind::Fault,
                &err.to_string(),
            );
            model::Response::failure(String::new(), err.error_object())
        }
    }
}

fn envelope(bytes: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, APPLICATION_JSON)],
        bytes,
    )
        .into_response()
}

fn bare_internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, APPLICATION_JSON)],
    )
        .into_response()
}
