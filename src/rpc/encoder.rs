//! Response serialization

use crate::errors::PipelineError;
use crate::logging::{report_fault, FaultKind, FaultLog, Stage};
use crate::rpc::model::{Outcome, Payload, Response, JSONRPC_VERSION};

/// Serializes `response`, stamping `jsonrpc: "2.0"` first.
///
/// Error `data` that cannot be represented is replaced by `null` so the outer
/// error still reaches the caller. An unrepresentable `result` fails the whole
/// encode with [`PipelineError::Encode`].
pub fn encode(mut response: Response, fault_log: &dyn FaultLog) -> Result<Vec<u8>, PipelineError> {
    response.protocol_version = JSONRPC_VERSION.to_string();

    if let Outcome::Failure(error) = &mut response.outcome {
        let unrepresentable = match &error.data {
            Some(Payload::Unrepresentable(err)) => Some(err.to_string()),
            _ => None,
        };
        if let Some(reason) = unrepresentable {
            report_fault(
                fault_log,
                Stage::Encoding,
                FaultKind::Degraded,
                &format!("error data for code {} replaced with null: {reason}", error.code),
            );
            error.data = None;
        }
    }

    serde_json::to_vec(&response).map_err(|err| {
        report_fault(
            fault_log,
            Stage::Encoding,
            FaultKind::Fault,
            &format!("unable to serialize response '{}': {err}", response.id),
        );
        PipelineError::Encode(err)
    })
}
