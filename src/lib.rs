use std::sync::Arc;

use axum::{middleware, routing::any, Router};

pub mod config;
pub mod errors;
pub mod http;
pub mod logging;
pub mod rpc;

use config::DEFAULT_MAX_BODY_BYTES;
use logging::{FaultLog, TracingFaultLog};
use rpc::invoker::RequestHandler;

/// Read-only capabilities shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<dyn RequestHandler>,
    pub fault_log: Arc<dyn FaultLog>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(handler: Arc<dyn RequestHandler>) -> Self {
        Self {
            handler,
            fault_log: Arc::new(TracingFaultLog),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_fault_log(mut self, fault_log: Arc<dyn FaultLog>) -> Self {
        self.fault_log = fault_log;
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// Router serving the pipeline at `/` for every HTTP method.
pub fn build_app(state: AppState) -> Router {
    router_for("/", state)
}

pub fn router_for(path: &str, state: AppState) -> Router {
    Router::new()
        .route(path, any(http::handlers::rpc_endpoint))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
