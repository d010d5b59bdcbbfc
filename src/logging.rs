use std::{
    backtrace::Backtrace,
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    time::Instant,
};

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt as subscriber_fmt, EnvFilter};

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    subscriber_fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started_at = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started_at.elapsed().as_millis();

    info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = elapsed_ms,
        "request summary"
    );

    if status.is_server_error() {
        warn!(method = %method, path = %path, "exchange terminated without an envelope");
    }

    response
}

/// Pipeline step a fault was observed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Reading,
    Decoding,
    Invoking,
    Encoding,
    /// Outside every pipeline step; used for faults that escaped them.
    Transport,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reading => "reading",
            Self::Decoding => "decoding",
            Self::Invoking => "invoking",
            Self::Encoding => "encoding",
            Self::Transport => "transport",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The fault decided the outcome of the exchange.
    Fault,
    /// A secondary failure the pipeline worked around.
    Degraded,
}

#[derive(Debug)]
pub struct FaultReport<'a> {
    pub stage: Stage,
    pub kind: FaultKind,
    pub message: &'a str,
    pub backtrace: &'a Backtrace,
}

impl fmt::Display for FaultReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            FaultKind::Fault => "Error",
            FaultKind::Degraded => "Degraded",
        };
        write!(
            f,
            "{label} while {}: {}\nStackTrace: {}",
            self.stage, self.message, self.backtrace
        )
    }
}

/// Side-channel for caught faults. Injected once through
/// [`AppState`](crate::AppState) and shared read-only by every request.
pub trait FaultLog: Send + Sync {
    fn report(&self, report: &FaultReport<'_>);
}

/// Default sink forwarding reports to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFaultLog;

impl FaultLog for TracingFaultLog {
    fn report(&self, report: &FaultReport<'_>) {
        match report.kind {
            FaultKind::Fault => error!(
                stage = %report.stage,
                error = %report.message,
                backtrace = %report.backtrace,
                "json-rpc fault contained"
            ),
            FaultKind::Degraded => warn!(
                stage = %report.stage,
                error = %report.message,
                backtrace = %report.backtrace,
                "json-rpc response degraded"
            ),
        }
    }
}

/// Forwards a report to `log`. A sink that panics loses the report but never
/// unwinds into the pipeline.
pub(crate) fn report_fault(log: &dyn FaultLog, stage: Stage, kind: FaultKind, message: &str) {
    let backtrace = Backtrace::capture();
    let report = FaultReport {
        stage,
        kind,
        message,
        backtrace: &backtrace,
    };

    if catch_unwind(AssertUnwindSafe(|| log.report(&report))).is_err() {
        warn!(stage = %stage, error = %message, "fault log panicked while reporting");
    }
}
