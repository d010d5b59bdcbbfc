use std::sync::Arc;

use jsonrpc_endpoint::{
    config::Config,
    errors::ErrorObject,
    logging,
    router_for,
    rpc::{
        invoker::{handler_fn, HandlerError},
        model::{Request, Response},
    },
    AppState,
};
use tracing::info;

/// Echoes the method name back as the result; `fail` answers with an
/// application error carrying the params.
async fn echo(request: Request) -> Result<Response, HandlerError> {
    if request.method == "fail" {
        return Ok(Response::failure(
            request.id,
            ErrorObject::new(-1, "echo failure").with_data(request.params),
        ));
    }

    Ok(Response::success(request.id, request.method))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let bind_socket = config.bind_socket()?;
    let state =
        AppState::new(Arc::new(handler_fn(echo))).with_max_body_bytes(config.max_body_bytes);
    let app = router_for(&config.path, state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        path = %config.path,
        "server starting"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
