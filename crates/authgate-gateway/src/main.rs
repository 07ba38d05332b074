//! authgate authorizer service.
//!
//! Config comes from the YAML file named by `AUTHGATE_CONFIG` when set,
//! otherwise from `AUTHGATE_*` environment variables.

use std::net::SocketAddr;
use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use authgate_core::error::{AuthGateError, Result};
use authgate_gateway::{app_state, config, ops, router};

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, code = e.client_code().as_str(), "authgate failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cfg = match std::env::var("AUTHGATE_CONFIG") {
        Ok(path) => config::load_from_file(&path)?,
        Err(_) => config::load_from_env()?,
    };
    let listen: SocketAddr = cfg
        .server
        .listen
        .parse()
        .map_err(|e| AuthGateError::Config(format!("server.listen must be a valid SocketAddr: {e}")))?;

    let state = app_state::AppState::new(cfg)?;
    tokio::spawn(ops::signals::watch_kill_switch(state.engine().kill_switch().clone()));
    let app = router::build_router(state);

    tracing::info!(%listen, "authgate starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| AuthGateError::Internal(format!("failed to bind: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AuthGateError::Internal(format!("server failed: {e}")))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
