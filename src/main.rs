use trial_adapt::config::Config;
use trial_adapt::logging::init_tracing;
use trial_adapt::state::AppState;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config.log);

    let state = AppState::from_env_config(&config.engine);
    match &config.engine.gateway.service_url {
        Some(url) => tracing::info!(
            %url,
            timeout_ms = config.engine.gateway.timeout.as_millis() as u64,
            "remote decision service configured"
        ),
        None => tracing::info!("no decision service configured, using local policy"),
    }

    let app = trial_adapt::create_app(state);

    let addr = config.bind_addr();
    tracing::info!(%addr, "trial-adapt listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind listener failed");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        tracing::error!(error = %e, "server error");
    }

    tracing::info!("shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
