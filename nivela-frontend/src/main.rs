use dotenvy::dotenv;
use nivela_frontend::config::get_configuration;
use nivela_frontend::services::{
    BackendClient, HostedIdentity, HostedMetadataStore, HostedObjectStore, IdentityProvider,
    Navigator, RouteGuard, SessionManager,
};
use nivela_frontend::startup::build_router;
use nivela_frontend::AppState;
use service_core::observability::logging::init_tracing;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    // Initialize tracing using shared logic
    init_tracing("nivela-frontend", &configuration.observability);

    let backend = BackendClient::new(&configuration.backend)?;
    let session_file = configuration.backend.session_file.clone().map(PathBuf::from);
    let hosted = Arc::new(HostedIdentity::new(backend.clone(), session_file).await);
    let background = CancellationToken::new();
    let refresher = hosted.spawn_refresh(background.clone());
    let identity: Arc<dyn IdentityProvider> = hosted;

    // Listen before the initial lookup so no change is missed.
    let sessions = Arc::new(SessionManager::new(identity.clone()));
    sessions.subscribe();
    tokio::spawn({
        let sessions = sessions.clone();
        async move { sessions.initialize().await }
    });
    let guard = tokio::spawn(
        RouteGuard::new(LoggedNavigator).follow(sessions.watch(), |decision| {
            tracing::debug!(decision = ?decision, "Session gate evaluated");
        }),
    );

    let data_backend = backend.with_session(sessions.watch());
    let objects = Arc::new(HostedObjectStore::new(
        data_backend.clone(),
        configuration.backend.photo_bucket.clone(),
    ));
    let metadata = Arc::new(HostedMetadataStore::new(data_backend));

    let state = AppState::new(sessions.clone(), identity, objects, metadata);
    let app = build_router(state);

    if !configuration.server.is_loopback() {
        tracing::warn!(
            host = %configuration.server.host,
            "Listening beyond loopback: every client reaching this port acts as the signed-in user"
        );
    }
    let address = format!(
        "{}:{}",
        configuration.server.host, configuration.server.port
    );
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
        tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
        anyhow::anyhow!("Failed to bind to address {}: {}", address, e)
    })?;

    info!("Starting nivela-frontend on {}", address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!("Server error: {}", e);
            anyhow::anyhow!("Server error: {}", e)
        })?;

    background.cancel();
    sessions.teardown();
    if let Err(e) = refresher.await {
        tracing::warn!("Session refresh task ended abnormally: {}", e);
    }
    guard.abort();
    info!("nivela-frontend stopped");
    Ok(())
}

/// There is no browser to send away; sign-outs are reported in the log.
struct LoggedNavigator;

impl Navigator for LoggedNavigator {
    fn replace(&mut self, path: &str) {
        info!(to = %path, "Session ended, protected pages now redirect");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}
