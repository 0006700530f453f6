pub mod api;
pub mod auth;
pub mod cli;
pub mod jwt;

use api::{create_api_router, recovery};
use auth::{CookiePolicy, SessionAuth, TokenRefresher, session_middleware};
use axum::{Router, middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub struct ServerConfig {
    /// Shared secret the access tokens are signed with
    pub jwt_secret: Vec<u8>,
    /// Client used to exchange refresh tokens for new token pairs
    pub refresher: Arc<dyn TokenRefresher>,
    /// Lifetimes and attributes of the session cookies
    pub cookies: CookiePolicy,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let session = Arc::new(SessionAuth::new(
        &config.jwt_secret,
        config.refresher.clone(),
        config.cookies,
    ));

    Router::new()
        .nest("/api", create_api_router())
        .layer(middleware::from_fn_with_state(session, session_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(recovery::layer()),
        )
}

/// Run the server on the given listener until `shutdown` resolves.
pub async fn run_server<F>(
    config: ServerConfig,
    listener: TcpListener,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = create_app(&config);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener, std::future::pending()).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
