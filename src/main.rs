use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{cors_layer, router, AppState, DEFAULT_CORS_ORIGINS};
use gateway_core::{GatewayConfig, WebDavClient};

/// Main entry point for the authoring gateway
///
/// Resolves the WebDAV configuration once, then serves the REST API until Ctrl-C.
///
/// # Environment Variables
/// - `ALFRESCO_WEBDAV_BASE`: WebDAV base URL (required)
/// - `ALFRESCO_USERNAME` / `ALFRESCO_PASSWORD`: shared service credential (required)
/// - `WEBDAV_TIMEOUT_SECS`: per-connection upstream timeout (default: 30)
/// - `GATEWAY_REST_ADDR`: REST server address (default: "0.0.0.0:8000")
/// - `CORS_ALLOW_ORIGINS`: comma-separated origins, `*` for any (default: "http://localhost:5173")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the WebDAV base URL or credentials are missing or invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gateway_run=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("gateway_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::from_lookup(|key| std::env::var(key).ok())?;
    let rest_addr = std::env::var("GATEWAY_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());
    let origins =
        std::env::var("CORS_ALLOW_ORIGINS").unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.into());

    tracing::info!("++ WebDAV base {}", config.base_url());
    tracing::info!("++ CORS origins {}", origins);
    tracing::info!("++ Starting gateway REST on {}", rest_addr);

    let app = router(
        AppState::new(WebDavClient::new(config)),
        cors_layer(&origins)?,
    );

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
