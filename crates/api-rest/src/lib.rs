//! # API REST
//!
//! REST API for the WebDAV authoring gateway.
//!
//! Handles:
//! - HTTP endpoints with axum under `/api/files`
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, error replies)
//!
//! Uses `api-shared` for request and response types and `gateway-core` for every
//! upstream operation.

#![warn(rust_2018_idioms)]

pub mod handlers;

use axum::{
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use gateway_core::WebDavClient;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Origins allowed when `CORS_ALLOW_ORIGINS` is not set: the local editor dev server.
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173";

/// Application state for the REST API server.
///
/// The gateway keeps no per-request state; handlers only share the configured client.
#[derive(Clone)]
pub struct AppState {
    pub client: WebDavClient,
}

impl AppState {
    pub fn new(client: WebDavClient) -> Self {
        Self { client }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::base,
        handlers::tree,
        handlers::read_content,
        handlers::write_content,
        handlers::mkdir,
        handlers::remove,
        handlers::move_file,
        handlers::copy_file,
        handlers::lock,
        handlers::unlock,
        handlers::lockinfo,
        handlers::download,
        handlers::zip,
        handlers::format_xml,
        handlers::validate_dita,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::OkRes,
        api_shared::BaseRes,
        api_shared::TreeEntry,
        api_shared::TransferReq,
        api_shared::LockRes,
        api_shared::LockInfoRes,
        api_shared::UnlockReq,
        api_shared::DitaReportRes,
    ))
)]
pub struct ApiDoc;

/// Builds the CORS layer from a comma-separated origin list.
///
/// `*` anywhere in the list allows every origin. Otherwise only the listed origins are
/// allowed, with credentials, and any method or header the browser asks for.
///
/// # Errors
/// Returns an error if the list is empty or an origin is not a valid header value.
pub fn cors_layer(origins: &str) -> anyhow::Result<CorsLayer> {
    let origins: Vec<&str> = origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .collect();

    if origins.is_empty() {
        anyhow::bail!("no CORS origins configured");
    }
    if origins.contains(&"*") {
        return Ok(CorsLayer::permissive());
    }

    let origins = origins
        .into_iter()
        .map(HeaderValue::from_str)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

/// Assembles every route, the Swagger UI and the CORS layer.
pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/healthz", get(handlers::health))
        .route("/api/healthz", get(handlers::health))
        .route("/api/files", delete(handlers::remove))
        .route("/api/files/base", get(handlers::base))
        .route("/api/files/tree", get(handlers::tree))
        .route(
            "/api/files/content",
            get(handlers::read_content).put(handlers::write_content),
        )
        .route("/api/files/mkdir", post(handlers::mkdir))
        .route("/api/files/move", post(handlers::move_file))
        .route("/api/files/copy", post(handlers::copy_file))
        .route("/api/files/lock", post(handlers::lock))
        .route("/api/files/unlock", post(handlers::unlock))
        .route("/api/files/lockinfo", get(handlers::lockinfo))
        .route("/api/files/download", get(handlers::download))
        .route("/api/files/zip", get(handlers::zip))
        .route("/api/files/format/xml", post(handlers::format_xml))
        .route("/api/files/validate/dita", post(handlers::validate_dita))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .with_state(state)
}
