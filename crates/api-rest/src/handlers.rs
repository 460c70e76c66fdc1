//! Request handlers for the `/api/files` surface.
//!
//! Handlers translate query strings and bodies into core calls and core errors into
//! `(StatusCode, String)` replies. They hold no state between requests.

use crate::AppState;
use api_shared::{
    BaseRes, DitaReportRes, HealthRes, HealthService, LockInfoRes, LockRes, OkRes, TransferReq,
    TreeEntry, UnlockReq,
};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderMap, HeaderName, StatusCode,
    },
    response::Json,
};
use gateway_core::constants::{DEFAULT_CONTENT_TYPE, DEFAULT_LOCK_OWNER, DEFAULT_LOCK_TIMEOUT_SECS};
use gateway_core::{lock_token, paths, Depth, GatewayError};
use serde::Deserialize;
use utoipa::IntoParams;

/// Header the editor uses to pass its lock token along with a save.
pub const LOCK_TOKEN_HEADER: &str = "x-lock-token";

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

pub type ApiError = (StatusCode, String);
pub type ApiResult<T> = Result<T, ApiError>;
pub type Attachment = ([(HeaderName, String); 2], Vec<u8>);

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TreeQuery {
    /// Collection to list; empty for the repository root.
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PathQuery {
    /// Repository-relative path.
    pub path: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LockQuery {
    pub path: String,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_owner() -> String {
    DEFAULT_LOCK_OWNER.to_owned()
}

fn default_timeout() -> u64 {
    DEFAULT_LOCK_TIMEOUT_SECS
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UnlockQuery {
    pub path: String,
    /// Lock token; may instead be sent as the body.
    pub token: Option<String>,
}

/// Maps a core error onto the HTTP reply the frontend expects.
///
/// Upstream failures keep their status and body so the editor can show what the
/// repository said.
pub(crate) fn api_error(operation: &str, err: GatewayError) -> ApiError {
    match err {
        GatewayError::Upstream { status, body } => {
            tracing::warn!("{} rejected upstream with {}", operation, status);
            (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                body,
            )
        }
        GatewayError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found".into()),
        GatewayError::LockConflict(_) => (StatusCode::LOCKED, "Resource locked.".into()),
        GatewayError::MissingToken => (StatusCode::BAD_REQUEST, "Missing lock token".into()),
        GatewayError::InvalidInput(message) => (StatusCode::BAD_REQUEST, message),
        GatewayError::Parse(message) => {
            tracing::error!("{} error: {}", operation, message);
            (StatusCode::BAD_GATEWAY, message)
        }
        GatewayError::Transport(e) => {
            tracing::error!("{} error: {:?}", operation, e);
            (StatusCode::BAD_GATEWAY, e.to_string())
        }
        other => {
            tracing::error!("{} error: {:?}", operation, other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn attachment(content_type: String, filename: &str, bytes: Vec<u8>) -> Attachment {
    (
        [
            (CONTENT_TYPE, content_type),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename={filename}"),
            ),
        ],
        bytes,
    )
}

#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Liveness probe. Also served under `/api/healthz`.
#[axum::debug_handler]
pub async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/api/files/base",
    responses(
        (status = 200, description = "Configured WebDAV base URL", body = BaseRes)
    )
)]
#[axum::debug_handler]
pub async fn base(State(state): State<AppState>) -> Json<BaseRes> {
    Json(BaseRes {
        base: state.client.base_url().to_owned(),
    })
}

#[utoipa::path(
    get,
    path = "/api/files/tree",
    params(TreeQuery),
    responses(
        (status = 200, description = "Direct children, directories first", body = [TreeEntry]),
        (status = 502, description = "Upstream unreachable or unparseable")
    )
)]
/// Lists the direct children of a collection.
#[axum::debug_handler]
pub async fn tree(
    State(state): State<AppState>,
    Query(query): Query<TreeQuery>,
) -> ApiResult<Json<Vec<TreeEntry>>> {
    let entries = state
        .client
        .list(&query.path, Depth::One)
        .await
        .map_err(|e| api_error("tree", e))?;
    Ok(Json(entries.into_iter().map(TreeEntry::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/files/content",
    params(PathQuery),
    responses(
        (status = 200, description = "File text, or a fixed marker for binary files", body = String, content_type = "text/plain"),
        (status = 404, description = "Not found")
    )
)]
/// Reads a file as UTF-8 text.
#[axum::debug_handler]
pub async fn read_content(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> ApiResult<([(HeaderName, &'static str); 1], String)> {
    let text = state
        .client
        .read_text(&query.path)
        .await
        .map_err(|e| api_error("read", e))?;
    Ok(([(CONTENT_TYPE, TEXT_PLAIN)], text))
}

#[utoipa::path(
    put,
    path = "/api/files/content",
    params(PathQuery),
    request_body(content = String, description = "Raw file bytes", content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "File written", body = OkRes),
        (status = 423, description = "Locked by another token")
    )
)]
/// Creates or overwrites a file, creating missing parent collections.
///
/// The request `Content-Type` is passed upstream. An `X-Lock-Token` header is forwarded
/// as a WebDAV `If` condition.
#[axum::debug_handler]
pub async fn write_content(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<OkRes>> {
    let content_type = header_str(&headers, CONTENT_TYPE.as_str()).unwrap_or(DEFAULT_CONTENT_TYPE);
    let lock_token = header_str(&headers, LOCK_TOKEN_HEADER);
    state
        .client
        .write(&query.path, body, Some(content_type), lock_token)
        .await
        .map_err(|e| api_error("write", e))?;
    Ok(Json(OkRes::success()))
}

#[utoipa::path(
    post,
    path = "/api/files/mkdir",
    params(PathQuery),
    responses(
        (status = 200, description = "Collection exists", body = OkRes)
    )
)]
#[axum::debug_handler]
pub async fn mkdir(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Json<OkRes>> {
    state
        .client
        .mkdir(&query.path)
        .await
        .map_err(|e| api_error("mkdir", e))?;
    Ok(Json(OkRes::success()))
}

#[utoipa::path(
    delete,
    path = "/api/files",
    params(PathQuery),
    responses(
        (status = 200, description = "Deleted", body = OkRes),
        (status = 404, description = "Not found")
    )
)]
#[axum::debug_handler]
pub async fn remove(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Json<OkRes>> {
    state
        .client
        .remove(&query.path)
        .await
        .map_err(|e| api_error("delete", e))?;
    tracing::info!("deleted {}", query.path);
    Ok(Json(OkRes::success()))
}

#[utoipa::path(
    post,
    path = "/api/files/move",
    request_body = TransferReq,
    responses(
        (status = 200, description = "Moved", body = OkRes)
    )
)]
#[axum::debug_handler]
pub async fn move_file(
    State(state): State<AppState>,
    Json(req): Json<TransferReq>,
) -> ApiResult<Json<OkRes>> {
    state
        .client
        .move_to(&req.src, &req.dst)
        .await
        .map_err(|e| api_error("move", e))?;
    Ok(Json(OkRes::success()))
}

#[utoipa::path(
    post,
    path = "/api/files/copy",
    request_body = TransferReq,
    responses(
        (status = 200, description = "Copied", body = OkRes)
    )
)]
#[axum::debug_handler]
pub async fn copy_file(
    State(state): State<AppState>,
    Json(req): Json<TransferReq>,
) -> ApiResult<Json<OkRes>> {
    state
        .client
        .copy_to(&req.src, &req.dst)
        .await
        .map_err(|e| api_error("copy", e))?;
    Ok(Json(OkRes::success()))
}

#[utoipa::path(
    post,
    path = "/api/files/lock",
    params(LockQuery),
    responses(
        (status = 200, description = "Lock granted", body = LockRes),
        (status = 423, description = "Resource locked.")
    )
)]
/// Takes an exclusive write lock for the editor session.
#[axum::debug_handler]
pub async fn lock(
    State(state): State<AppState>,
    Query(query): Query<LockQuery>,
) -> ApiResult<Json<LockRes>> {
    let grant = state
        .client
        .acquire_lock(&query.path, &query.owner, query.timeout_seconds)
        .await
        .map_err(|e| api_error("lock", e))?;
    Ok(Json(grant.into()))
}

#[utoipa::path(
    post,
    path = "/api/files/unlock",
    params(UnlockQuery),
    request_body(content = UnlockReq, description = "JSON `{\"token\": ...}`, `token=<value>` or the bare token"),
    responses(
        (status = 200, description = "Lock released", body = OkRes),
        (status = 400, description = "Missing lock token")
    )
)]
/// Releases a lock.
///
/// The token may arrive in the query string, a JSON body or a plain text body so that
/// `navigator.sendBeacon` can unlock on page unload without custom headers.
#[axum::debug_handler]
pub async fn unlock(
    State(state): State<AppState>,
    Query(query): Query<UnlockQuery>,
    body: Bytes,
) -> ApiResult<Json<OkRes>> {
    let token = lock_token::parse_incoming_token(query.token.as_deref(), &body)
        .map_err(|e| api_error("unlock", e))?;
    state
        .client
        .release_lock(&query.path, &token)
        .await
        .map_err(|e| api_error("unlock", e))?;
    Ok(Json(OkRes::success()))
}

#[utoipa::path(
    get,
    path = "/api/files/lockinfo",
    params(PathQuery),
    responses(
        (status = 200, description = "Active lock, if any", body = LockInfoRes)
    )
)]
#[axum::debug_handler]
pub async fn lockinfo(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Json<LockInfoRes>> {
    let info = state
        .client
        .lock_info(&query.path)
        .await
        .map_err(|e| api_error("lockinfo", e))?;
    Ok(Json(info.into()))
}

#[utoipa::path(
    get,
    path = "/api/files/download",
    params(PathQuery),
    responses(
        (status = 200, description = "File as an attachment", body = Vec<u8>, content_type = "application/octet-stream"),
        (status = 404, description = "Not found")
    )
)]
#[axum::debug_handler]
pub async fn download(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Attachment> {
    let content = state
        .client
        .fetch(&query.path)
        .await
        .map_err(|e| api_error("download", e))?;
    let content_type = content
        .content_type
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_owned());
    let filename = paths::file_name(&query.path).unwrap_or("download");
    Ok(attachment(content_type, filename, content.bytes.to_vec()))
}

#[utoipa::path(
    get,
    path = "/api/files/zip",
    params(PathQuery),
    responses(
        (status = 200, description = "Zip of every file below the path", body = Vec<u8>, content_type = "application/zip")
    )
)]
/// Exports a folder as a zip archive.
#[axum::debug_handler]
pub async fn zip(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Attachment> {
    let archive = gateway_core::export_zip(&state.client, &query.path)
        .await
        .map_err(|e| api_error("zip", e))?;
    Ok(attachment(
        "application/zip".to_owned(),
        &gateway_core::archive_name(&query.path),
        archive,
    ))
}

#[utoipa::path(
    post,
    path = "/api/files/format/xml",
    request_body(content = String, content_type = "application/xml"),
    responses(
        (status = 200, description = "Indented XML", body = String, content_type = "text/plain"),
        (status = 400, description = "XML parse/format error")
    )
)]
/// Pretty-prints an XML or DITA document.
#[axum::debug_handler]
pub async fn format_xml(body: Bytes) -> ApiResult<([(HeaderName, &'static str); 1], String)> {
    match gateway_core::format_xml(&body) {
        Ok(pretty) => Ok(([(CONTENT_TYPE, TEXT_PLAIN)], pretty)),
        Err(GatewayError::Parse(message)) => Err((
            StatusCode::BAD_REQUEST,
            format!("XML parse/format error: {message}"),
        )),
        Err(e) => Err(api_error("format", e)),
    }
}

#[utoipa::path(
    post,
    path = "/api/files/validate/dita",
    request_body(content = String, content_type = "application/xml"),
    responses(
        (status = 200, description = "Well-formedness errors and DITA warnings", body = DitaReportRes)
    )
)]
/// Checks well-formedness and common DITA conventions. Never fails at the HTTP level.
#[axum::debug_handler]
pub async fn validate_dita(body: Bytes) -> Json<DitaReportRes> {
    Json(gateway_core::validate_dita(&body).into())
}
