//! In-memory WebDAV server for tests.
//!
//! Serves the subset of WebDAV the gateway speaks (PROPFIND, GET, PUT, MKCOL, DELETE,
//! MOVE, COPY, LOCK, UNLOCK) below an Alfresco-style `documentLibrary` prefix. Every
//! request is recorded, and individual requests can be scripted to return a fixed reply
//! so error paths can be driven without a real repository.

use crate::constants::DEFAULT_CONTENT_TYPE;
use crate::{paths, xml, Credentials, GatewayConfig, GatewayResult, WebDavClient};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

/// URL path under which the fake serves the repository root collection.
pub const FAKE_PREFIX: &str = "/alfresco/webdav/Sites/demo/documentLibrary";
pub const FAKE_USERNAME: &str = "gateway";
pub const FAKE_PASSWORD: &str = "secret";

const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?');

/// A request as the fake received it, with the path made repository-relative.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Clone)]
struct StoredFile {
    bytes: Bytes,
    content_type: String,
}

struct ActiveLock {
    token: String,
    owner: String,
}

#[derive(Default)]
struct Store {
    files: BTreeMap<String, StoredFile>,
    dirs: BTreeSet<String>,
    locks: HashMap<String, ActiveLock>,
    requests: Vec<RecordedRequest>,
    scripted: HashMap<(String, String), (u16, String)>,
    lock_token_in_header_only: bool,
    issued_locks: u64,
}

type Shared = Arc<Mutex<Store>>;

fn guard(store: &Mutex<Store>) -> MutexGuard<'_, Store> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a running fake server. The server stops when the handle is dropped.
pub struct FakeDav {
    addr: SocketAddr,
    store: Shared,
    server: JoinHandle<()>,
}

impl FakeDav {
    /// Binds an ephemeral localhost port and starts serving an empty repository.
    pub async fn start() -> std::io::Result<Self> {
        let store: Shared = Arc::new(Mutex::new(Store::default()));
        guard(&store).dirs.insert(String::new());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = Router::new().fallback(handle).with_state(store.clone());
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("fake WebDAV server stopped: {}", e);
            }
        });

        Ok(Self {
            addr,
            store,
            server,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}{}", self.addr, FAKE_PREFIX)
    }

    pub fn config(&self) -> GatewayResult<GatewayConfig> {
        GatewayConfig::new(
            self.base_url(),
            Credentials::new(FAKE_USERNAME, FAKE_PASSWORD)?,
        )
    }

    pub fn client(&self) -> GatewayResult<WebDavClient> {
        Ok(WebDavClient::new(self.config()?))
    }

    /// Stores a file, creating its ancestor collections.
    pub fn seed_file(&self, path: &str, bytes: impl Into<Bytes>) {
        let path = paths::normalize(path).to_owned();
        let mut store = guard(&self.store);
        for ancestor in paths::ancestors(&path) {
            store.dirs.insert(ancestor);
        }
        store.files.insert(
            path,
            StoredFile {
                bytes: bytes.into(),
                content_type: DEFAULT_CONTENT_TYPE.to_owned(),
            },
        );
    }

    /// Creates a collection and its ancestors.
    pub fn seed_dir(&self, path: &str) {
        let path = paths::normalize(path).to_owned();
        let mut store = guard(&self.store);
        for ancestor in paths::ancestors(&path) {
            store.dirs.insert(ancestor);
        }
        store.dirs.insert(path);
    }

    /// Places an exclusive lock on `path` and returns its token.
    pub fn seed_lock(&self, path: &str, owner: &str) -> String {
        guard(&self.store).grant_lock(paths::normalize(path), owner.to_owned())
    }

    /// Answers every `method` request on `path` with `status` and `body`.
    pub fn script(&self, method: &str, path: &str, status: u16, body: &str) {
        guard(&self.store).scripted.insert(
            (method.to_owned(), paths::normalize(path).to_owned()),
            (status, body.to_owned()),
        );
    }

    /// Makes LOCK replies carry the token in the `Lock-Token` header only.
    pub fn lock_token_in_header_only(&self) {
        guard(&self.store).lock_token_in_header_only = true;
    }

    pub fn file(&self, path: &str) -> Option<Bytes> {
        guard(&self.store)
            .files
            .get(paths::normalize(path))
            .map(|f| f.bytes.clone())
    }

    pub fn content_type(&self, path: &str) -> Option<String> {
        guard(&self.store)
            .files
            .get(paths::normalize(path))
            .map(|f| f.content_type.clone())
    }

    pub fn has_dir(&self, path: &str) -> bool {
        guard(&self.store).dirs.contains(paths::normalize(path))
    }

    /// Token and owner of the active lock on `path`.
    pub fn lock_on(&self, path: &str) -> Option<(String, String)> {
        guard(&self.store)
            .locks
            .get(paths::normalize(path))
            .map(|l| (l.token.clone(), l.owner.clone()))
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        guard(&self.store).requests.clone()
    }

    pub fn requests_with(&self, method: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }
}

impl Drop for FakeDav {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn handle(
    State(store): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(path) = repository_path(uri.path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let mut store = guard(&store);
    store.requests.push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        headers: headers.clone(),
        body: body.clone(),
    });

    if let Some((status, reply)) = store.scripted.get(&(method.to_string(), path.clone())) {
        return (status_code(*status), reply.clone()).into_response();
    }
    if !headers.contains_key(AUTHORIZATION) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    match method.as_str() {
        "PROPFIND" => store.propfind(&path, &headers, &body),
        "GET" => store.get(&path),
        "PUT" => store.put(&path, &headers, body),
        "MKCOL" => store.mkcol(&path),
        "DELETE" => store.delete(&path),
        "MOVE" => store.transfer(&path, &headers, true),
        "COPY" => store.transfer(&path, &headers, false),
        "LOCK" => store.lock(&path, &body),
        "UNLOCK" => store.unlock(&path, &headers),
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

impl Store {
    fn exists(&self, path: &str) -> bool {
        self.dirs.contains(path) || self.files.contains_key(path)
    }

    fn propfind(&self, path: &str, headers: &HeaderMap, body: &[u8]) -> Response {
        if !self.exists(path) {
            return StatusCode::NOT_FOUND.into_response();
        }
        if String::from_utf8_lossy(body).contains("lockdiscovery") {
            return multistatus(&[self.lock_response(path)]);
        }

        let depth = header(headers, "Depth").unwrap_or("infinity");
        let mut responses = vec![self.entry_response(path)];
        if self.dirs.contains(path) && depth != "0" {
            let included = |candidate: &str| {
                if depth == "1" {
                    parent(candidate) == path && !candidate.is_empty()
                } else {
                    is_below(path, candidate)
                }
            };
            responses.extend(
                self.dirs
                    .iter()
                    .filter(|d| included(d.as_str()))
                    .map(|d| self.entry_response(d)),
            );
            responses.extend(
                self.files
                    .keys()
                    .filter(|f| included(f.as_str()))
                    .map(|f| self.entry_response(f)),
            );
        }
        multistatus(&responses)
    }

    fn entry_response(&self, path: &str) -> String {
        let is_dir = self.dirs.contains(path);
        let name = paths::file_name(path).unwrap_or("documentLibrary");
        let (resourcetype, length) = match self.files.get(path) {
            Some(file) if !is_dir => (
                "<D:resourcetype/>".to_owned(),
                format!("<D:getcontentlength>{}</D:getcontentlength>", file.bytes.len()),
            ),
            _ => (
                "<D:resourcetype><D:collection/></D:resourcetype>".to_owned(),
                String::new(),
            ),
        };
        format!(
            "<D:response><D:href>{}</D:href><D:propstat><D:prop>\
             <D:displayname>{}</D:displayname>{resourcetype}{length}</D:prop>\
             <D:status>HTTP/1.1 200 OK</D:status></D:propstat></D:response>",
            href(path, is_dir),
            htmlescape::encode_minimal(name),
        )
    }

    fn lock_response(&self, path: &str) -> String {
        let discovery = self.locks.get(path).map(activelock).unwrap_or_default();
        format!(
            "<D:response><D:href>{}</D:href><D:propstat><D:prop>\
             <D:lockdiscovery>{discovery}</D:lockdiscovery></D:prop>\
             <D:status>HTTP/1.1 200 OK</D:status></D:propstat></D:response>",
            href(path, self.dirs.contains(path)),
        )
    }

    fn get(&self, path: &str) -> Response {
        if self.dirs.contains(path) {
            return StatusCode::METHOD_NOT_ALLOWED.into_response();
        }
        match self.files.get(path) {
            Some(file) => (
                [(CONTENT_TYPE, file.content_type.clone())],
                file.bytes.clone(),
            )
                .into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        }
    }

    fn put(&mut self, path: &str, headers: &HeaderMap, body: Bytes) -> Response {
        if path.is_empty() || self.dirs.contains(path) {
            return StatusCode::METHOD_NOT_ALLOWED.into_response();
        }
        if !self.dirs.contains(parent(path)) {
            return StatusCode::CONFLICT.into_response();
        }
        if let Some(lock) = self.locks.get(path) {
            let submitted = header(headers, "If").unwrap_or_default();
            if !submitted.contains(&format!("<{}>", lock.token)) {
                return StatusCode::LOCKED.into_response();
            }
        }

        let content_type = header(headers, CONTENT_TYPE.as_str())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_owned();
        let previous = self.files.insert(
            path.to_owned(),
            StoredFile {
                bytes: body,
                content_type,
            },
        );
        match previous {
            Some(_) => StatusCode::NO_CONTENT.into_response(),
            None => StatusCode::CREATED.into_response(),
        }
    }

    fn mkcol(&mut self, path: &str) -> Response {
        if self.exists(path) {
            return StatusCode::METHOD_NOT_ALLOWED.into_response();
        }
        if !self.dirs.contains(parent(path)) {
            return StatusCode::CONFLICT.into_response();
        }
        self.dirs.insert(path.to_owned());
        StatusCode::CREATED.into_response()
    }

    fn delete(&mut self, path: &str) -> Response {
        if path.is_empty() {
            return StatusCode::FORBIDDEN.into_response();
        }
        if self.files.remove(path).is_some() {
            self.locks.remove(path);
            return StatusCode::NO_CONTENT.into_response();
        }
        if !self.dirs.contains(path) {
            return StatusCode::NOT_FOUND.into_response();
        }

        let within = |candidate: &str| candidate == path || is_below(path, candidate);
        self.dirs.retain(|d| !within(d.as_str()));
        self.files.retain(|f, _| !within(f.as_str()));
        self.locks.retain(|l, _| !within(l.as_str()));
        StatusCode::NO_CONTENT.into_response()
    }

    fn transfer(&mut self, src: &str, headers: &HeaderMap, remove_source: bool) -> Response {
        let Some(dst) = header(headers, "Destination").and_then(destination_path) else {
            return StatusCode::BAD_REQUEST.into_response();
        };
        if src.is_empty() || src == dst {
            return StatusCode::FORBIDDEN.into_response();
        }
        if !self.dirs.contains(parent(&dst)) {
            return StatusCode::CONFLICT.into_response();
        }
        let existed = self.exists(&dst);

        if let Some(file) = self.files.get(src).cloned() {
            if remove_source {
                self.files.remove(src);
            }
            self.files.insert(dst, file);
        } else if self.dirs.contains(src) {
            let within = |candidate: &str| candidate == src || is_below(src, candidate);
            let dirs: Vec<String> = self
                .dirs
                .iter()
                .filter(|d| within(d.as_str()))
                .cloned()
                .collect();
            let files: Vec<(String, StoredFile)> = self
                .files
                .iter()
                .filter(|(f, _)| within(f.as_str()))
                .map(|(f, file)| (f.clone(), file.clone()))
                .collect();

            if remove_source {
                self.dirs.retain(|d| !within(d.as_str()));
                self.files.retain(|f, _| !within(f.as_str()));
            }
            for dir in dirs {
                self.dirs.insert(rebase(&dir, src, &dst));
            }
            for (file_path, file) in files {
                self.files.insert(rebase(&file_path, src, &dst), file);
            }
        } else {
            return StatusCode::NOT_FOUND.into_response();
        }

        if existed {
            StatusCode::NO_CONTENT.into_response()
        } else {
            StatusCode::CREATED.into_response()
        }
    }

    fn grant_lock(&mut self, path: &str, owner: String) -> String {
        self.issued_locks += 1;
        let token = format!("opaquelocktoken:fake-lock-{}", self.issued_locks);
        self.locks.insert(
            path.to_owned(),
            ActiveLock {
                token: token.clone(),
                owner,
            },
        );
        token
    }

    fn lock(&mut self, path: &str, body: &[u8]) -> Response {
        if self.locks.contains_key(path) {
            return StatusCode::LOCKED.into_response();
        }
        let token = self.grant_lock(path, requested_owner(body));

        let reply = match (self.lock_token_in_header_only, self.locks.get(path)) {
            (false, Some(lock)) => format!(
                r#"<?xml version="1.0" encoding="utf-8"?><D:prop xmlns:D="DAV:"><D:lockdiscovery>{}</D:lockdiscovery></D:prop>"#,
                activelock(lock)
            ),
            _ => String::new(),
        };
        (
            StatusCode::OK,
            [
                (CONTENT_TYPE, "application/xml; charset=utf-8".to_owned()),
                (HeaderName::from_static("lock-token"), format!("<{token}>")),
            ],
            reply,
        )
            .into_response()
    }

    fn unlock(&mut self, path: &str, headers: &HeaderMap) -> Response {
        let submitted = header(headers, "Lock-Token")
            .unwrap_or_default()
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>');
        match self.locks.get(path) {
            Some(lock) if lock.token == submitted => {
                self.locks.remove(path);
                StatusCode::NO_CONTENT.into_response()
            }
            _ => StatusCode::CONFLICT.into_response(),
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn repository_path(url_path: &str) -> Option<String> {
    let rest = url_path.strip_prefix(FAKE_PREFIX)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }
    Some(paths::normalize(&paths::decode(rest)).to_owned())
}

fn destination_path(url: &str) -> Option<String> {
    let start = url.find(FAKE_PREFIX)?;
    repository_path(&url[start..])
}

fn parent(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(parent, _)| parent)
}

fn is_below(root: &str, candidate: &str) -> bool {
    if root.is_empty() {
        !candidate.is_empty()
    } else {
        candidate
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

fn rebase(path: &str, from: &str, to: &str) -> String {
    format!("{to}{}", &path[from.len()..])
}

fn href(path: &str, is_dir: bool) -> String {
    if path.is_empty() {
        return format!("{FAKE_PREFIX}/");
    }
    let encoded: Vec<String> = path
        .split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect();
    let slash = if is_dir { "/" } else { "" };
    format!("{FAKE_PREFIX}/{}{slash}", encoded.join("/"))
}

fn activelock(lock: &ActiveLock) -> String {
    format!(
        "<D:activelock><D:locktype><D:write/></D:locktype>\
         <D:lockscope><D:exclusive/></D:lockscope><D:depth>0</D:depth>\
         <D:owner>{}</D:owner><D:timeout>Second-1800</D:timeout>\
         <D:locktoken><D:href>{}</D:href></D:locktoken></D:activelock>",
        htmlescape::encode_minimal(&lock.owner),
        lock.token
    )
}

fn multistatus(responses: &[String]) -> Response {
    (
        StatusCode::MULTI_STATUS,
        [(CONTENT_TYPE, "application/xml; charset=utf-8")],
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?><D:multistatus xmlns:D="DAV:">{}</D:multistatus>"#,
            responses.concat()
        ),
    )
        .into_response()
}

fn requested_owner(body: &[u8]) -> String {
    let Ok(root) = xml::parse(body) else {
        return String::new();
    };
    let owners = xml::descendants(&root, "owner");
    owners
        .first()
        .map(|owner| xml::text(owner).trim().to_owned())
        .unwrap_or_default()
}
