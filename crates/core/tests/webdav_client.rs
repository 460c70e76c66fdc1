//! WebDAV client behaviour against the in-memory fake server.

use bytes::Bytes;
use gateway_core::constants::BINARY_CONTENT_SENTINEL;
use gateway_core::fake_dav::FakeDav;
use gateway_core::{DirectoryEntry, Depth, GatewayError, WebDavClient};
use std::io::{Cursor, Read};

async fn start() -> (FakeDav, WebDavClient) {
    let dav = FakeDav::start().await.expect("start fake WebDAV server");
    let client = dav.client().expect("client for fake server");
    (dav, client)
}

fn entry(name: &str, path: &str, is_dir: bool) -> DirectoryEntry {
    DirectoryEntry {
        name: name.into(),
        path: path.into(),
        is_dir,
    }
}

fn calls(dav: &FakeDav) -> Vec<(String, String)> {
    dav.requests()
        .into_iter()
        .map(|r| (r.method, r.path))
        .collect()
}

#[tokio::test]
async fn empty_root_lists_nothing() {
    let (_dav, client) = start().await;
    let entries = client.list("", Depth::One).await.expect("list root");
    assert!(entries.is_empty(), "{entries:?}");
}

#[tokio::test]
async fn listing_puts_directories_first_and_skips_the_collection_itself() {
    let (dav, client) = start().await;
    dav.seed_dir("docs/b");
    dav.seed_dir("docs/A");
    dav.seed_file("docs/Zeta.dita", "z");
    dav.seed_file("docs/alpha.dita", "a");
    dav.seed_file("docs/A/nested.dita", "n");

    let entries = client.list("docs", Depth::One).await.expect("list docs");
    assert_eq!(
        entries,
        vec![
            entry("A", "docs/A", true),
            entry("b", "docs/b", true),
            entry("alpha.dita", "docs/alpha.dita", false),
            entry("Zeta.dita", "docs/Zeta.dita", false),
        ]
    );

    let propfind = &dav.requests_with("PROPFIND")[0];
    assert_eq!(propfind.header("Depth"), Some("1"));
    assert!(propfind
        .header("Authorization")
        .is_some_and(|v| v.starts_with("Basic ")));
}

#[tokio::test]
async fn listing_decodes_percent_encoded_names() {
    let (dav, client) = start().await;
    dav.seed_file("docs/my file.txt", "x");

    let entries = client.list("docs", Depth::One).await.expect("list docs");
    assert_eq!(entries, vec![entry("my file.txt", "docs/my file.txt", false)]);

    let body = client.read("docs/my file.txt").await.expect("read");
    assert_eq!(body, Bytes::from_static(b"x"));
}

#[tokio::test]
async fn upstream_error_is_passed_through_verbatim() {
    let (dav, client) = start().await;
    dav.script("PROPFIND", "", 503, "maintenance window");

    match client.list("", Depth::One).await {
        Err(GatewayError::Upstream { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance window");
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn write_creates_missing_ancestors_before_put() {
    let (dav, client) = start().await;

    client
        .write(
            "docs/new/file.dita",
            Bytes::from_static(b"<topic id=\"t\"/>"),
            Some("application/dita+xml"),
            None,
        )
        .await
        .expect("write");

    assert_eq!(
        calls(&dav),
        vec![
            ("MKCOL".to_string(), "docs".to_string()),
            ("MKCOL".to_string(), "docs/new".to_string()),
            ("PUT".to_string(), "docs/new/file.dita".to_string()),
        ]
    );
    assert!(dav.has_dir("docs/new"));
    assert_eq!(
        dav.file("docs/new/file.dita").as_deref(),
        Some(&b"<topic id=\"t\"/>"[..])
    );
    assert_eq!(
        dav.content_type("docs/new/file.dita").as_deref(),
        Some("application/dita+xml")
    );
}

#[tokio::test]
async fn write_tolerates_existing_ancestors() {
    let (dav, client) = start().await;
    dav.seed_dir("docs");

    client
        .write("docs/file.txt", Bytes::from_static(b"v1"), None, None)
        .await
        .expect("first write");
    client
        .write("docs/file.txt", Bytes::from_static(b"v2"), None, None)
        .await
        .expect("overwrite");

    assert_eq!(dav.file("docs/file.txt").as_deref(), Some(&b"v2"[..]));
    assert_eq!(
        dav.content_type("docs/file.txt").as_deref(),
        Some("application/octet-stream")
    );
}

#[tokio::test]
async fn rejected_ancestor_surfaces_through_the_put() {
    let (dav, client) = start().await;
    dav.script("MKCOL", "docs", 403, "forbidden");

    let err = client
        .write("docs/new/file.txt", Bytes::from_static(b"x"), None, None)
        .await
        .expect_err("parent never created");
    assert!(
        matches!(err, GatewayError::Upstream { status: 409, .. }),
        "{err:?}"
    );
    assert_eq!(dav.requests_with("PUT").len(), 1);
}

#[tokio::test]
async fn write_without_path_is_rejected_locally() {
    let (dav, client) = start().await;
    let err = client
        .write("/", Bytes::new(), None, None)
        .await
        .expect_err("empty path");
    assert!(matches!(err, GatewayError::InvalidInput(_)));
    assert!(dav.requests().is_empty());
}

#[tokio::test]
async fn read_reports_missing_files_and_binary_content() {
    let (dav, client) = start().await;
    dav.seed_file("img.png", vec![0x89, 0x50, 0xff, 0xfe]);
    dav.seed_file("notes.txt", "héllo");

    let err = client.read("missing.txt").await.expect_err("missing");
    assert!(matches!(err, GatewayError::NotFound(_)));

    assert_eq!(
        client.read_text("img.png").await.expect("read binary"),
        BINARY_CONTENT_SENTINEL
    );
    assert_eq!(client.read_text("notes.txt").await.expect("read text"), "héllo");

    let content = client.fetch("notes.txt").await.expect("fetch");
    assert_eq!(
        content.content_type.as_deref(),
        Some("application/octet-stream")
    );
}

#[tokio::test]
async fn mkdir_accepts_existing_collections() {
    let (dav, client) = start().await;
    client.mkdir("docs").await.expect("create");
    client.mkdir("docs").await.expect("already exists");
    assert!(dav.has_dir("docs"));

    let err = client.mkdir("a/b").await.expect_err("missing parent");
    assert!(matches!(err, GatewayError::Upstream { status: 409, .. }));
}

#[tokio::test]
async fn remove_missing_resource_is_not_found() {
    let (dav, client) = start().await;
    dav.seed_file("docs/sub/a.txt", "a");

    let err = client.remove("nope.txt").await.expect_err("missing");
    assert!(matches!(err, GatewayError::NotFound(_)));

    client.remove("docs/sub").await.expect("remove subtree");
    assert!(!dav.has_dir("docs/sub"));
    assert!(dav.file("docs/sub/a.txt").is_none());
    assert!(dav.has_dir("docs"));
}

#[tokio::test]
async fn copy_and_move_send_absolute_destination() {
    let (dav, client) = start().await;
    dav.seed_file("a.txt", "payload");
    dav.seed_dir("docs");

    client.copy_to("a.txt", "docs/b.txt").await.expect("copy");
    assert_eq!(dav.file("a.txt").as_deref(), Some(&b"payload"[..]));
    assert_eq!(dav.file("docs/b.txt").as_deref(), Some(&b"payload"[..]));

    client.move_to("docs/b.txt", "docs/c.txt").await.expect("move");
    assert!(dav.file("docs/b.txt").is_none());
    assert_eq!(dav.file("docs/c.txt").as_deref(), Some(&b"payload"[..]));

    let moved = &dav.requests_with("MOVE")[0];
    assert_eq!(
        moved.header("Destination"),
        Some(format!("{}/docs/c.txt", dav.base_url()).as_str())
    );
    assert_eq!(moved.header("Overwrite"), Some("T"));

    let err = client
        .move_to("a.txt", "missing/c.txt")
        .await
        .expect_err("destination parent missing");
    assert!(matches!(err, GatewayError::Upstream { status: 409, .. }));
}

#[tokio::test]
async fn lock_token_read_from_body() {
    let (dav, client) = start().await;
    dav.seed_file("doc.dita", "<topic/>");

    let grant = client
        .acquire_lock("doc.dita", "alice", 1800)
        .await
        .expect("lock");
    assert_eq!(grant.token, "opaquelocktoken:fake-lock-1");
    assert_eq!(grant.owner, "alice");
    assert_eq!(grant.timeout_seconds, 1800);

    let lock = &dav.requests_with("LOCK")[0];
    assert_eq!(lock.header("Timeout"), Some("Second-1800"));
    assert_eq!(
        dav.lock_on("doc.dita"),
        Some(("opaquelocktoken:fake-lock-1".into(), "alice".into()))
    );
}

#[tokio::test]
async fn lock_token_read_from_header_when_body_is_empty() {
    let (dav, client) = start().await;
    dav.seed_file("doc.dita", "<topic/>");
    dav.lock_token_in_header_only();

    let grant = client
        .acquire_lock("doc.dita", "bob", 60)
        .await
        .expect("lock");
    assert_eq!(grant.token, "opaquelocktoken:fake-lock-1");
}

#[tokio::test]
async fn second_lock_is_a_conflict() {
    let (dav, client) = start().await;
    dav.seed_file("doc.dita", "<topic/>");
    dav.seed_lock("doc.dita", "alice");

    let err = client
        .acquire_lock("doc.dita", "bob", 60)
        .await
        .expect_err("already locked");
    assert!(matches!(err, GatewayError::LockConflict(_)));
}

#[tokio::test]
async fn locked_write_requires_matching_token() {
    let (dav, client) = start().await;
    dav.seed_file("doc.dita", "old");
    let token = dav.seed_lock("doc.dita", "alice");

    let err = client
        .write("doc.dita", Bytes::from_static(b"new"), None, None)
        .await
        .expect_err("no token");
    assert!(matches!(err, GatewayError::Upstream { status: 423, .. }));

    let bare = token.trim_start_matches("opaquelocktoken:");
    client
        .write("doc.dita", Bytes::from_static(b"new"), None, Some(bare))
        .await
        .expect("write with token");
    assert_eq!(dav.file("doc.dita").as_deref(), Some(&b"new"[..]));

    let put = dav.requests_with("PUT").pop().expect("put recorded");
    assert_eq!(put.header("If"), Some(format!("(<{token}>)").as_str()));
}

#[tokio::test]
async fn release_lock_accepts_any_token_shape() {
    let (dav, client) = start().await;
    dav.seed_file("doc.dita", "x");
    let token = dav.seed_lock("doc.dita", "alice");

    let err = client
        .release_lock("doc.dita", "opaquelocktoken:other")
        .await
        .expect_err("wrong token");
    assert!(matches!(err, GatewayError::Upstream { status: 409, .. }));

    client
        .release_lock("doc.dita", &format!(" <{token}> "))
        .await
        .expect("unlock");
    assert!(dav.lock_on("doc.dita").is_none());

    let unlock = dav.requests_with("UNLOCK").pop().expect("unlock recorded");
    assert_eq!(
        unlock.header("Lock-Token"),
        Some(format!("<{token}>").as_str())
    );
}

#[tokio::test]
async fn lock_info_reports_active_lock() {
    let (dav, client) = start().await;
    dav.seed_file("doc.dita", "x");

    let info = client.lock_info("doc.dita").await.expect("lockinfo");
    assert!(!info.locked);
    assert_eq!(info.owner, None);

    let token = dav.seed_lock("doc.dita", "alice");
    let info = client.lock_info("doc.dita").await.expect("lockinfo");
    assert!(info.locked);
    assert_eq!(info.owner.as_deref(), Some("alice"));
    assert_eq!(info.token.as_deref(), Some(token.as_str()));

    let propfind = dav.requests_with("PROPFIND").pop().expect("propfind");
    assert_eq!(propfind.header("Depth"), Some("0"));
}

fn archive_entries(bytes: Vec<u8>) -> Vec<(String, String)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid zip");
    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).expect("entry");
        let mut content = String::new();
        file.read_to_string(&mut content).expect("utf-8 entry");
        entries.push((file.name().to_owned(), content));
    }
    entries.sort();
    entries
}

#[tokio::test]
async fn export_archives_files_relative_to_root() {
    let (dav, client) = start().await;
    dav.seed_file("docs/a.txt", "alpha");
    dav.seed_file("docs/sub/b.txt", "beta");
    dav.seed_file("other/c.txt", "gamma");

    let bytes = gateway_core::export_zip(&client, "docs")
        .await
        .expect("export");
    assert_eq!(
        archive_entries(bytes),
        vec![
            ("a.txt".to_string(), "alpha".to_string()),
            ("sub/b.txt".to_string(), "beta".to_string()),
        ]
    );

    let propfind = &dav.requests_with("PROPFIND")[0];
    assert_eq!(propfind.header("Depth"), Some("infinity"));
}

#[tokio::test]
async fn export_skips_files_that_cannot_be_fetched() {
    let (dav, client) = start().await;
    dav.seed_file("docs/a.txt", "alpha");
    dav.seed_file("docs/b.txt", "beta");
    dav.script("GET", "docs/a.txt", 500, "boom");

    let bytes = gateway_core::export_zip(&client, "docs")
        .await
        .expect("export");
    assert_eq!(
        archive_entries(bytes),
        vec![("b.txt".to_string(), "beta".to_string())]
    );
}

#[tokio::test]
async fn reserved_characters_in_names_survive_read_export_and_move() {
    let (dav, client) = start().await;
    dav.seed_file("docs/issue#1.dita", "hash");
    dav.seed_file("docs/100%.dita", "percent");
    dav.seed_file("docs/q?.dita", "question");
    dav.seed_file("docs/plain.dita", "plain");

    let listed: Vec<String> = client
        .list("docs", Depth::One)
        .await
        .expect("list docs")
        .into_iter()
        .map(|e| e.path)
        .collect();
    assert_eq!(
        listed,
        vec![
            "docs/100%.dita",
            "docs/issue#1.dita",
            "docs/plain.dita",
            "docs/q?.dita",
        ]
    );

    for (path, body) in [
        ("docs/issue#1.dita", "hash"),
        ("docs/100%.dita", "percent"),
        ("docs/q?.dita", "question"),
    ] {
        let text = client.read_text(path).await.expect("read reserved name");
        assert_eq!(text, body, "{path}");
    }

    let bytes = gateway_core::export_zip(&client, "docs")
        .await
        .expect("export");
    assert_eq!(
        archive_entries(bytes),
        vec![
            ("100%.dita".to_string(), "percent".to_string()),
            ("issue#1.dita".to_string(), "hash".to_string()),
            ("plain.dita".to_string(), "plain".to_string()),
            ("q?.dita".to_string(), "question".to_string()),
        ]
    );

    client
        .move_to("docs/issue#1.dita", "docs/issue#2.dita")
        .await
        .expect("move");
    assert!(dav.file("docs/issue#1.dita").is_none());
    assert_eq!(dav.file("docs/issue#2.dita").as_deref(), Some(&b"hash"[..]));
    let moved = &dav.requests_with("MOVE")[0];
    assert_eq!(
        moved.header("Destination"),
        Some(format!("{}/docs/issue%232.dita", dav.base_url()).as_str())
    );
}

#[tokio::test]
async fn non_success_get_is_not_treated_as_content() {
    let (dav, client) = start().await;
    dav.seed_file("docs/a.txt", "alpha");
    dav.seed_file("docs/b.txt", "beta");
    dav.script("GET", "docs/a.txt", 304, "");

    match client.read("docs/a.txt").await {
        Err(GatewayError::Upstream { status, .. }) => assert_eq!(status, 304),
        other => panic!("expected upstream error, got {other:?}"),
    }

    let bytes = gateway_core::export_zip(&client, "docs")
        .await
        .expect("export");
    assert_eq!(
        archive_entries(bytes),
        vec![("b.txt".to_string(), "beta".to_string())]
    );
}
