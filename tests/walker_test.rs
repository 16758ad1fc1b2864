//! Tree walks against a mocked Drive API.

use std::io;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

use drive_transfer::models::{ClientSecrets, StoredToken};
use drive_transfer::{
    Authenticator, DriveClient, Endpoints, Session, TreeWalker, WalkOptions, WalkSummary,
};

const CALLER: &str = "me@example.com";
const TARGET: &str = "target@example.com";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

fn session_for(server: &Server) -> Arc<Session> {
    let secrets = ClientSecrets {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        redirect_uris: Vec::new(),
        auth_uri: None,
        token_uri: None,
    };
    let token = StoredToken {
        access_token: "test-token".to_string(),
        refresh_token: None,
        scope: None,
        token_type: None,
        expiry_date: None,
    };
    let client = DriveClient::with_endpoints(
        Authenticator::new(secrets, token),
        Endpoints::with_base(&server.url()),
        NonZeroU32::new(1000).unwrap(),
    );
    Arc::new(Session::new(client, TARGET.to_string(), CALLER.to_string()))
}

async fn walk(server: &Server, root: &str) -> WalkSummary {
    TreeWalker::new(session_for(server), WalkOptions { concurrency: 2 })
        .walk(root)
        .await
}

fn perm(id: &str, email: &str, role: &str) -> Value {
    json!({"id": id, "emailAddress": email, "role": role})
}

fn file(id: &str, name: &str, permissions: Vec<Value>) -> Value {
    json!({
        "kind": "drive#file",
        "id": id,
        "name": name,
        "mimeType": "text/plain",
        "permissions": permissions
    })
}

fn folder(id: &str, name: &str, permissions: Vec<Value>) -> Value {
    json!({
        "kind": "drive#file",
        "id": id,
        "name": name,
        "mimeType": FOLDER_MIME,
        "permissions": permissions
    })
}

async fn mock_listing(server: &mut ServerGuard, parent: &str, files: Vec<Value>) -> Mock {
    mock_listing_hits(server, parent, files, 1).await
}

async fn mock_listing_hits(
    server: &mut ServerGuard,
    parent: &str,
    files: Vec<Value>,
    hits: usize,
) -> Mock {
    server
        .mock("GET", "/files")
        .match_query(Matcher::UrlEncoded("q".into(), format!("'{}' in parents", parent)))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"files": files}).to_string())
        .expect(hits)
        .create_async()
        .await
}

async fn mock_transfer(
    server: &mut ServerGuard,
    file_id: &str,
    permission_id: &str,
    hits: usize,
) -> Mock {
    server
        .mock("PATCH", format!("/files/{}/permissions/{}", file_id, permission_id).as_str())
        .match_body(Matcher::Json(json!({"role": "writer", "pendingOwner": true})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"id": permission_id, "role": "writer", "pendingOwner": true}).to_string())
        .expect(hits)
        .create_async()
        .await
}

#[tokio::test]
async fn transfers_file_and_descends_into_subfolder() {
    let mut server = Server::new_async().await;

    let f1 = mock_listing(
        &mut server,
        "F1",
        vec![
            file("idA", "A", vec![perm("P0", CALLER, "owner"), perm("P1", TARGET, "reader")]),
            folder("F2", "Sub", vec![perm("P0", CALLER, "owner")]),
        ],
    )
    .await;
    let f2 = mock_listing(&mut server, "F2", Vec::new()).await;
    let transfer = mock_transfer(&mut server, "idA", "P1", 1).await;

    let summary = walk(&server, "F1").await;

    f1.assert_async().await;
    f2.assert_async().await;
    transfer.assert_async().await;
    assert_eq!(
        summary,
        WalkSummary {
            folders_listed: 2,
            entries_seen: 2,
            transfers_initiated: 1,
            errors: 0,
        }
    );
}

#[tokio::test]
async fn ineligible_entries_issue_no_update() {
    let mut server = Server::new_async().await;

    let pending =
        json!({"id": "P3", "emailAddress": TARGET, "role": "writer", "pendingOwner": true});
    let _root = mock_listing(
        &mut server,
        "F1",
        vec![
            file("owned", "already", vec![perm("P1", TARGET, "owner")]),
            file("noaccess", "private", vec![perm("P0", CALLER, "owner")]),
            file("pending", "waiting", vec![perm("P0", CALLER, "owner"), pending]),
            file(
                "foreign",
                "shared",
                vec![perm("P9", "other@example.com", "owner"), perm("P4", TARGET, "writer")],
            ),
        ],
    )
    .await;
    let any_update = server
        .mock("PATCH", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let summary = walk(&server, "F1").await;

    any_update.assert_async().await;
    assert_eq!(summary.entries_seen, 4);
    assert_eq!(summary.transfers_initiated, 0);
    assert_eq!(summary.errors, 0);
}

#[tokio::test]
async fn skips_entries_with_unexpected_kind() {
    let mut server = Server::new_async().await;

    let odd = json!({
        "kind": "drive#drive",
        "id": "F9",
        "name": "not really a folder",
        "mimeType": FOLDER_MIME,
        "permissions": [perm("P0", CALLER, "owner"), perm("P1", TARGET, "reader")]
    });
    let _root = mock_listing(&mut server, "F1", vec![odd]).await;
    let nested = mock_listing_hits(&mut server, "F9", Vec::new(), 0).await;
    let transfer = mock_transfer(&mut server, "F9", "P1", 0).await;

    let summary = walk(&server, "F1").await;

    nested.assert_async().await;
    transfer.assert_async().await;
    assert_eq!(summary.folders_listed, 1);
    assert_eq!(summary.entries_seen, 0);
}

#[tokio::test]
async fn folders_are_transferred_as_well_as_walked() {
    let mut server = Server::new_async().await;

    let _root = mock_listing(
        &mut server,
        "F1",
        vec![folder(
            "F2",
            "Sub",
            vec![perm("P0", CALLER, "owner"), perm("P1", TARGET, "commenter")],
        )],
    )
    .await;
    let _sub = mock_listing(
        &mut server,
        "F2",
        vec![file("idB", "B", vec![perm("P0", CALLER, "owner"), perm("P2", TARGET, "reader")])],
    )
    .await;
    let folder_transfer = mock_transfer(&mut server, "F2", "P1", 1).await;
    let file_transfer = mock_transfer(&mut server, "idB", "P2", 1).await;

    let summary = walk(&server, "F1").await;

    folder_transfer.assert_async().await;
    file_transfer.assert_async().await;
    assert_eq!(summary.transfers_initiated, 2);
    assert_eq!(summary.folders_listed, 2);
}

#[tokio::test]
async fn listing_failure_only_abandons_its_branch() {
    let mut server = Server::new_async().await;

    let _root = mock_listing(
        &mut server,
        "F1",
        vec![
            folder("broken", "Broken", Vec::new()),
            folder("healthy", "Healthy", Vec::new()),
        ],
    )
    .await;
    let _broken = server
        .mock("GET", "/files")
        .match_query(Matcher::UrlEncoded("q".into(), "'broken' in parents".into()))
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(json!({"error": {"code": 500, "message": "Internal Error"}}).to_string())
        .create_async()
        .await;
    let _healthy = mock_listing(
        &mut server,
        "healthy",
        vec![file("idC", "C", vec![perm("P0", CALLER, "owner"), perm("P5", TARGET, "reader")])],
    )
    .await;
    let transfer = mock_transfer(&mut server, "idC", "P5", 1).await;

    let summary = walk(&server, "F1").await;

    transfer.assert_async().await;
    assert_eq!(summary.folders_listed, 2);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.transfers_initiated, 1);
}

#[tokio::test]
async fn update_failure_does_not_stop_siblings() {
    let mut server = Server::new_async().await;

    let _root = mock_listing(
        &mut server,
        "F1",
        vec![
            file("idA", "A", vec![perm("P0", CALLER, "owner"), perm("P1", TARGET, "reader")]),
            file("idB", "B", vec![perm("P0", CALLER, "owner"), perm("P2", TARGET, "reader")]),
        ],
    )
    .await;
    let _first = server
        .mock("PATCH", "/files/idA/permissions/P1")
        .with_status(403)
        .with_header("content-type", "application/json")
        .with_body(json!({"error": {"code": 403, "message": "Rate limit exceeded"}}).to_string())
        .create_async()
        .await;
    let second = mock_transfer(&mut server, "idB", "P2", 1).await;

    let summary = walk(&server, "F1").await;

    second.assert_async().await;
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.transfers_initiated, 1);
}

#[tokio::test]
async fn each_folder_is_listed_once() {
    let mut server = Server::new_async().await;

    let root = mock_listing(&mut server, "F1", vec![folder("F2", "Sub", Vec::new())]).await;
    let sub = mock_listing(&mut server, "F2", vec![folder("F1", "Back to root", Vec::new())]).await;

    let summary = walk(&server, "F1").await;

    root.assert_async().await;
    sub.assert_async().await;
    assert_eq!(summary.folders_listed, 2);
}

#[tokio::test]
async fn session_start_reads_caller_email() {
    let mut server = Server::new_async().await;
    let _userinfo = server
        .mock("GET", "/oauth2/v2/userinfo")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"email": CALLER}).to_string())
        .create_async()
        .await;

    let client = DriveClient::with_endpoints(
        Authenticator::new(
            ClientSecrets {
                client_id: "client-id".to_string(),
                client_secret: "client-secret".to_string(),
                redirect_uris: Vec::new(),
                auth_uri: None,
                token_uri: None,
            },
            StoredToken {
                access_token: "test-token".to_string(),
                refresh_token: None,
                scope: None,
                token_type: None,
                expiry_date: None,
            },
        ),
        Endpoints::with_base(&server.url()),
        NonZeroU32::new(10).unwrap(),
    );

    let session = Session::start(client, TARGET.to_string()).await.unwrap();

    assert_eq!(session.caller_email, CALLER);
    assert_eq!(session.target_email, TARGET);
}

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes).lines().map(str::to_string).collect()
    }
}

#[tokio::test]
async fn listing_events_name_their_folder() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    // Current-thread runtime: folder jobs run on this thread and see the subscriber.
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut server = Server::new_async().await;
    let _f1 = mock_listing(
        &mut server,
        "F1",
        vec![folder("F2", "Sub", vec![perm("P0", CALLER, "owner")])],
    )
    .await;
    let _f2 = mock_listing(&mut server, "F2", Vec::new()).await;

    walk(&server, "F1").await;

    let lines = logs.lines();
    let find = |needle: &str| {
        lines
            .iter()
            .find(|line| line.contains(needle))
            .unwrap_or_else(|| panic!("no log line containing {needle:?} in {lines:#?}"))
    };
    assert!(find("Files:").contains("folder=F1"));
    assert!(find("Total 1 files found").contains("folder=F1"));
    assert!(find("No (more) files found.").contains("folder=F2"));
}
