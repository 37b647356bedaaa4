//! Connection state machine tests over in-memory streams and storage

use lantern::http::connection::{Connection, ConnectionLimits, Site};
use lantern::http::resolver::PathResolver;
use lantern::storage::DocumentStore;
use std::collections::{HashMap, HashSet};
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[derive(Default)]
struct MemoryStore {
    files: HashMap<PathBuf, Vec<u8>>,
    unreadable: HashSet<PathBuf>,
}

impl MemoryStore {
    fn with_file(mut self, path: &str, contents: &[u8]) -> Self {
        self.files.insert(PathBuf::from(path), contents.to_vec());
        self
    }

    fn with_unreadable(mut self, path: &str) -> Self {
        self.unreadable.insert(PathBuf::from(path));
        self
    }
}

impl DocumentStore for MemoryStore {
    async fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.unreadable.contains(path)
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::PermissionDenied, "unreadable"))
    }
}

fn site(store: MemoryStore, limits: ConnectionLimits) -> Arc<Site<MemoryStore>> {
    Arc::new(Site {
        resolver: PathResolver::new("/srv/www", "index.html").unwrap(),
        store,
        limits,
    })
}

fn default_site(store: MemoryStore) -> Arc<Site<MemoryStore>> {
    site(store, ConnectionLimits::default())
}

fn peer() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

/// Send `request` and collect everything the server writes until it closes.
async fn exchange(site: Arc<Site<MemoryStore>>, request: &[u8]) -> Vec<u8> {
    let (mut client, server) = tokio::io::duplex(64 * 1024);
    let task = tokio::spawn(Connection::new(server, peer(), site).run());

    client.write_all(request).await.unwrap();
    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();

    task.await.unwrap().unwrap();
    out
}

fn split_response(raw: &[u8]) -> (String, Vec<u8>) {
    let end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has a header terminator");
    let head = String::from_utf8(raw[..end].to_vec()).unwrap();
    (head, raw[end + 4..].to_vec())
}

fn status_line(head: &str) -> &str {
    head.lines().next().unwrap()
}

#[tokio::test]
async fn test_serves_existing_file() {
    let store = MemoryStore::default().with_file("/srv/www/foo.html", b"<h1>foo</h1>");
    let raw = exchange(default_site(store), b"GET /foo.html HTTP/1.0\r\nHost: x\r\n\r\n").await;

    let (head, body) = split_response(&raw);
    assert_eq!(status_line(&head), "HTTP/1.0 200 OK");
    assert!(head.contains("Content-Type: text/html"));
    assert!(head.contains("Content-Length: 12"));
    assert_eq!(body, b"<h1>foo</h1>".to_vec());
}

#[tokio::test]
async fn test_serves_binary_file_byte_exact() {
    let contents: Vec<u8> = (0..=255u8).collect();
    let store = MemoryStore::default().with_file("/srv/www/blob.bin", &contents);
    let raw = exchange(default_site(store), b"GET /blob.bin HTTP/1.0\r\n\r\n").await;

    let (_, body) = split_response(&raw);
    assert_eq!(body, contents);
}

#[tokio::test]
async fn test_directory_path_serves_index() {
    let store = MemoryStore::default()
        .with_file("/srv/www/index.html", b"home")
        .with_file("/srv/www/docs/index.html", b"docs");

    let raw = exchange(default_site(store), b"GET / HTTP/1.0\r\n\r\n").await;
    assert_eq!(split_response(&raw).1, b"home".to_vec());

    let store = MemoryStore::default().with_file("/srv/www/docs/index.html", b"docs");
    let raw = exchange(default_site(store), b"GET /docs/ HTTP/1.0\r\n\r\n").await;
    assert_eq!(split_response(&raw).1, b"docs".to_vec());
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let raw = exchange(default_site(MemoryStore::default()), b"GET /nope.html HTTP/1.0\r\n\r\n").await;

    let (head, body) = split_response(&raw);
    assert_eq!(status_line(&head), "HTTP/1.0 404 Not Found");
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_traversal_is_forbidden() {
    let store = MemoryStore::default().with_file("/etc/passwd", b"root:x:0:0");
    let raw = exchange(default_site(store), b"GET /../../etc/passwd HTTP/1.0\r\n\r\n").await;

    let (head, body) = split_response(&raw);
    assert_eq!(status_line(&head), "HTTP/1.0 403 Forbidden");
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_malformed_request_line_is_bad_request() {
    let raw = exchange(default_site(MemoryStore::default()), b"GET /\r\n\r\n").await;

    let (head, _) = split_response(&raw);
    assert_eq!(status_line(&head), "HTTP/1.0 400 Bad Request");
}

#[tokio::test]
async fn test_unknown_method_is_bad_request() {
    let raw = exchange(default_site(MemoryStore::default()), b"BREW /pot HTTP/1.0\r\n\r\n").await;

    let (head, _) = split_response(&raw);
    assert_eq!(status_line(&head), "HTTP/1.0 400 Bad Request");
}

#[tokio::test]
async fn test_post_is_method_not_allowed() {
    let store = MemoryStore::default().with_file("/srv/www/index.html", b"home");
    let raw = exchange(default_site(store), b"POST / HTTP/1.0\r\n\r\n").await;

    let (head, body) = split_response(&raw);
    assert_eq!(status_line(&head), "HTTP/1.0 405 Method Not Allowed");
    assert!(head.contains("Allow: GET"));
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_unreadable_file_is_internal_error() {
    let store = MemoryStore::default().with_unreadable("/srv/www/locked.html");
    let raw = exchange(default_site(store), b"GET /locked.html HTTP/1.0\r\n\r\n").await;

    let (head, _) = split_response(&raw);
    assert_eq!(status_line(&head), "HTTP/1.0 500 Internal Server Error");
}

#[tokio::test]
async fn test_request_split_across_writes() {
    let store = MemoryStore::default().with_file("/srv/www/a.html", b"A");
    let (mut client, server) = tokio::io::duplex(1024);
    let task = tokio::spawn(Connection::new(server, peer(), default_site(store)).run());

    for chunk in [&b"GET /a.ht"[..], b"ml HTTP/1.0\r\n", b"Host: x\r\n", b"\r\n"] {
        client.write_all(chunk).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    task.await.unwrap().unwrap();

    let (head, body) = split_response(&out);
    assert_eq!(status_line(&head), "HTTP/1.0 200 OK");
    assert_eq!(body, b"A".to_vec());
}

#[tokio::test]
async fn test_oversized_head_is_rejected() {
    let limits = ConnectionLimits {
        max_header_bytes: 64,
        ..ConnectionLimits::default()
    };
    let mut request = b"GET / HTTP/1.0\r\nX-Padding: ".to_vec();
    request.extend(std::iter::repeat_n(b'a', 200));

    let raw = exchange(site(MemoryStore::default(), limits), &request).await;

    let (head, _) = split_response(&raw);
    assert_eq!(status_line(&head), "HTTP/1.0 431 Request Header Fields Too Large");
}

#[tokio::test]
async fn test_oversized_complete_head_is_rejected() {
    let limits = ConnectionLimits {
        max_header_bytes: 32,
        ..ConnectionLimits::default()
    };
    let request = b"GET /index.html HTTP/1.0\r\nHost: example.com\r\n\r\n";

    let raw = exchange(site(MemoryStore::default(), limits), request).await;

    let (head, _) = split_response(&raw);
    assert_eq!(status_line(&head), "HTTP/1.0 431 Request Header Fields Too Large");
}

#[tokio::test]
async fn test_head_exactly_at_cap_is_served() {
    let request = b"GET /a.html HTTP/1.0\r\nHost: x\r\n\r\n";
    let store = || MemoryStore::default().with_file("/srv/www/a.html", b"A");

    let at_cap = ConnectionLimits {
        max_header_bytes: request.len(),
        ..ConnectionLimits::default()
    };
    let raw = exchange(site(store(), at_cap), request).await;
    let (head, body) = split_response(&raw);
    assert_eq!(status_line(&head), "HTTP/1.0 200 OK");
    assert_eq!(body, b"A".to_vec());

    let one_under = ConnectionLimits {
        max_header_bytes: request.len() - 1,
        ..ConnectionLimits::default()
    };
    let raw = exchange(site(store(), one_under), request).await;
    let (head, _) = split_response(&raw);
    assert_eq!(status_line(&head), "HTTP/1.0 431 Request Header Fields Too Large");
}

#[tokio::test]
async fn test_client_not_draining_response_hits_write_timeout() {
    let limits = ConnectionLimits {
        write_timeout: Duration::from_millis(100),
        ..ConnectionLimits::default()
    };
    let store = MemoryStore::default().with_file("/srv/www/big.html", &vec![b'x'; 1024 * 1024]);
    let (mut client, server) = tokio::io::duplex(64);
    let task = tokio::spawn(Connection::new(server, peer(), site(store, limits)).run());

    client.write_all(b"GET /big.html HTTP/1.0\r\n\r\n").await.unwrap();

    // The client stays open but never reads
    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("connection gives up on a stalled writer")
        .unwrap();

    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("Write timeout"), "{err:#}");
    drop(client);
}

#[tokio::test]
async fn test_stalled_client_times_out() {
    let limits = ConnectionLimits {
        read_timeout: Duration::from_millis(50),
        ..ConnectionLimits::default()
    };

    let raw = exchange(site(MemoryStore::default(), limits), b"GET / HTTP/1.0\r\n").await;

    let (head, _) = split_response(&raw);
    assert_eq!(status_line(&head), "HTTP/1.0 408 Request Timeout");
}

#[tokio::test]
async fn test_peer_closing_early_gets_no_response() {
    let (mut client, server) = tokio::io::duplex(1024);
    let task = tokio::spawn(
        Connection::new(server, peer(), default_site(MemoryStore::default())).run(),
    );

    client.write_all(b"GET / HT").await.unwrap();
    client.shutdown().await.unwrap();

    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();

    assert!(task.await.unwrap().is_ok());
    assert!(out.is_empty());
}
