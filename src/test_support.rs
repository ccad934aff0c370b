//! Shared helpers for the in-crate test modules.

use axum::Router;
use std::path::PathBuf;

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Writes a small fake upload and returns its path; the file lives as long
/// as the returned directory.
pub fn write_upload(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"\x89PNG\r\n\x1a\nfake-image-bytes").unwrap();
    path
}
