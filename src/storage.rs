//! Read-only access to served documents
//!
//! Connections only ever ask two questions of storage: is there a regular
//! file at this path, and what are its bytes. Anything answering those can
//! back the server.

use std::io;
use std::path::Path;

/// Backend the server reads documents from. It is never written to.
pub trait DocumentStore: Send + Sync + 'static {
    /// True when `path` names an existing regular file
    fn is_file(&self, path: &Path) -> impl Future<Output = bool> + Send;

    /// Read the whole file into memory
    fn read(&self, path: &Path) -> impl Future<Output = io::Result<Vec<u8>>> + Send;
}

/// Local filesystem, via `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl DocumentStore for LocalFs {
    async fn is_file(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }
}
