//! # Blob store: chunked, path-addressed uploads
//!
//! An upload is three steps: [`start`](BlobStore::start) opens a session for a
//! path, [`append`](BlobStore::append) sends consecutive chunks, and
//! [`finish`](BlobStore::finish) commits the object and yields its durable
//! download URL. Chunking is what lets callers report fractional progress.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Location of a blob: `files/{uid}/{name}-{millis}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobPath(String);

impl BlobPath {
    pub fn for_upload(uid: &str, name: &str, millis: i64) -> Self {
        Self(format!("files/{uid}/{name}-{millis}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for BlobPath {
    fn from(path: String) -> Self {
        Self(path)
    }
}

impl std::fmt::Display for BlobPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An open upload session returned by [`BlobStore::start`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobSession {
    pub path: BlobPath,
    /// Store-specific session handle (a resumable upload URL for Firebase).
    pub handle: String,
    pub total: u64,
}

/// Async store for raw file bytes.
pub trait BlobStore {
    fn start(
        &self,
        path: &BlobPath,
        content_type: &str,
        total: u64,
    ) -> impl std::future::Future<Output = Result<BlobSession>>;

    fn append(
        &self,
        session: &BlobSession,
        offset: u64,
        chunk: Vec<u8>,
    ) -> impl std::future::Future<Output = Result<()>>;

    /// Commit the upload and return the download URL.
    fn finish(&self, session: &BlobSession) -> impl std::future::Future<Output = Result<String>>;

    fn delete(&self, path: &BlobPath) -> impl std::future::Future<Output = Result<()>>;
}
