//! # Files: owner-scoped file records and chunked uploads
//!
//! [`FileLibrary`] runs next to the stores (on the server) and is the only
//! place file records are read or written. Every operation takes the caller's
//! [`Identity`] and enforces ownership at the storage boundary:
//!
//! - listing asks the collection store for `userId == uid` instead of fetching
//!   everything and filtering afterwards;
//! - appending to or completing another user's upload fails with
//!   [`StoreError::Forbidden`];
//! - deleting another user's record fails with [`StoreError::Forbidden`];
//!   deleting an absent record is a no-op.
//!
//! An upload is `begin` → `append`* → `complete`. In-flight uploads live in a
//! [`PendingUploads`] registry shared across requests; `complete` commits the
//! blob and writes one metadata record owned by the caller.
//!
//! [`FileBackend`] is the caller-bound view of the same operations used by the
//! file shelf. [`OwnedFiles`] implements it over a library; the `ui` crate
//! implements it over server functions.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::blob::{BlobPath, BlobSession, BlobStore};
use crate::collection::{from_document, to_document, CollectionStore};
use crate::error::{Result, StoreError};
use crate::models::{Identity, NewFileRecord, UploadedFile, FILES};

/// Uploads idle for longer than this are dropped on the next `begin`.
const PENDING_TTL_MINUTES: i64 = 60;

/// Handle of an in-flight upload, returned by `begin`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTicket {
    pub id: String,
    pub total: u64,
}

pub trait FileBackend {
    /// The caller's files, newest first.
    fn list_files(&self) -> impl std::future::Future<Output = Result<Vec<UploadedFile>>>;

    fn begin_upload(
        &self,
        name: &str,
        content_type: &str,
        size: u64,
    ) -> impl std::future::Future<Output = Result<UploadTicket>>;

    fn upload_chunk(
        &self,
        ticket: &UploadTicket,
        offset: u64,
        chunk: Vec<u8>,
    ) -> impl std::future::Future<Output = Result<()>>;

    fn finish_upload(
        &self,
        ticket: &UploadTicket,
    ) -> impl std::future::Future<Output = Result<UploadedFile>>;

    fn delete_file(&self, id: &str) -> impl std::future::Future<Output = Result<()>>;
}

#[derive(Debug)]
struct PendingUpload {
    owner: String,
    name: String,
    content_type: String,
    session: BlobSession,
    received: u64,
    touched: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Registry {
    uploads: HashMap<String, PendingUpload>,
    /// Paths handed out by `reserve_path` whose blob session is still opening.
    reserved: HashSet<BlobPath>,
}

impl Registry {
    fn path_taken(&self, path: &BlobPath) -> bool {
        self.reserved.contains(path) || self.uploads.values().any(|p| &p.session.path == path)
    }
}

/// Registry of in-flight uploads, shared by every request.
#[derive(Debug, Default)]
pub struct PendingUploads {
    next_id: AtomicU64,
    registry: Mutex<Registry>,
}

impl PendingUploads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.registry.lock().unwrap().uploads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Claim a blob path for `name` that no other upload holds.
    ///
    /// The claim lasts until `insert` takes the path over or `release` drops it.
    fn reserve_path(&self, owner: &str, name: &str, now: DateTime<Utc>) -> BlobPath {
        let mut registry = self.registry.lock().unwrap();
        let mut millis = now.timestamp_millis();
        loop {
            let path = BlobPath::for_upload(owner, name, millis);
            if !registry.path_taken(&path) {
                registry.reserved.insert(path.clone());
                return path;
            }
            millis += 1;
        }
    }

    fn release(&self, path: &BlobPath) {
        self.registry.lock().unwrap().reserved.remove(path);
    }

    fn insert(&self, upload: PendingUpload) -> String {
        let id = format!("up-{:x}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let mut registry = self.registry.lock().unwrap();
        registry.reserved.remove(&upload.session.path);
        registry.uploads.insert(id.clone(), upload);
        id
    }

    fn prune(&self, now: DateTime<Utc>) {
        let cutoff = now - Duration::minutes(PENDING_TTL_MINUTES);
        self.registry.lock().unwrap().uploads.retain(|id, upload| {
            let keep = upload.touched > cutoff;
            if !keep {
                tracing::warn!(%id, path = %upload.session.path, "dropping stale upload");
            }
            keep
        });
    }

    /// Run `f` on the caller's pending upload.
    fn with_owned<T>(
        &self,
        owner: &str,
        id: &str,
        f: impl FnOnce(&mut PendingUpload) -> Result<T>,
    ) -> Result<T> {
        let mut registry = self.registry.lock().unwrap();
        let upload = registry
            .uploads
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("uploads", id))?;
        if upload.owner != owner {
            return Err(StoreError::Forbidden);
        }
        f(upload)
    }

    fn take_owned(&self, owner: &str, id: &str) -> Result<PendingUpload> {
        let mut registry = self.registry.lock().unwrap();
        match registry.uploads.get(id) {
            None => Err(StoreError::not_found("uploads", id)),
            Some(upload) if upload.owner != owner => Err(StoreError::Forbidden),
            Some(_) => registry
                .uploads
                .remove(id)
                .ok_or_else(|| StoreError::not_found("uploads", id)),
        }
    }
}

/// Owner-enforcing file operations over a collection store and a blob store.
#[derive(Debug)]
pub struct FileLibrary<'p, C, B> {
    records: C,
    blobs: B,
    pending: &'p PendingUploads,
}

impl<'p, C: CollectionStore, B: BlobStore> FileLibrary<'p, C, B> {
    pub fn new(records: C, blobs: B, pending: &'p PendingUploads) -> Self {
        Self {
            records,
            blobs,
            pending,
        }
    }

    /// Bind the library to one caller.
    pub fn owned_by(self, owner: Identity) -> OwnedFiles<'p, C, B> {
        OwnedFiles {
            library: self,
            owner,
        }
    }

    pub async fn list(&self, owner: &Identity) -> Result<Vec<UploadedFile>> {
        let docs = self
            .records
            .list_where(FILES, "userId", &Value::String(owner.uid.clone()))
            .await?;
        let mut files = Vec::with_capacity(docs.len());
        for (id, doc) in docs {
            match from_document::<UploadedFile>(&id, doc) {
                // The store already filtered; a mismatch means it ignored the filter.
                Ok(file) if file.user_id == owner.uid => files.push(file),
                Ok(_) => tracing::error!(%id, "store returned a foreign file record"),
                Err(e) => tracing::warn!(%id, "skipping malformed file record: {e}"),
            }
        }
        files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(files)
    }

    pub async fn begin(
        &self,
        owner: &Identity,
        name: &str,
        content_type: &str,
        size: u64,
    ) -> Result<UploadTicket> {
        let name = name.trim();
        if name.is_empty() || name.contains('/') {
            return Err(StoreError::Malformed(format!("invalid file name {name:?}")));
        }
        let now = Utc::now();
        self.pending.prune(now);

        let path = self.pending.reserve_path(&owner.uid, name, now);
        let session = match self.blobs.start(&path, content_type, size).await {
            Ok(session) => session,
            Err(e) => {
                self.pending.release(&path);
                return Err(e);
            }
        };
        let id = self.pending.insert(PendingUpload {
            owner: owner.uid.clone(),
            name: name.to_string(),
            content_type: content_type.to_string(),
            session,
            received: 0,
            touched: now,
        });
        tracing::info!(%id, %path, size, "upload started");
        Ok(UploadTicket { id, total: size })
    }

    pub async fn append(
        &self,
        owner: &Identity,
        ticket_id: &str,
        offset: u64,
        chunk: Vec<u8>,
    ) -> Result<()> {
        let len = chunk.len() as u64;
        let session = self.pending.with_owned(&owner.uid, ticket_id, |upload| {
            if offset != upload.received {
                return Err(StoreError::Malformed(format!(
                    "chunk at {offset}, expected {}",
                    upload.received
                )));
            }
            if upload.received + len > upload.session.total {
                return Err(StoreError::Malformed("chunk past end of upload".to_string()));
            }
            Ok(upload.session.clone())
        })?;

        self.blobs.append(&session, offset, chunk).await?;

        self.pending.with_owned(&owner.uid, ticket_id, |upload| {
            upload.received += len;
            upload.touched = Utc::now();
            Ok(())
        })
    }

    pub async fn complete(&self, owner: &Identity, ticket_id: &str) -> Result<UploadedFile> {
        let upload = self.pending.take_owned(&owner.uid, ticket_id)?;
        if upload.received != upload.session.total {
            return Err(StoreError::Malformed(format!(
                "upload incomplete: {} of {} bytes",
                upload.received, upload.session.total
            )));
        }

        let url = self.blobs.finish(&upload.session).await?;
        let record = NewFileRecord {
            name: upload.name,
            url,
            size: upload.session.total,
            content_type: upload.content_type,
            uploaded_at: Utc::now(),
            user_id: owner.uid.clone(),
            storage_path: Some(upload.session.path.to_string()),
        };
        let id = self.records.add(FILES, to_document(&record)?).await?;
        tracing::info!(%id, path = %upload.session.path, "upload complete");
        Ok(record.into_file(id))
    }

    pub async fn delete(&self, owner: &Identity, id: &str) -> Result<()> {
        let Some(doc) = self.records.get(FILES, id).await? else {
            tracing::debug!(%id, "file record already gone");
            return Ok(());
        };
        let file: UploadedFile = from_document(id, doc)?;
        if file.user_id != owner.uid {
            tracing::warn!(%id, uid = %owner.uid, "refusing to delete foreign file");
            return Err(StoreError::Forbidden);
        }

        self.records.delete(FILES, id).await?;
        if let Some(path) = file.storage_path {
            if let Err(e) = self.blobs.delete(&BlobPath::from(path)).await {
                tracing::warn!(%id, "file record deleted but blob remains: {e}");
            }
        }
        tracing::info!(%id, "file deleted");
        Ok(())
    }
}

/// A [`FileLibrary`] bound to one caller.
#[derive(Debug)]
pub struct OwnedFiles<'p, C, B> {
    library: FileLibrary<'p, C, B>,
    owner: Identity,
}

impl<C: CollectionStore, B: BlobStore> FileBackend for OwnedFiles<'_, C, B> {
    async fn list_files(&self) -> Result<Vec<UploadedFile>> {
        self.library.list(&self.owner).await
    }

    async fn begin_upload(&self, name: &str, content_type: &str, size: u64) -> Result<UploadTicket> {
        self.library.begin(&self.owner, name, content_type, size).await
    }

    async fn upload_chunk(&self, ticket: &UploadTicket, offset: u64, chunk: Vec<u8>) -> Result<()> {
        self.library.append(&self.owner, &ticket.id, offset, chunk).await
    }

    async fn finish_upload(&self, ticket: &UploadTicket) -> Result<UploadedFile> {
        self.library.complete(&self.owner, &ticket.id).await
    }

    async fn delete_file(&self, id: &str) -> Result<()> {
        self.library.delete(&self.owner, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn user(uid: &str) -> Identity {
        Identity {
            uid: uid.into(),
            display_name: None,
            email: None,
            photo_url: None,
        }
    }

    async fn upload(
        library: &FileLibrary<'_, MemoryStore, MemoryStore>,
        owner: &Identity,
        name: &str,
        bytes: &[u8],
    ) -> UploadedFile {
        let ticket = library
            .begin(owner, name, "text/plain", bytes.len() as u64)
            .await
            .unwrap();
        library
            .append(owner, &ticket.id, 0, bytes.to_vec())
            .await
            .unwrap();
        library.complete(owner, &ticket.id).await.unwrap()
    }

    #[tokio::test]
    async fn test_complete_writes_owned_record() {
        let store = MemoryStore::new();
        let pending = PendingUploads::new();
        let library = FileLibrary::new(store.clone(), store.clone(), &pending);
        let ada = user("ada");

        let file = upload(&library, &ada, "hello.txt", b"hello").await;
        assert_eq!(file.user_id, "ada");
        assert_eq!(file.size, 5);
        assert_eq!(file.name, "hello.txt");
        assert!(file.url.starts_with("memory://files/ada/hello.txt-"));

        let path = file.storage_path.clone().unwrap();
        assert_eq!(store.blob(&path), Some(b"hello".to_vec()));
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_list_only_returns_own_records() {
        let store = MemoryStore::new();
        let pending = PendingUploads::new();
        let library = FileLibrary::new(store.clone(), store.clone(), &pending);
        let ada = user("ada");
        let bob = user("bob");

        upload(&library, &ada, "a.txt", b"a").await;
        upload(&library, &bob, "b.txt", b"b").await;
        upload(&library, &ada, "c.txt", b"c").await;

        let mine = library.list(&ada).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|f| f.user_id == "ada"));
        // Newest first
        assert!(mine[0].uploaded_at >= mine[1].uploaded_at);
    }

    #[tokio::test]
    async fn test_foreign_upload_and_delete_are_forbidden() {
        let store = MemoryStore::new();
        let pending = PendingUploads::new();
        let library = FileLibrary::new(store.clone(), store.clone(), &pending);
        let ada = user("ada");
        let eve = user("eve");

        let ticket = library.begin(&ada, "a.txt", "text/plain", 1).await.unwrap();
        assert_eq!(
            library.append(&eve, &ticket.id, 0, vec![1]).await,
            Err(StoreError::Forbidden)
        );
        assert_eq!(
            library.complete(&eve, &ticket.id).await.unwrap_err(),
            StoreError::Forbidden
        );
        library.append(&ada, &ticket.id, 0, vec![1]).await.unwrap();
        let file = library.complete(&ada, &ticket.id).await.unwrap();

        assert_eq!(library.delete(&eve, &file.id).await, Err(StoreError::Forbidden));
        assert_eq!(library.list(&ada).await.unwrap().len(), 1);

        library.delete(&ada, &file.id).await.unwrap();
        assert!(library.list(&ada).await.unwrap().is_empty());
        assert_eq!(store.blob_count(), 0);

        // Deleting again is a no-op
        library.delete(&ada, &file.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_chunk_validation() {
        let store = MemoryStore::new();
        let pending = PendingUploads::new();
        let library = FileLibrary::new(store.clone(), store.clone(), &pending);
        let ada = user("ada");

        let ticket = library.begin(&ada, "a.bin", "", 4).await.unwrap();
        assert!(library.append(&ada, &ticket.id, 2, vec![1]).await.is_err());
        assert!(library.append(&ada, &ticket.id, 0, vec![0; 5]).await.is_err());
        library.append(&ada, &ticket.id, 0, vec![0; 2]).await.unwrap();

        // Incomplete upload cannot be committed
        assert!(matches!(
            library.complete(&ada, &ticket.id).await,
            Err(StoreError::Malformed(_))
        ));
        assert!(library.begin(&ada, "  ", "", 0).await.is_err());
        assert!(library.begin(&ada, "a/b", "", 0).await.is_err());
    }

    #[tokio::test]
    async fn test_same_name_same_instant_gets_distinct_paths() {
        let pending = PendingUploads::new();
        let now = Utc::now();
        let store = MemoryStore::new();
        let first_path = pending.reserve_path("ada", "a.txt", now);
        let session = store.start(&first_path, "", 0).await.unwrap();
        pending.insert(PendingUpload {
            owner: "ada".into(),
            name: "a.txt".into(),
            content_type: String::new(),
            session,
            received: 0,
            touched: now,
        });

        let second_path = pending.reserve_path("ada", "a.txt", now);
        assert_ne!(first_path, second_path);
    }

    #[test]
    fn test_reserved_path_is_held_until_released() {
        let pending = PendingUploads::new();
        let now = Utc::now();

        // Neither upload has its blob session yet
        let first = pending.reserve_path("ada", "a.txt", now);
        let second = pending.reserve_path("ada", "a.txt", now);
        assert_ne!(first, second);

        pending.release(&first);
        assert_eq!(pending.reserve_path("ada", "a.txt", now), first);
    }

    #[tokio::test]
    async fn test_stale_uploads_are_pruned() {
        let store = MemoryStore::new();
        let pending = PendingUploads::new();
        let library = FileLibrary::new(store.clone(), store.clone(), &pending);
        let ada = user("ada");

        library.begin(&ada, "old.txt", "", 1).await.unwrap();
        assert_eq!(pending.len(), 1);

        pending.prune(Utc::now() + Duration::minutes(PENDING_TTL_MINUTES + 1));
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_owned_files_backend() {
        let store = MemoryStore::new();
        let pending = PendingUploads::new();
        let files = FileLibrary::new(store.clone(), store.clone(), &pending).owned_by(user("ada"));

        let ticket = files.begin_upload("x.txt", "text/plain", 2).await.unwrap();
        files.upload_chunk(&ticket, 0, b"hi".to_vec()).await.unwrap();
        let file = files.finish_upload(&ticket).await.unwrap();

        assert_eq!(files.list_files().await.unwrap(), vec![file.clone()]);
        files.delete_file(&file.id).await.unwrap();
        assert!(files.list_files().await.unwrap().is_empty());
    }
}
