//! # File shelf: selection, sequential uploads and progress
//!
//! [`FileShelf`] is the state behind the files page: the caller's uploaded
//! files (newest first), the current selection, and per-file progress while a
//! batch runs. [`upload_batch`] drives one batch against a [`FileBackend`]:
//! files go one after another, each in [`CHUNK_SIZE`] pieces, reporting
//! progress after every chunk. A failing file is recorded and the batch moves
//! on; cancellation stops between chunks.

use std::fmt;

use crate::cancel::CancelToken;
use crate::error::{Result, StoreError};
use crate::files::FileBackend;
use crate::models::UploadedFile;

/// Bytes sent per chunk. A multiple of 256 KiB as resumable uploads require.
pub const CHUNK_SIZE: usize = 256 * 1024;

/// A file picked by the user, read into memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Progress key of one file in a batch: `{name}-{millis}`, with a `-{n}`
/// suffix when two selected files share a name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UploadKey(String);

impl UploadKey {
    pub fn new(name: &str, millis: i64, taken: impl Fn(&UploadKey) -> bool) -> Self {
        let base = format!("{name}-{millis}");
        let mut key = UploadKey(base.clone());
        let mut n = 1;
        while taken(&key) {
            key = UploadKey(format!("{base}-{n}"));
            n += 1;
        }
        key
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UploadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShelfEntry {
    pub file: SelectedFile,
    pub key: Option<UploadKey>,
    /// Fraction sent, `0.0..=1.0`; `None` until the batch reaches the file.
    pub progress: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FailedUpload {
    pub key: UploadKey,
    pub name: String,
    pub error: StoreError,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchReport {
    pub uploaded: Vec<UploadedFile>,
    pub failed: Vec<FailedUpload>,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileShelf {
    files: Vec<UploadedFile>,
    selected: Vec<ShelfEntry>,
    uploading: bool,
    loaded: bool,
}

impl FileShelf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn selected(&self) -> &[ShelfEntry] {
        &self.selected
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn load(&mut self, mut files: Vec<UploadedFile>) {
        files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        self.files = files;
        self.loaded = true;
    }

    /// Replace the selection. Ignored while a batch is running.
    pub fn select(&mut self, files: Vec<SelectedFile>) -> bool {
        if self.uploading {
            return false;
        }
        self.selected = files
            .into_iter()
            .map(|file| ShelfEntry {
                file,
                key: None,
                progress: None,
            })
            .collect();
        true
    }

    pub fn clear_selection(&mut self) {
        if !self.uploading {
            self.selected.clear();
        }
    }

    /// Start a batch over the selection. Returns `None` when the selection is
    /// empty or a batch is already running.
    pub fn start_batch(&mut self, millis: i64) -> Option<Vec<(UploadKey, SelectedFile)>> {
        if self.uploading || self.selected.is_empty() {
            return None;
        }
        let mut queue: Vec<(UploadKey, SelectedFile)> = Vec::with_capacity(self.selected.len());
        for entry in &mut self.selected {
            let key = UploadKey::new(&entry.file.name, millis, |k| {
                queue.iter().any(|(taken, _)| taken == k)
            });
            entry.key = Some(key.clone());
            entry.progress = Some(0.0);
            queue.push((key, entry.file.clone()));
        }
        self.uploading = true;
        Some(queue)
    }

    pub fn record_progress(&mut self, key: &UploadKey, fraction: f64) {
        if let Some(entry) = self
            .selected
            .iter_mut()
            .find(|e| e.key.as_ref() == Some(key))
        {
            entry.progress = Some(fraction.clamp(0.0, 1.0));
        }
    }

    pub fn progress(&self, key: &UploadKey) -> Option<f64> {
        self.selected
            .iter()
            .find(|e| e.key.as_ref() == Some(key))
            .and_then(|e| e.progress)
    }

    /// End the batch: add the uploaded files and clear the selection.
    pub fn finish_batch(&mut self, report: &BatchReport) {
        for file in &report.uploaded {
            if !self.files.iter().any(|f| f.id == file.id) {
                self.files.push(file.clone());
            }
        }
        self.files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        self.selected.clear();
        self.uploading = false;
    }

    pub fn remove(&mut self, id: &str) {
        self.files.retain(|f| f.id != id);
    }
}

/// Upload `queue` one file at a time.
pub async fn upload_batch<F: FileBackend>(
    backend: &F,
    queue: Vec<(UploadKey, SelectedFile)>,
    chunk_size: usize,
    mut on_progress: impl FnMut(&UploadKey, f64),
    cancel: &CancelToken,
) -> BatchReport {
    let mut report = BatchReport::default();
    for (key, file) in queue {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        match upload_one(backend, &key, &file, chunk_size, &mut on_progress, cancel).await {
            Ok(uploaded) => report.uploaded.push(uploaded),
            Err(StoreError::Cancelled) => {
                report.cancelled = true;
                break;
            }
            Err(error) => {
                tracing::warn!(%key, "upload failed: {error}");
                report.failed.push(FailedUpload {
                    key,
                    name: file.name,
                    error,
                });
            }
        }
    }
    tracing::info!(
        uploaded = report.uploaded.len(),
        failed = report.failed.len(),
        cancelled = report.cancelled,
        "upload batch finished"
    );
    report
}

async fn upload_one<F: FileBackend>(
    backend: &F,
    key: &UploadKey,
    file: &SelectedFile,
    chunk_size: usize,
    on_progress: &mut impl FnMut(&UploadKey, f64),
    cancel: &CancelToken,
) -> Result<UploadedFile> {
    let total = file.size();
    let ticket = backend
        .begin_upload(&file.name, &file.content_type, total)
        .await?;

    let mut offset = 0u64;
    for chunk in file.bytes.chunks(chunk_size.max(1)) {
        cancel.check()?;
        backend.upload_chunk(&ticket, offset, chunk.to_vec()).await?;
        offset += chunk.len() as u64;
        on_progress(key, offset as f64 / total as f64);
    }

    cancel.check()?;
    let uploaded = backend.finish_upload(&ticket).await?;
    on_progress(key, 1.0);
    Ok(uploaded)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::files::{FileLibrary, PendingUploads, UploadTicket};
    use crate::models::Identity;
    use crate::MemoryStore;

    fn ada() -> Identity {
        Identity {
            uid: "ada".into(),
            display_name: None,
            email: None,
            photo_url: None,
        }
    }

    fn text(name: &str, body: &str) -> SelectedFile {
        SelectedFile::new(name, "text/plain", body.as_bytes().to_vec())
    }

    /// Fails every upload whose name starts with `bad`.
    struct Flaky<F>(F);

    impl<F: FileBackend> FileBackend for Flaky<F> {
        async fn list_files(&self) -> Result<Vec<UploadedFile>> {
            self.0.list_files().await
        }

        async fn begin_upload(&self, name: &str, content_type: &str, size: u64) -> Result<UploadTicket> {
            if name.starts_with("bad") {
                return Err(StoreError::Backend("storage unavailable".into()));
            }
            self.0.begin_upload(name, content_type, size).await
        }

        async fn upload_chunk(&self, ticket: &UploadTicket, offset: u64, chunk: Vec<u8>) -> Result<()> {
            self.0.upload_chunk(ticket, offset, chunk).await
        }

        async fn finish_upload(&self, ticket: &UploadTicket) -> Result<UploadedFile> {
            self.0.finish_upload(ticket).await
        }

        async fn delete_file(&self, id: &str) -> Result<()> {
            self.0.delete_file(id).await
        }
    }

    #[test]
    fn test_upload_key_collision_suffix() {
        let taken = [UploadKey("a.txt-5".into()), UploadKey("a.txt-5-1".into())];
        let key = UploadKey::new("a.txt", 5, |k| taken.contains(k));
        assert_eq!(key.as_str(), "a.txt-5-2");
        assert_eq!(UploadKey::new("b.txt", 5, |_| false).as_str(), "b.txt-5");
    }

    #[test]
    fn test_start_batch_assigns_distinct_keys() {
        let mut shelf = FileShelf::new();
        shelf.select(vec![text("a.txt", "1"), text("a.txt", "2"), text("b.txt", "3")]);

        let queue = shelf.start_batch(7).unwrap();
        let keys: Vec<_> = queue.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["a.txt-7", "a.txt-7-1", "b.txt-7"]);
        assert!(shelf.is_uploading());

        // No second batch and no selection change while running
        assert!(shelf.start_batch(8).is_none());
        assert!(!shelf.select(vec![]));
        assert_eq!(shelf.selected().len(), 3);
    }

    #[test]
    fn test_empty_selection_does_not_start() {
        let mut shelf = FileShelf::new();
        assert!(shelf.start_batch(1).is_none());
        assert!(!shelf.is_uploading());
    }

    #[tokio::test]
    async fn test_batch_uploads_every_file_in_chunks() {
        let store = MemoryStore::new();
        let pending = PendingUploads::new();
        let backend = FileLibrary::new(store.clone(), store.clone(), &pending).owned_by(ada());

        let mut shelf = FileShelf::new();
        shelf.select(vec![text("a.txt", "hello world"), text("b.txt", "bye")]);
        let queue = shelf.start_batch(1).unwrap();

        let events = RefCell::new(Vec::new());
        let report = upload_batch(
            &backend,
            queue,
            4,
            |key, fraction| events.borrow_mut().push((key.clone(), fraction)),
            &CancelToken::new(),
        )
        .await;
        assert!(report.is_clean());
        assert_eq!(report.uploaded.len(), 2);

        let events = events.into_inner();
        for (key, fraction) in &events {
            shelf.record_progress(key, *fraction);
        }
        // "hello world" is 11 bytes: 3 chunks of 4, then the final 1.0
        let a_events: Vec<_> = events.iter().filter(|(k, _)| k.as_str() == "a.txt-1").collect();
        assert_eq!(a_events.len(), 4);
        assert!(a_events.windows(2).all(|w| w[0].1 <= w[1].1));
        assert_eq!(shelf.progress(&UploadKey("b.txt-1".into())), Some(1.0));

        shelf.finish_batch(&report);
        assert!(!shelf.is_uploading());
        assert!(shelf.selected().is_empty());
        assert_eq!(shelf.files().len(), 2);

        let listed = backend.list_files().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|f| f.user_id == "ada"));
        let a = listed.iter().find(|f| f.name == "a.txt").unwrap();
        assert_eq!(store.blob(a.storage_path.as_deref().unwrap()), Some(b"hello world".to_vec()));
    }

    #[tokio::test]
    async fn test_failed_file_does_not_stop_batch() {
        let store = MemoryStore::new();
        let pending = PendingUploads::new();
        let backend = Flaky(FileLibrary::new(store.clone(), store.clone(), &pending).owned_by(ada()));

        let queue = vec![
            (UploadKey("a-1".into()), text("a.txt", "a")),
            (UploadKey("bad-1".into()), text("bad.txt", "b")),
            (UploadKey("c-1".into()), text("c.txt", "c")),
        ];
        let report = upload_batch(&backend, queue, CHUNK_SIZE, |_, _| {}, &CancelToken::new()).await;

        assert_eq!(report.uploaded.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, "bad.txt");
        assert!(!report.cancelled);
        assert_eq!(backend.list_files().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_stops_between_chunks() {
        let store = MemoryStore::new();
        let pending = PendingUploads::new();
        let backend = FileLibrary::new(store.clone(), store.clone(), &pending).owned_by(ada());
        let cancel = CancelToken::new();

        let queue = vec![
            (UploadKey("a-1".into()), text("a.txt", "abcdefgh")),
            (UploadKey("b-1".into()), text("b.txt", "b")),
        ];
        let report = upload_batch(
            &backend,
            queue,
            2,
            |_, fraction| {
                if fraction >= 0.5 {
                    cancel.cancel();
                }
            },
            &cancel,
        )
        .await;

        assert!(report.cancelled);
        assert!(report.uploaded.is_empty());
        assert!(backend.list_files().await.unwrap().is_empty());
        assert_eq!(store.blob_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_file_uploads() {
        let store = MemoryStore::new();
        let pending = PendingUploads::new();
        let backend = FileLibrary::new(store.clone(), store.clone(), &pending).owned_by(ada());

        let mut last = None;
        let queue = vec![(UploadKey("e-1".into()), text("empty.txt", ""))];
        let report = upload_batch(&backend, queue, CHUNK_SIZE, |_, f| last = Some(f), &CancelToken::new()).await;
        assert_eq!(report.uploaded.len(), 1);
        assert_eq!(report.uploaded[0].size, 0);
        assert_eq!(last, Some(1.0));
    }
}
