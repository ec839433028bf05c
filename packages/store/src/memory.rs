use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::blob::{BlobPath, BlobSession, BlobStore};
use crate::collection::{CollectionStore, Document};
use crate::error::{Result, StoreError};

/// In-memory collection and blob store for tests and local development.
///
/// Clones share the same underlying data. Document ids are sequential
/// (`doc-1`, `doc-2`, ...) and listing returns documents in insertion order.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    collections: Arc<Mutex<HashMap<String, BTreeMap<u64, Document>>>>,
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    staged: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of a committed blob.
    pub fn blob(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.lock().unwrap().get(path).cloned()
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    fn parse_id(id: &str) -> Option<u64> {
        id.strip_prefix("doc-")?.parse().ok()
    }

    fn format_id(key: u64) -> String {
        format!("doc-{key}")
    }
}

impl CollectionStore for MemoryStore {
    async fn add(&self, collection: &str, doc: Document) -> Result<String> {
        let key = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.collections
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .insert(key, doc);
        Ok(Self::format_id(key))
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Document)>> {
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(key, doc)| (Self::format_id(*key), doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_where(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Document)>> {
        let all = self.list(collection).await?;
        Ok(all
            .into_iter()
            .filter(|(_, doc)| doc.get(field) == Some(value))
            .collect())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let Some(key) = Self::parse_id(id) else {
            return Ok(None);
        };
        let collections = self.collections.lock().unwrap();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(&key))
            .cloned())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        let mut collections = self.collections.lock().unwrap();
        let doc = Self::parse_id(id)
            .and_then(|key| collections.get_mut(collection)?.get_mut(&key))
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        for (name, value) in fields {
            doc.insert(name, value);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        if let Some(key) = Self::parse_id(id) {
            if let Some(docs) = self.collections.lock().unwrap().get_mut(collection) {
                docs.remove(&key);
            }
        }
        Ok(())
    }
}

impl BlobStore for MemoryStore {
    async fn start(&self, path: &BlobPath, _content_type: &str, total: u64) -> Result<BlobSession> {
        self.staged
            .lock()
            .unwrap()
            .insert(path.to_string(), Vec::with_capacity(total as usize));
        Ok(BlobSession {
            path: path.clone(),
            handle: path.to_string(),
            total,
        })
    }

    async fn append(&self, session: &BlobSession, offset: u64, chunk: Vec<u8>) -> Result<()> {
        let mut staged = self.staged.lock().unwrap();
        let buf = staged
            .get_mut(&session.handle)
            .ok_or_else(|| StoreError::Backend(format!("no upload session {}", session.handle)))?;
        if buf.len() as u64 != offset {
            return Err(StoreError::Backend(format!(
                "offset {offset} does not match received {}",
                buf.len()
            )));
        }
        buf.extend_from_slice(&chunk);
        Ok(())
    }

    async fn finish(&self, session: &BlobSession) -> Result<String> {
        let data = self
            .staged
            .lock()
            .unwrap()
            .remove(&session.handle)
            .ok_or_else(|| StoreError::Backend(format!("no upload session {}", session.handle)))?;
        if data.len() as u64 != session.total {
            return Err(StoreError::Backend(format!(
                "upload incomplete: {} of {} bytes",
                data.len(),
                session.total
            )));
        }
        self.blobs
            .lock()
            .unwrap()
            .insert(session.path.to_string(), data);
        Ok(format!("memory://{}", session.path))
    }

    async fn delete(&self, path: &BlobPath) -> Result<()> {
        self.blobs.lock().unwrap().remove(path.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_add_list_get() {
        let store = MemoryStore::new();

        // Initially empty
        assert!(store.list("notes").await.unwrap().is_empty());

        let first = store.add("notes", doc(json!({"title": "A"}))).await.unwrap();
        let second = store.add("notes", doc(json!({"title": "B"}))).await.unwrap();
        assert_ne!(first, second);

        let all = store.list("notes").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].0, first);
        assert_eq!(all[1].1["title"], "B");

        let got = store.get("notes", &first).await.unwrap().unwrap();
        assert_eq!(got["title"], "A");
        assert!(store.get("notes", "doc-99").await.unwrap().is_none());
        assert!(store.get("files", &first).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = MemoryStore::new();
        let id = store
            .add("notes", doc(json!({"title": "A", "content": "B"})))
            .await
            .unwrap();

        store
            .update("notes", &id, doc(json!({"title": "X"})))
            .await
            .unwrap();

        let got = store.get("notes", &id).await.unwrap().unwrap();
        assert_eq!(got["title"], "X");
        assert_eq!(got["content"], "B");
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update("notes", "doc-7", doc(json!({"title": "X"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryStore::new();
        let id = store.add("notes", doc(json!({}))).await.unwrap();
        CollectionStore::delete(&store, "notes", &id).await.unwrap();
        CollectionStore::delete(&store, "notes", &id).await.unwrap();
        CollectionStore::delete(&store, "notes", "garbage").await.unwrap();
        assert!(store.list("notes").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_where_filters_in_store() {
        let store = MemoryStore::new();
        store.add("files", doc(json!({"userId": "a"}))).await.unwrap();
        store.add("files", doc(json!({"userId": "b"}))).await.unwrap();
        store.add("files", doc(json!({"userId": "a"}))).await.unwrap();

        let mine = store
            .list_where("files", "userId", &json!("a"))
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|(_, d)| d["userId"] == "a"));
    }

    #[tokio::test]
    async fn test_chunked_blob_upload() {
        let store = MemoryStore::new();
        let path = BlobPath::for_upload("u1", "a.bin", 1);
        let session = store.start(&path, "application/octet-stream", 5).await.unwrap();

        store.append(&session, 0, vec![1, 2, 3]).await.unwrap();
        // Out-of-order chunk is rejected
        assert!(store.append(&session, 1, vec![9]).await.is_err());
        store.append(&session, 3, vec![4, 5]).await.unwrap();

        let url = store.finish(&session).await.unwrap();
        assert_eq!(url, "memory://files/u1/a.bin-1");
        assert_eq!(store.blob(path.as_str()), Some(vec![1, 2, 3, 4, 5]));

        BlobStore::delete(&store, &path).await.unwrap();
        assert_eq!(store.blob_count(), 0);
    }

    #[tokio::test]
    async fn test_finish_rejects_short_upload() {
        let store = MemoryStore::new();
        let path = BlobPath::for_upload("u1", "a.bin", 2);
        let session = store.start(&path, "", 4).await.unwrap();
        store.append(&session, 0, vec![1]).await.unwrap();
        assert!(store.finish(&session).await.is_err());
        assert_eq!(store.blob_count(), 0);
    }
}
