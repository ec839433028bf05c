//! # Notes: typed CRUD over the `notes` collection
//!
//! [`NoteBackend`] is what the note editor talks to. Two implementations exist:
//! [`NoteCollection`] here, which runs next to a [`CollectionStore`] (on the
//! server, or in tests over [`crate::MemoryStore`]), and the client adapter in
//! the `ui` crate that forwards every call to a server function.

use crate::collection::{from_document, to_document, CollectionStore};
use crate::error::Result;
use crate::models::{Note, NoteDraft, NotePatch, NOTES};

pub trait NoteBackend {
    fn list_notes(&self) -> impl std::future::Future<Output = Result<Vec<Note>>>;

    fn create_note(&self, draft: NoteDraft) -> impl std::future::Future<Output = Result<Note>>;

    /// Merge `patch` into the note and return the stored result.
    fn update_note(
        &self,
        id: &str,
        patch: NotePatch,
    ) -> impl std::future::Future<Output = Result<Note>>;

    fn delete_note(&self, id: &str) -> impl std::future::Future<Output = Result<()>>;
}

/// [`NoteBackend`] on top of a collection store.
#[derive(Clone, Debug)]
pub struct NoteCollection<C> {
    store: C,
}

impl<C: CollectionStore> NoteCollection<C> {
    pub fn new(store: C) -> Self {
        Self { store }
    }
}

impl<C: CollectionStore> NoteBackend for NoteCollection<C> {
    async fn list_notes(&self) -> Result<Vec<Note>> {
        let docs = self.store.list(NOTES).await?;
        let mut notes = Vec::with_capacity(docs.len());
        for (id, doc) in docs {
            match from_document::<Note>(&id, doc) {
                Ok(note) => notes.push(note),
                Err(e) => tracing::warn!(%id, "skipping malformed note: {e}"),
            }
        }
        tracing::debug!(count = notes.len(), "listed notes");
        Ok(notes)
    }

    async fn create_note(&self, draft: NoteDraft) -> Result<Note> {
        let id = self.store.add(NOTES, to_document(&draft)?).await?;
        tracing::info!(%id, "note created");
        Ok(draft.into_note(id))
    }

    async fn update_note(&self, id: &str, patch: NotePatch) -> Result<Note> {
        self.store.update(NOTES, id, to_document(&patch)?).await?;
        let doc = self
            .store
            .get(NOTES, id)
            .await?
            .ok_or_else(|| crate::StoreError::not_found(NOTES, id))?;
        tracing::info!(%id, "note updated");
        from_document(id, doc)
    }

    async fn delete_note(&self, id: &str) -> Result<()> {
        self.store.delete(NOTES, id).await?;
        tracing::info!(%id, "note deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[tokio::test]
    async fn test_create_then_list() {
        let notes = NoteCollection::new(MemoryStore::new());
        let note = notes.create_note(NoteDraft::new("A", "B")).await.unwrap();

        let listed = notes.list_notes().await.unwrap();
        assert_eq!(listed, vec![note]);
    }

    #[tokio::test]
    async fn test_update_roundtrip_keeps_other_fields() {
        let notes = NoteCollection::new(MemoryStore::new());
        let note = notes.create_note(NoteDraft::new("A", "B")).await.unwrap();

        notes
            .update_note(&note.id, NotePatch::title("X"))
            .await
            .unwrap();

        // Fresh fetch
        let listed = notes.list_notes().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, note.id);
        assert_eq!(listed[0].title, "X");
        assert_eq!(listed[0].content, "B");
    }

    #[tokio::test]
    async fn test_update_missing_note_fails() {
        let notes = NoteCollection::new(MemoryStore::new());
        let err = notes
            .update_note("doc-1", NotePatch::title("X"))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_malformed_documents_are_skipped() {
        let store = MemoryStore::new();
        let mut bad = crate::Document::new();
        bad.insert("title".into(), serde_json::json!(42));
        store.add(NOTES, bad).await.unwrap();

        let notes = NoteCollection::new(store);
        notes.create_note(NoteDraft::new("ok", "fine")).await.unwrap();
        let listed = notes.list_notes().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "ok");
    }
}
