//! # Note editor: local list plus a single draft/edit slot
//!
//! [`NoteEditor`] holds the notes fetched for a page, and one [`EditorSlot`]:
//! either nothing, a new-note draft, or a copy of the note being edited. The
//! slot is a single value, so drafting and editing can never overlap. Starting
//! an edit pre-empts composing and drops the draft.
//!
//! Every operation exists in two forms. The step methods
//! ([`take_submission`](NoteEditor::take_submission),
//! [`finish_create`](NoteEditor::finish_create), ...) are synchronous and let a
//! UI keep the editor in a signal while the backend call is in flight. The
//! async drivers ([`submit`](NoteEditor::submit), [`refresh`](NoteEditor::refresh),
//! [`delete`](NoteEditor::delete)) chain the same steps around a
//! [`NoteBackend`] call for owners that can hold `&mut self` across an await.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::models::{Note, NoteDraft, NotePatch};
use crate::notes::NoteBackend;

/// Markup left behind by a rich-text editor whose content was cleared.
pub const EMPTY_RICH_TEXT: &str = "<p></p>";

/// Storage format of note content. Selects the emptiness policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteFormat {
    /// Free-form text.
    #[default]
    Plain,
    /// Rich-text markup (Markdown source rendered for display).
    Rich,
}

impl NoteFormat {
    /// Whether a draft must be rejected without reaching the backend.
    pub fn is_blank(self, draft: &NoteDraft) -> bool {
        let content = draft.content.trim();
        let blank_content = match self {
            NoteFormat::Plain => content.is_empty(),
            NoteFormat::Rich => content.is_empty() || content == EMPTY_RICH_TEXT,
        };
        draft.title.trim().is_empty() || blank_content
    }
}

impl FromStr for NoteFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" => Ok(NoteFormat::Plain),
            "rich" | "richtext" | "rich-text" => Ok(NoteFormat::Rich),
            other => Err(format!("unknown note format: {other}")),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum EditorSlot {
    #[default]
    Idle,
    Composing(NoteDraft),
    Editing(Note),
}

enum Field<'a> {
    Draft(&'a mut NoteDraft),
    Note(&'a mut Note),
}

/// A backend write taken out of the slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    Create(NoteDraft),
    Update { id: String, patch: NotePatch },
}

/// Result of [`NoteEditor::submit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(Note),
    Updated(Note),
    /// Nothing to do: the slot was idle, the draft blank, or a write in flight.
    Skipped,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NoteEditor {
    notes: Vec<Note>,
    slot: EditorSlot,
    format: NoteFormat,
    submitting: bool,
}

impl NoteEditor {
    pub fn new(format: NoteFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn slot(&self) -> &EditorSlot {
        &self.slot
    }

    pub fn format(&self) -> NoteFormat {
        self.format
    }

    /// Switch the blank-draft policy. The slot is kept.
    pub fn set_format(&mut self, format: NoteFormat) {
        self.format = format;
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.slot, EditorSlot::Editing(_))
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Replace the local list with a fresh fetch.
    pub fn load(&mut self, notes: Vec<Note>) {
        self.notes = notes;
    }

    /// Title shown in the form for the current slot.
    pub fn title(&self) -> &str {
        match &self.slot {
            EditorSlot::Idle => "",
            EditorSlot::Composing(draft) => &draft.title,
            EditorSlot::Editing(note) => &note.title,
        }
    }

    /// Content shown in the form for the current slot.
    pub fn content(&self) -> &str {
        match &self.slot {
            EditorSlot::Idle => "",
            EditorSlot::Composing(draft) => &draft.content,
            EditorSlot::Editing(note) => &note.content,
        }
    }

    /// Typing while idle starts a draft; while editing it edits the target.
    pub fn set_title(&mut self, title: String) {
        match self.field_slot() {
            Field::Draft(draft) => draft.title = title,
            Field::Note(note) => note.title = title,
        }
    }

    pub fn set_content(&mut self, content: String) {
        match self.field_slot() {
            Field::Draft(draft) => draft.content = content,
            Field::Note(note) => note.content = content,
        }
    }

    fn field_slot(&mut self) -> Field<'_> {
        if self.slot == EditorSlot::Idle {
            self.slot = EditorSlot::Composing(NoteDraft::default());
        }
        match &mut self.slot {
            EditorSlot::Editing(note) => Field::Note(note),
            EditorSlot::Composing(draft) => Field::Draft(draft),
            EditorSlot::Idle => unreachable!("idle slot replaced above"),
        }
    }

    /// Start editing the note with `id`. Any draft is discarded.
    pub fn begin_edit(&mut self, id: &str) -> bool {
        if self.submitting {
            return false;
        }
        let Some(note) = self.notes.iter().find(|n| n.id == id) else {
            return false;
        };
        self.slot = EditorSlot::Editing(note.clone());
        true
    }

    pub fn cancel_edit(&mut self) {
        if self.is_editing() && !self.submitting {
            self.slot = EditorSlot::Idle;
        }
    }

    /// Take the pending write, marking the editor as submitting.
    ///
    /// Returns `None` when the slot is idle, the draft is blank for the
    /// current [`NoteFormat`], or another write is still in flight.
    pub fn take_submission(&mut self) -> Option<Submission> {
        if self.submitting {
            return None;
        }
        let submission = match &self.slot {
            EditorSlot::Idle => return None,
            EditorSlot::Composing(draft) => {
                if self.format.is_blank(draft) {
                    tracing::debug!("blank draft rejected");
                    return None;
                }
                Submission::Create(draft.clone())
            }
            EditorSlot::Editing(note) => Submission::Update {
                id: note.id.clone(),
                patch: NotePatch::from_note(note),
            },
        };
        self.submitting = true;
        Some(submission)
    }

    /// Append the created note and clear the draft.
    pub fn finish_create(&mut self, note: Note) {
        self.notes.retain(|n| n.id != note.id);
        self.notes.push(note);
        self.slot = EditorSlot::Idle;
        self.submitting = false;
    }

    /// Replace the matching note by id and leave edit mode.
    pub fn finish_update(&mut self, note: Note) {
        if let Some(existing) = self.notes.iter_mut().find(|n| n.id == note.id) {
            *existing = note;
        }
        self.slot = EditorSlot::Idle;
        self.submitting = false;
    }

    /// The write failed: keep the slot so the user can try again.
    pub fn fail_submission(&mut self) {
        self.submitting = false;
    }

    /// Drop a deleted note from the list. Absent ids are ignored.
    pub fn remove(&mut self, id: &str) {
        self.notes.retain(|n| n.id != id);
        if matches!(&self.slot, EditorSlot::Editing(note) if note.id == id) {
            self.slot = EditorSlot::Idle;
            self.submitting = false;
        }
    }

    pub async fn refresh<B: NoteBackend>(&mut self, backend: &B, cancel: &CancelToken) -> Result<()> {
        let notes = backend.list_notes().await?;
        cancel.check()?;
        self.load(notes);
        Ok(())
    }

    pub async fn submit<B: NoteBackend>(
        &mut self,
        backend: &B,
        cancel: &CancelToken,
    ) -> Result<SubmitOutcome> {
        let Some(submission) = self.take_submission() else {
            return Ok(SubmitOutcome::Skipped);
        };
        let result = match submission {
            Submission::Create(draft) => backend.create_note(draft).await.map(SubmitOutcome::Created),
            Submission::Update { id, patch } => backend
                .update_note(&id, patch)
                .await
                .map(SubmitOutcome::Updated),
        };
        cancel.check()?;
        match result {
            Ok(SubmitOutcome::Created(note)) => {
                self.finish_create(note.clone());
                Ok(SubmitOutcome::Created(note))
            }
            Ok(SubmitOutcome::Updated(note)) => {
                self.finish_update(note.clone());
                Ok(SubmitOutcome::Updated(note))
            }
            Ok(SubmitOutcome::Skipped) => Ok(SubmitOutcome::Skipped),
            Err(e) => {
                self.fail_submission();
                Err(e)
            }
        }
    }

    pub async fn delete<B: NoteBackend>(
        &mut self,
        backend: &B,
        id: &str,
        cancel: &CancelToken,
    ) -> Result<()> {
        backend.delete_note(id).await?;
        cancel.check()?;
        self.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::notes::NoteCollection;
    use crate::MemoryStore;

    /// Counts every backend call made through it.
    struct Counting<B> {
        inner: B,
        calls: Cell<usize>,
    }

    impl<B> Counting<B> {
        fn new(inner: B) -> Self {
            Self {
                inner,
                calls: Cell::new(0),
            }
        }
    }

    impl<B: NoteBackend> NoteBackend for Counting<B> {
        async fn list_notes(&self) -> Result<Vec<Note>> {
            self.calls.set(self.calls.get() + 1);
            self.inner.list_notes().await
        }

        async fn create_note(&self, draft: NoteDraft) -> Result<Note> {
            self.calls.set(self.calls.get() + 1);
            self.inner.create_note(draft).await
        }

        async fn update_note(&self, id: &str, patch: NotePatch) -> Result<Note> {
            self.calls.set(self.calls.get() + 1);
            self.inner.update_note(id, patch).await
        }

        async fn delete_note(&self, id: &str) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            self.inner.delete_note(id).await
        }
    }

    fn backend() -> Counting<NoteCollection<MemoryStore>> {
        Counting::new(NoteCollection::new(MemoryStore::new()))
    }

    #[test]
    fn test_emptiness_policies() {
        let plain = NoteFormat::Plain;
        assert!(plain.is_blank(&NoteDraft::new("", "")));
        assert!(plain.is_blank(&NoteDraft::new("title", "  ")));
        assert!(plain.is_blank(&NoteDraft::new(" ", "body")));
        assert!(!plain.is_blank(&NoteDraft::new("title", "<p></p>")));

        let rich = NoteFormat::Rich;
        assert!(rich.is_blank(&NoteDraft::new("title", "<p></p>")));
        assert!(!rich.is_blank(&NoteDraft::new("title", "<p>hi</p>")));
    }

    #[test]
    fn test_draft_survives_initial_load() {
        let mut editor = NoteEditor::default();
        editor.set_title("early".to_string());
        editor.set_content("typed before the fetch".to_string());

        editor.set_format(NoteFormat::Rich);
        editor.load(vec![NoteDraft::new("A", "B").into_note("n1".to_string())]);

        assert_eq!(editor.format(), NoteFormat::Rich);
        assert_eq!(editor.notes().len(), 1);
        assert_eq!(editor.title(), "early");
        assert_eq!(editor.content(), "typed before the fetch");
    }

    #[test]
    fn test_note_format_from_str() {
        assert_eq!("Rich".parse::<NoteFormat>(), Ok(NoteFormat::Rich));
        assert_eq!("plain".parse::<NoteFormat>(), Ok(NoteFormat::Plain));
        assert!("xml".parse::<NoteFormat>().is_err());
    }

    #[tokio::test]
    async fn test_blank_draft_makes_no_backend_call() {
        let backend = backend();
        let cancel = CancelToken::new();
        let mut editor = NoteEditor::new(NoteFormat::Plain);

        editor.set_title("only a title".into());
        let outcome = editor.submit(&backend, &cancel).await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Skipped);
        assert_eq!(backend.calls.get(), 0);
        assert!(editor.notes().is_empty());
        assert!(!editor.is_submitting());
        // Draft is kept for the user to finish
        assert_eq!(editor.title(), "only a title");
    }

    #[tokio::test]
    async fn test_create_appends_exactly_once() {
        let backend = backend();
        let cancel = CancelToken::new();
        let mut editor = NoteEditor::new(NoteFormat::Plain);

        editor.set_title("A".into());
        editor.set_content("B".into());
        let SubmitOutcome::Created(note) = editor.submit(&backend, &cancel).await.unwrap() else {
            panic!("expected a created note");
        };

        let matching: Vec<_> = editor.notes().iter().filter(|n| n.id == note.id).collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].title, "A");
        assert_eq!(matching[0].content, "B");
        assert_eq!(editor.slot(), &EditorSlot::Idle);

        // Applying the same record again does not duplicate it
        editor.finish_create(note.clone());
        assert_eq!(editor.notes().len(), 1);
    }

    #[tokio::test]
    async fn test_update_replaces_by_id() {
        let backend = backend();
        let cancel = CancelToken::new();
        let first = backend.create_note(NoteDraft::new("A", "B")).await.unwrap();
        let second = backend.create_note(NoteDraft::new("C", "D")).await.unwrap();

        let mut editor = NoteEditor::new(NoteFormat::Plain);
        editor.refresh(&backend, &cancel).await.unwrap();
        assert_eq!(editor.notes().len(), 2);

        assert!(editor.begin_edit(&first.id));
        editor.set_title("X".into());
        let outcome = editor.submit(&backend, &cancel).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Updated(_)));

        assert_eq!(editor.notes()[0].title, "X");
        assert_eq!(editor.notes()[0].content, "B");
        assert_eq!(editor.notes()[1], second);

        // Fresh fetch agrees with the local patch
        let fresh = backend.list_notes().await.unwrap();
        assert_eq!(fresh[0].title, "X");
        assert_eq!(fresh[0].content, "B");
    }

    #[tokio::test]
    async fn test_update_without_target_is_noop() {
        let backend = backend();
        let mut editor = NoteEditor::new(NoteFormat::Plain);
        let outcome = editor.submit(&backend, &CancelToken::new()).await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Skipped);
        assert_eq!(backend.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_delete_present_and_absent() {
        let backend = backend();
        let cancel = CancelToken::new();
        let note = backend.create_note(NoteDraft::new("A", "B")).await.unwrap();

        let mut editor = NoteEditor::new(NoteFormat::Plain);
        editor.refresh(&backend, &cancel).await.unwrap();
        editor.begin_edit(&note.id);

        editor.delete(&backend, &note.id, &cancel).await.unwrap();
        assert!(editor.notes().is_empty());
        assert_eq!(editor.slot(), &EditorSlot::Idle);

        // Already gone: still succeeds, list unchanged
        editor.delete(&backend, &note.id, &cancel).await.unwrap();
        assert!(editor.notes().is_empty());
    }

    #[test]
    fn test_edit_preempts_draft() {
        let mut editor = NoteEditor::new(NoteFormat::Plain);
        editor.load(vec![NoteDraft::new("A", "B").into_note("n1".into())]);

        editor.set_content("half-written".into());
        assert!(matches!(editor.slot(), EditorSlot::Composing(_)));

        assert!(editor.begin_edit("n1"));
        assert_eq!(editor.title(), "A");
        editor.set_content("edited".into());
        assert_eq!(editor.content(), "edited");
        // The list is untouched until the update succeeds
        assert_eq!(editor.notes()[0].content, "B");

        editor.cancel_edit();
        assert_eq!(editor.slot(), &EditorSlot::Idle);
        assert!(!editor.begin_edit("missing"));
    }

    #[test]
    fn test_single_submission_in_flight() {
        let mut editor = NoteEditor::new(NoteFormat::Plain);
        editor.set_title("A".into());
        editor.set_content("B".into());

        assert!(matches!(editor.take_submission(), Some(Submission::Create(_))));
        assert!(editor.take_submission().is_none());

        editor.fail_submission();
        assert!(editor.take_submission().is_some());
    }

    #[tokio::test]
    async fn test_cancelled_view_is_not_mutated() {
        let backend = backend();
        let cancel = CancelToken::new();
        let mut editor = NoteEditor::new(NoteFormat::Plain);
        editor.set_title("A".into());
        editor.set_content("B".into());

        cancel.cancel();
        let err = editor.submit(&backend, &cancel).await.unwrap_err();
        assert_eq!(err, crate::StoreError::Cancelled);
        assert!(editor.notes().is_empty());
    }
}
