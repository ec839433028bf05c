//! Note server functions. Every call requires a signed-in user.

use dioxus::prelude::*;

use store::{Note, NoteDraft, NotePatch};
#[cfg(feature = "server")]
use store::NoteBackend;

#[cfg(feature = "server")]
async fn notes_for(
    session: &tower_sessions::Session,
) -> Result<store::NoteCollection<crate::firebase::Firestore>, ServerFnError> {
    let (_identity, token) = crate::auth::authenticated(session)
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;
    let backend = crate::backend::get_backend()
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;
    Ok(backend.notes(&token))
}

/// List every note.
#[cfg(feature = "server")]
#[get("/api/notes", session: tower_sessions::Session)]
pub async fn list_notes() -> Result<Vec<Note>, ServerFnError> {
    notes_for(&session)
        .await?
        .list_notes()
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))
}

#[cfg(not(feature = "server"))]
#[get("/api/notes")]
pub async fn list_notes() -> Result<Vec<Note>, ServerFnError> {
    Err(ServerFnError::new("Server only"))
}

/// Create a note and return it with its assigned id.
#[cfg(feature = "server")]
#[post("/api/notes/add", session: tower_sessions::Session)]
pub async fn add_note(draft: NoteDraft) -> Result<Note, ServerFnError> {
    notes_for(&session)
        .await?
        .create_note(draft)
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))
}

#[cfg(not(feature = "server"))]
#[post("/api/notes/add")]
pub async fn add_note(draft: NoteDraft) -> Result<Note, ServerFnError> {
    Err(ServerFnError::new("Server only"))
}

/// Merge `patch` into a note and return the stored note.
#[cfg(feature = "server")]
#[post("/api/notes/update", session: tower_sessions::Session)]
pub async fn update_note(id: String, patch: NotePatch) -> Result<Note, ServerFnError> {
    notes_for(&session)
        .await?
        .update_note(&id, patch)
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))
}

#[cfg(not(feature = "server"))]
#[post("/api/notes/update")]
pub async fn update_note(id: String, patch: NotePatch) -> Result<Note, ServerFnError> {
    Err(ServerFnError::new("Server only"))
}

#[cfg(feature = "server")]
#[post("/api/notes/delete", session: tower_sessions::Session)]
pub async fn delete_note(id: String) -> Result<(), ServerFnError> {
    notes_for(&session)
        .await?
        .delete_note(&id)
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))
}

#[cfg(not(feature = "server"))]
#[post("/api/notes/delete")]
pub async fn delete_note(id: String) -> Result<(), ServerFnError> {
    Err(ServerFnError::new("Server only"))
}
