//! Client adapters: the store traits implemented over server functions.

use dioxus::prelude::ServerFnError;
use store::{
    FileBackend, Identity, IdentityProvider, Note, NoteBackend, NoteDraft, NotePatch, StoreError,
    UploadTicket, UploadedFile,
};

fn store_error(err: ServerFnError) -> StoreError {
    let message = err.to_string();
    if message.contains("Not authenticated") {
        StoreError::Unauthenticated
    } else {
        StoreError::Backend(message)
    }
}

/// Notes through the `/api/notes` server functions.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApiNotes;

impl NoteBackend for ApiNotes {
    async fn list_notes(&self) -> store::Result<Vec<Note>> {
        api::list_notes().await.map_err(store_error)
    }

    async fn create_note(&self, draft: NoteDraft) -> store::Result<Note> {
        api::add_note(draft).await.map_err(store_error)
    }

    async fn update_note(&self, id: &str, patch: NotePatch) -> store::Result<Note> {
        api::update_note(id.to_string(), patch)
            .await
            .map_err(store_error)
    }

    async fn delete_note(&self, id: &str) -> store::Result<()> {
        api::delete_note(id.to_string()).await.map_err(store_error)
    }
}

/// The signed-in user's files through the `/api/files` server functions.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApiFiles;

impl FileBackend for ApiFiles {
    async fn list_files(&self) -> store::Result<Vec<UploadedFile>> {
        api::list_files().await.map_err(store_error)
    }

    async fn begin_upload(&self, name: &str, content_type: &str, size: u64) -> store::Result<UploadTicket> {
        api::begin_upload(name.to_string(), content_type.to_string(), size)
            .await
            .map_err(store_error)
    }

    async fn upload_chunk(&self, ticket: &UploadTicket, offset: u64, chunk: Vec<u8>) -> store::Result<()> {
        api::upload_chunk(ticket.clone(), offset, chunk)
            .await
            .map_err(store_error)
    }

    async fn finish_upload(&self, ticket: &UploadTicket) -> store::Result<UploadedFile> {
        api::finish_upload(ticket.clone()).await.map_err(store_error)
    }

    async fn delete_file(&self, id: &str) -> store::Result<()> {
        api::delete_file(id.to_string()).await.map_err(store_error)
    }
}

/// Google sign-in through the server session.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApiIdentity;

impl IdentityProvider for ApiIdentity {
    async fn current(&self) -> store::Result<Option<Identity>> {
        api::get_current_user().await.map_err(store_error)
    }

    /// Redirect the browser to Google's consent page.
    async fn sign_in(&self) -> store::Result<()> {
        let url = api::google_login_url().await.map_err(store_error)?;
        #[cfg(target_arch = "wasm32")]
        {
            if let Some(window) = web_sys::window() {
                window
                    .location()
                    .set_href(&url)
                    .map_err(|_| StoreError::Backend("failed to leave the page".to_string()))?;
            }
        }
        #[cfg(not(target_arch = "wasm32"))]
        tracing::info!("sign in at {url}");
        Ok(())
    }

    async fn sign_out(&self) -> store::Result<()> {
        api::logout().await.map_err(store_error)
    }
}
