//! # API crate: shared fullstack server functions for Caspian
//!
//! This crate defines every Dioxus server function the web frontend calls,
//! along with the server-side modules they depend on.
//!
//! ## Modules
//!
//! | Module | Feature gate | Purpose |
//! |--------|-------------|---------|
//! | [`auth`] | always | Google OAuth with PKCE, Firebase session in the server session, token refresh |
//! | [`backend`] | `server` | Lazy `OnceCell` singleton: validated config, HTTP client, pending uploads |
//! | [`firebase`] | partly `server` | Identity Toolkit, Firestore and Storage REST clients; Firestore value codec |
//! | [`notes`] | always | Note server functions |
//! | [`files`] | always | File server functions (chunked upload) |
//!
//! ## Server functions
//!
//! Every server function is compiled twice: once with full server logic
//! (behind `#[cfg(feature = "server")]`) and once as a thin client stub that
//! forwards the call over HTTP.
//!
//! - **Authentication**: `get_current_user`, `google_login_url`, `logout`, `client_settings`
//! - **Notes**: `list_notes`, `add_note`, `update_note`, `delete_note`
//! - **Files**: `list_files`, `begin_upload`, `upload_chunk`, `finish_upload`, `delete_file`

use dioxus::prelude::*;
use serde::{Deserialize, Serialize};

pub mod auth;
#[cfg(feature = "server")]
pub mod backend;
pub mod files;
pub mod firebase;
pub mod notes;

pub use files::{begin_upload, delete_file, finish_upload, list_files, upload_chunk};
pub use notes::{add_note, delete_note, list_notes, update_note};
pub use store::{Identity, Note, NoteDraft, NoteFormat, NotePatch, UploadTicket, UploadedFile};

/// Settings the client needs before rendering editors.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientSettings {
    pub note_format: NoteFormat,
}

/// Get the signed-in identity from the session.
#[cfg(feature = "server")]
#[get("/api/auth/me", session: tower_sessions::Session)]
pub async fn get_current_user() -> Result<Option<Identity>, ServerFnError> {
    auth::current_identity(&session)
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))
}

#[cfg(not(feature = "server"))]
#[get("/api/auth/me")]
pub async fn get_current_user() -> Result<Option<Identity>, ServerFnError> {
    Ok(None)
}

/// Get the Google authorization URL for a fresh sign-in.
#[cfg(feature = "server")]
#[get("/api/auth/login/google", session: tower_sessions::Session)]
pub async fn google_login_url() -> Result<String, ServerFnError> {
    let oauth = auth::GoogleOAuth::new().map_err(|e| ServerFnError::new(e.to_string()))?;
    oauth
        .generate_auth_url(&session)
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))
}

#[cfg(not(feature = "server"))]
#[get("/api/auth/login/google")]
pub async fn google_login_url() -> Result<String, ServerFnError> {
    Err(ServerFnError::new("Server only"))
}

/// Log out the current user by clearing the session.
#[cfg(feature = "server")]
#[post("/api/auth/logout", session: tower_sessions::Session)]
pub async fn logout() -> Result<(), ServerFnError> {
    auth::sign_out(&session)
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))
}

#[cfg(not(feature = "server"))]
#[post("/api/auth/logout")]
pub async fn logout() -> Result<(), ServerFnError> {
    Ok(())
}

/// Get the configured note format.
#[cfg(feature = "server")]
#[get("/api/settings")]
pub async fn client_settings() -> Result<ClientSettings, ServerFnError> {
    let backend = backend::get_backend()
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;
    Ok(ClientSettings {
        note_format: backend.config().note_format,
    })
}

#[cfg(not(feature = "server"))]
#[get("/api/settings")]
pub async fn client_settings() -> Result<ClientSettings, ServerFnError> {
    Ok(ClientSettings::default())
}
