//! File server functions.
//!
//! All of them act for the signed-in user only: listing returns the caller's
//! records, and uploads or deletes touching another user's data fail.

use dioxus::prelude::*;

use store::{UploadTicket, UploadedFile};
#[cfg(feature = "server")]
use store::FileBackend;

#[cfg(feature = "server")]
async fn files_for(
    session: &tower_sessions::Session,
) -> Result<
    store::files::OwnedFiles<'static, crate::firebase::Firestore, crate::firebase::Storage>,
    ServerFnError,
> {
    let (identity, token) = crate::auth::authenticated(session)
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;
    let backend = crate::backend::get_backend()
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))?;
    Ok(backend.files(identity, &token))
}

/// List the caller's files, newest first.
#[cfg(feature = "server")]
#[get("/api/files", session: tower_sessions::Session)]
pub async fn list_files() -> Result<Vec<UploadedFile>, ServerFnError> {
    files_for(&session)
        .await?
        .list_files()
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))
}

#[cfg(not(feature = "server"))]
#[get("/api/files")]
pub async fn list_files() -> Result<Vec<UploadedFile>, ServerFnError> {
    Err(ServerFnError::new("Server only"))
}

/// Open an upload of `size` bytes.
#[cfg(feature = "server")]
#[post("/api/files/begin", session: tower_sessions::Session)]
pub async fn begin_upload(
    name: String,
    content_type: String,
    size: u64,
) -> Result<UploadTicket, ServerFnError> {
    files_for(&session)
        .await?
        .begin_upload(&name, &content_type, size)
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))
}

#[cfg(not(feature = "server"))]
#[post("/api/files/begin")]
pub async fn begin_upload(
    name: String,
    content_type: String,
    size: u64,
) -> Result<UploadTicket, ServerFnError> {
    Err(ServerFnError::new("Server only"))
}

/// Send the bytes at `offset` of an open upload.
#[cfg(feature = "server")]
#[post("/api/files/chunk", session: tower_sessions::Session)]
pub async fn upload_chunk(
    ticket: UploadTicket,
    offset: u64,
    chunk: Vec<u8>,
) -> Result<(), ServerFnError> {
    files_for(&session)
        .await?
        .upload_chunk(&ticket, offset, chunk)
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))
}

#[cfg(not(feature = "server"))]
#[post("/api/files/chunk")]
pub async fn upload_chunk(
    ticket: UploadTicket,
    offset: u64,
    chunk: Vec<u8>,
) -> Result<(), ServerFnError> {
    Err(ServerFnError::new("Server only"))
}

/// Commit an upload and write its metadata record.
#[cfg(feature = "server")]
#[post("/api/files/finish", session: tower_sessions::Session)]
pub async fn finish_upload(ticket: UploadTicket) -> Result<UploadedFile, ServerFnError> {
    files_for(&session)
        .await?
        .finish_upload(&ticket)
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))
}

#[cfg(not(feature = "server"))]
#[post("/api/files/finish")]
pub async fn finish_upload(ticket: UploadTicket) -> Result<UploadedFile, ServerFnError> {
    Err(ServerFnError::new("Server only"))
}

/// Delete one of the caller's files and its blob.
#[cfg(feature = "server")]
#[post("/api/files/delete", session: tower_sessions::Session)]
pub async fn delete_file(id: String) -> Result<(), ServerFnError> {
    files_for(&session)
        .await?
        .delete_file(&id)
        .await
        .map_err(|e| ServerFnError::new(e.to_string()))
}

#[cfg(not(feature = "server"))]
#[post("/api/files/delete")]
pub async fn delete_file(id: String) -> Result<(), ServerFnError> {
    Err(ServerFnError::new("Server only"))
}
