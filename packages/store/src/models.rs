//! # Domain models for notes, files and identities
//!
//! These types cross the server/client boundary via Dioxus server functions, so
//! they are all `Serialize + Deserialize`. Field names of stored records follow
//! the camelCase layout of the `notes` and `files` collections.
//!
//! | Struct | Represents |
//! |--------|-----------|
//! | [`Identity`] | The signed-in user as reported by the identity provider. |
//! | [`Note`] | A stored note. `id` is assigned by the collection store. |
//! | [`NoteDraft`] | The fields of a note that has not been created yet. |
//! | [`NotePatch`] | A partial update merged into an existing note. |
//! | [`UploadedFile`] | Metadata of an uploaded blob, owned by one user. |
//! | [`NewFileRecord`] | The same metadata before the store assigns an id. |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the collection holding [`Note`] records.
pub const NOTES: &str = "notes";
/// Name of the collection holding [`UploadedFile`] records.
pub const FILES: &str = "files";

/// The authenticated user's profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

impl Identity {
    /// Display name, falling back to the email address and then to `"User"`.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.email.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or("User")
    }
}

/// A note stored in the `notes` collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
}

/// A note that has not been submitted yet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Attach the id assigned by the store.
    pub fn into_note(self, id: String) -> Note {
        Note {
            id,
            title: self.title,
            content: self.content,
        }
    }
}

/// Partial update for a note. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl NotePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: None,
        }
    }

    /// Patch writing both fields of `note`.
    pub fn from_note(note: &Note) -> Self {
        Self {
            title: Some(note.title.clone()),
            content: Some(note.content.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }

    pub fn apply(&self, note: &mut Note) {
        if let Some(title) = &self.title {
            note.title = title.clone();
        }
        if let Some(content) = &self.content {
            note.content = content.clone();
        }
    }
}

/// Metadata of an uploaded file, stored in the `files` collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    /// Durable retrieval URL produced by the blob store.
    pub url: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
    /// Uid of the identity that uploaded the file.
    pub user_id: String,
    /// Blob path, so the blob can be removed together with the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
}

impl UploadedFile {
    pub fn kind(&self) -> FileKind {
        FileKind::from_mime(&self.content_type)
    }
}

/// [`UploadedFile`] before the store assigns an id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFileRecord {
    pub name: String,
    pub url: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
}

impl NewFileRecord {
    pub fn into_file(self, id: String) -> UploadedFile {
        UploadedFile {
            id,
            name: self.name,
            url: self.url,
            size: self.size,
            content_type: self.content_type,
            uploaded_at: self.uploaded_at,
            user_id: self.user_id,
            storage_path: self.storage_path,
        }
    }
}

/// Coarse file category used to pick an icon.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Video,
    Audio,
    Document,
    Archive,
    Other,
}

impl FileKind {
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            FileKind::Image
        } else if mime.starts_with("video/") {
            FileKind::Video
        } else if mime.starts_with("audio/") {
            FileKind::Audio
        } else if mime.contains("pdf") || mime.contains("document") {
            FileKind::Document
        } else if mime.contains("zip") || mime.contains("rar") {
            FileKind::Archive
        } else {
            FileKind::Other
        }
    }
}

/// Human-readable size: `0 Bytes`, `512 Bytes`, `1.5 KB`, `2 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_label_fallbacks() {
        let mut id = Identity {
            uid: "u1".into(),
            display_name: Some("Ada".into()),
            email: Some("ada@example.com".into()),
            photo_url: None,
        };
        assert_eq!(id.label(), "Ada");
        id.display_name = None;
        assert_eq!(id.label(), "ada@example.com");
        id.email = Some(String::new());
        assert_eq!(id.label(), "User");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2 * 1024 * 1024), "2 MB");
        assert_eq!(format_file_size(5 * 1024 * 1024 * 1024), "5 GB");
    }

    #[test]
    fn test_file_kind_from_mime() {
        assert_eq!(FileKind::from_mime("image/png"), FileKind::Image);
        assert_eq!(FileKind::from_mime("video/mp4"), FileKind::Video);
        assert_eq!(FileKind::from_mime("audio/ogg"), FileKind::Audio);
        assert_eq!(FileKind::from_mime("application/pdf"), FileKind::Document);
        assert_eq!(FileKind::from_mime("application/zip"), FileKind::Archive);
        assert_eq!(FileKind::from_mime(""), FileKind::Other);
    }

    #[test]
    fn test_uploaded_file_field_names() {
        let file = NewFileRecord {
            name: "a.txt".into(),
            url: "memory://a".into(),
            size: 3,
            content_type: "text/plain".into(),
            uploaded_at: DateTime::from_timestamp(0, 0).unwrap(),
            user_id: "u1".into(),
            storage_path: None,
        };
        let value = serde_json::to_value(&file).unwrap();
        assert_eq!(value["type"], "text/plain");
        assert_eq!(value["userId"], "u1");
        assert!(value.get("uploadedAt").is_some());
        assert!(value.get("storagePath").is_none());
    }

    #[test]
    fn test_patch_apply() {
        let mut note = NoteDraft::new("A", "B").into_note("n1".into());
        NotePatch::title("X").apply(&mut note);
        assert_eq!(note.title, "X");
        assert_eq!(note.content, "B");
    }
}
