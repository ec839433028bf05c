pub mod blob;
pub mod cancel;
pub mod collection;
pub mod config;
pub mod editor;
pub mod error;
pub mod files;
pub mod guard;
pub mod models;
pub mod notes;
pub mod session;
pub mod shelf;

mod memory;
pub use memory::MemoryStore;

pub use blob::{BlobPath, BlobSession, BlobStore};
pub use cancel::CancelToken;
pub use collection::{CollectionStore, Document};
pub use config::{BackendConfig, ConfigError};
pub use editor::{NoteEditor, NoteFormat};
pub use error::{Result, StoreError};
pub use files::{FileBackend, FileLibrary, PendingUploads, UploadTicket};
pub use guard::GuardDecision;
pub use models::{format_file_size, FileKind, Identity, Note, NoteDraft, NotePatch, UploadedFile};
pub use notes::{NoteBackend, NoteCollection};
pub use session::{IdentityProvider, SessionPhase, SessionView, SessionWatcher};
pub use shelf::{upload_batch, BatchReport, FileShelf, SelectedFile, UploadKey, CHUNK_SIZE};
