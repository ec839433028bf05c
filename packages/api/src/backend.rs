//! Process-wide Firebase handles.

use store::{BackendConfig, FileLibrary, Identity, NoteCollection, PendingUploads};
use tokio::sync::OnceCell;

use crate::firebase::{FirebaseError, Firestore, Storage};

static BACKEND: OnceCell<Backend> = OnceCell::const_new();

/// Validated configuration, the shared HTTP client and the in-flight uploads.
#[derive(Debug)]
pub struct Backend {
    config: BackendConfig,
    http: reqwest::Client,
    uploads: PendingUploads,
}

/// Get or initialize the backend from the environment.
pub async fn get_backend() -> Result<&'static Backend, FirebaseError> {
    BACKEND
        .get_or_try_init(|| async {
            dotenvy::dotenv().ok();

            let config = BackendConfig::from_env()?;
            tracing::info!(
                project = %config.project_id,
                bucket = %config.storage_bucket,
                format = ?config.note_format,
                "firebase backend configured"
            );

            Ok(Backend {
                config,
                http: reqwest::Client::new(),
                uploads: PendingUploads::new(),
            })
        })
        .await
}

impl Backend {
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn firestore(&self, id_token: &str) -> Firestore {
        Firestore::new(self.http.clone(), &self.config, id_token)
    }

    pub fn storage(&self, id_token: &str) -> Storage {
        Storage::new(self.http.clone(), &self.config, id_token)
    }

    pub fn notes(&self, id_token: &str) -> NoteCollection<Firestore> {
        NoteCollection::new(self.firestore(id_token))
    }

    /// File operations bound to `owner`.
    pub fn files(&'static self, owner: Identity, id_token: &str) -> store::files::OwnedFiles<'static, Firestore, Storage> {
        FileLibrary::new(self.firestore(id_token), self.storage(id_token), &self.uploads).owned_by(owner)
    }
}
