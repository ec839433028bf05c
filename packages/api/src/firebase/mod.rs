//! # Firebase REST clients
//!
//! The server talks to Firebase over plain HTTPS with one shared `reqwest`
//! client. No Firebase SDK is involved:
//!
//! | Module | Service | Used for |
//! |--------|---------|----------|
//! | [`identity`] | Identity Toolkit + Secure Token | Google access token → Firebase user; ID token refresh |
//! | [`firestore`] | Cloud Firestore v1 | [`store::CollectionStore`] over the `notes` and `files` collections |
//! | [`storage`] | Firebase Storage v0 | [`store::BlobStore`] with the resumable upload protocol |
//! | [`value`] | always | Firestore typed value codec (always compiled, unit-tested) |
//!
//! Every data request carries the caller's Firebase ID token, so the project's
//! security rules apply on top of the checks done here.

pub mod value;

#[cfg(feature = "server")]
pub mod firestore;
#[cfg(feature = "server")]
pub mod identity;
#[cfg(feature = "server")]
pub mod storage;

#[cfg(feature = "server")]
pub use firestore::Firestore;
#[cfg(feature = "server")]
pub use storage::Storage;

#[cfg(feature = "server")]
pub use error::FirebaseError;

#[cfg(feature = "server")]
mod error {
    use store::{ConfigError, StoreError};
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum FirebaseError {
        #[error("configuration error: {0}")]
        Config(#[from] ConfigError),

        #[error("request failed: {0}")]
        Http(#[from] reqwest::Error),

        #[error("{service} returned {status}: {message}")]
        Api {
            service: &'static str,
            status: u16,
            message: String,
        },

        #[error("unexpected response: {0}")]
        Decode(String),

        #[error("invalid document id {0:?}")]
        InvalidId(String),
    }

    impl FirebaseError {
        /// Read an error response body into [`FirebaseError::Api`].
        pub(crate) async fn from_response(service: &'static str, response: reqwest::Response) -> Self {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            // {"error": {"message": "..."}} for every Google API
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(body);
            FirebaseError::Api {
                service,
                status,
                message,
            }
        }

        pub fn status(&self) -> Option<u16> {
            match self {
                FirebaseError::Api { status, .. } => Some(*status),
                FirebaseError::Http(e) => e.status().map(|s| s.as_u16()),
                _ => None,
            }
        }
    }

    impl From<FirebaseError> for StoreError {
        fn from(err: FirebaseError) -> Self {
            match err.status() {
                Some(401) => StoreError::Unauthenticated,
                Some(403) => StoreError::Forbidden,
                _ => match err {
                    FirebaseError::Decode(msg) => StoreError::Malformed(msg),
                    FirebaseError::InvalidId(id) => StoreError::Malformed(format!("invalid document id {id:?}")),
                    other => StoreError::backend(other),
                },
            }
        }
    }
}
