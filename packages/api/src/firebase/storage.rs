//! Firebase Storage v0 as a [`BlobStore`], using the resumable upload protocol.
//!
//! `start` opens a session and keeps the `X-Goog-Upload-URL` the service hands
//! back; each `append` sends one chunk at an explicit offset; `finish`
//! finalizes and turns the object's download token into a durable URL.

use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;

use store::{BackendConfig, BlobPath, BlobSession, BlobStore};

use super::FirebaseError;

const SERVICE: &str = "storage";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    #[serde(default)]
    download_tokens: Option<String>,
}

/// Storage client acting with one user's ID token.
#[derive(Clone, Debug)]
pub struct Storage {
    http: Client,
    bucket_url: String,
    app_id: String,
    id_token: String,
}

impl Storage {
    pub fn new(http: Client, config: &BackendConfig, id_token: impl Into<String>) -> Self {
        Self {
            http,
            bucket_url: config.storage_bucket_url(),
            app_id: config.app_id.clone(),
            id_token: id_token.into(),
        }
    }

    /// `{bucket_url}/{path}` with the whole path encoded as one segment.
    fn object_url(&self, path: &BlobPath) -> Result<Url, FirebaseError> {
        let mut url = Url::parse(&self.bucket_url).map_err(|e| FirebaseError::Decode(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| FirebaseError::Decode(format!("cannot extend {}", self.bucket_url)))?
            .push(path.as_str());
        Ok(url)
    }

    /// Public download URL for an object with the given token.
    pub fn download_url(&self, path: &BlobPath, token: &str) -> Result<String, FirebaseError> {
        let mut url = self.object_url(path)?;
        url.query_pairs_mut()
            .append_pair("alt", "media")
            .append_pair("token", token);
        Ok(url.to_string())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", format!("Firebase {}", self.id_token))
            .header("X-Firebase-GMPID", &self.app_id)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, FirebaseError> {
        let response = self.authorized(request).send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(FirebaseError::from_response(SERVICE, response).await)
        }
    }

    pub async fn start_upload(
        &self,
        path: &BlobPath,
        content_type: &str,
        total: u64,
    ) -> Result<BlobSession, FirebaseError> {
        let content_type = if content_type.is_empty() {
            "application/octet-stream"
        } else {
            content_type
        };
        let request = self
            .http
            .post(&self.bucket_url)
            .query(&[("name", path.as_str())])
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", total.to_string())
            .header("X-Goog-Upload-Header-Content-Type", content_type)
            .json(&json!({ "name": path.as_str(), "contentType": content_type }));
        let response = self.send(request).await?;

        let handle = response
            .headers()
            .get("X-Goog-Upload-URL")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| FirebaseError::Decode("upload session URL missing".to_string()))?
            .to_string();
        tracing::debug!(%path, total, "storage upload session opened");
        Ok(BlobSession {
            path: path.clone(),
            handle,
            total,
        })
    }

    pub async fn upload_chunk(
        &self,
        session: &BlobSession,
        offset: u64,
        chunk: Vec<u8>,
    ) -> Result<(), FirebaseError> {
        let request = self
            .http
            .post(&session.handle)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "upload")
            .header("X-Goog-Upload-Offset", offset.to_string())
            .body(chunk);
        self.send(request).await?;
        Ok(())
    }

    pub async fn finalize(&self, session: &BlobSession) -> Result<String, FirebaseError> {
        let request = self
            .http
            .post(&session.handle)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "finalize")
            .header("X-Goog-Upload-Offset", session.total.to_string())
            .body(Vec::new());
        let metadata: ObjectMetadata = self.send(request).await?.json().await?;

        // Several tokens may be comma-separated; any of them works.
        let token = metadata
            .download_tokens
            .as_deref()
            .and_then(|t| t.split(',').next())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| FirebaseError::Decode("object has no download token".to_string()))?;
        tracing::debug!(path = %session.path, "storage upload finalized");
        self.download_url(&session.path, token)
    }

    pub async fn delete_object(&self, path: &BlobPath) -> Result<(), FirebaseError> {
        let response = self
            .authorized(self.http.delete(self.object_url(path)?))
            .send()
            .await?;
        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(FirebaseError::from_response(SERVICE, response).await)
        }
    }
}

impl BlobStore for Storage {
    async fn start(&self, path: &BlobPath, content_type: &str, total: u64) -> store::Result<BlobSession> {
        Ok(self.start_upload(path, content_type, total).await?)
    }

    async fn append(&self, session: &BlobSession, offset: u64, chunk: Vec<u8>) -> store::Result<()> {
        Ok(self.upload_chunk(session, offset, chunk).await?)
    }

    async fn finish(&self, session: &BlobSession) -> store::Result<String> {
        Ok(self.finalize(session).await?)
    }

    async fn delete(&self, path: &BlobPath) -> store::Result<()> {
        Ok(self.delete_object(path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> Storage {
        let config = BackendConfig {
            api_key: "key".into(),
            auth_domain: "caspian.firebaseapp.com".into(),
            project_id: "caspian".into(),
            storage_bucket: "caspian.appspot.com".into(),
            app_id: "1:2:web:3".into(),
            note_format: Default::default(),
        };
        Storage::new(Client::new(), &config, "token")
    }

    #[test]
    fn test_download_url_encodes_path_as_one_segment() {
        let path = BlobPath::for_upload("u1", "my file.png", 1700000000000);
        let url = storage().download_url(&path, "abc").unwrap();
        assert_eq!(
            url,
            "https://firebasestorage.googleapis.com/v0/b/caspian.appspot.com/o/\
             files%2Fu1%2Fmy%20file.png-1700000000000?alt=media&token=abc"
        );
    }
}
