//! Cloud Firestore REST v1 as a [`CollectionStore`].

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use store::{BackendConfig, CollectionStore, Document, StoreError};

use super::value::{decode_fields, document_id, encode_fields, encode_value};
use super::FirebaseError;

const SERVICE: &str = "firestore";
const PAGE_SIZE: &str = "300";

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Option<Value>,
}

impl RawDocument {
    fn into_entry(self) -> Result<(String, Document), FirebaseError> {
        let id = document_id(&self.name)
            .ok_or_else(|| FirebaseError::Decode(format!("bad document name {:?}", self.name)))?
            .to_string();
        let doc = decode_fields(self.fields.as_ref()).map_err(FirebaseError::Decode)?;
        Ok((id, doc))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryRow {
    document: Option<RawDocument>,
}

/// Firestore client acting with one user's ID token.
#[derive(Clone, Debug)]
pub struct Firestore {
    http: Client,
    documents_url: String,
    id_token: String,
}

impl Firestore {
    pub fn new(http: Client, config: &BackendConfig, id_token: impl Into<String>) -> Self {
        Self {
            http,
            documents_url: config.firestore_documents_url(),
            id_token: id_token.into(),
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.documents_url, collection)
    }

    /// URL of one document. `id` must stay a single path segment.
    fn document_url(&self, collection: &str, id: &str) -> Result<String, FirebaseError> {
        if !is_document_id(id) {
            tracing::warn!(%collection, ?id, "rejected document id");
            return Err(FirebaseError::InvalidId(id.to_string()));
        }
        Ok(format!("{}/{}/{}", self.documents_url, collection, id))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, FirebaseError> {
        let response = request.bearer_auth(&self.id_token).send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(FirebaseError::from_response(SERVICE, response).await)
        }
    }

    pub async fn create_document(&self, collection: &str, doc: &Document) -> Result<String, FirebaseError> {
        let request = self
            .http
            .post(self.collection_url(collection))
            .json(&json!({ "fields": encode_fields(doc) }));
        let raw: RawDocument = self.send(request).await?.json().await?;
        let (id, _) = raw.into_entry()?;
        tracing::debug!(%collection, %id, "firestore document created");
        Ok(id)
    }

    pub async fn list_documents(&self, collection: &str) -> Result<Vec<(String, Document)>, FirebaseError> {
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(self.collection_url(collection))
                .query(&[("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }
            let page: ListResponse = self.send(request).await?.json().await?;
            for raw in page.documents {
                entries.push(raw.into_entry()?);
            }
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        tracing::debug!(%collection, count = entries.len(), "firestore documents listed");
        Ok(entries)
    }

    /// Equality query on one top-level field.
    pub async fn run_query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Document)>, FirebaseError> {
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field_path(field) },
                        "op": "EQUAL",
                        "value": encode_value(value),
                    }
                }
            }
        });
        let request = self
            .http
            .post(format!("{}:runQuery", self.documents_url))
            .json(&body);
        let rows: Vec<QueryRow> = self.send(request).await?.json().await?;
        rows.into_iter()
            .filter_map(|row| row.document)
            .map(RawDocument::into_entry)
            .collect()
    }

    pub async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, FirebaseError> {
        let response = self
            .http
            .get(self.document_url(collection, id)?)
            .bearer_auth(&self.id_token)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(FirebaseError::from_response(SERVICE, response).await);
        }
        let raw: RawDocument = response.json().await?;
        Ok(Some(raw.into_entry()?.1))
    }

    /// Merge `fields` into an existing document. Returns `false` if it does not exist.
    pub async fn patch_document(
        &self,
        collection: &str,
        id: &str,
        fields: &Document,
    ) -> Result<bool, FirebaseError> {
        if fields.is_empty() {
            return Ok(self.get_document(collection, id).await?.is_some());
        }
        let mut query: Vec<(&str, String)> = fields
            .keys()
            .map(|k| ("updateMask.fieldPaths", field_path(k)))
            .collect();
        query.push(("currentDocument.exists", "true".to_string()));

        let response = self
            .http
            .patch(self.document_url(collection, id)?)
            .query(&query)
            .json(&json!({ "fields": encode_fields(fields) }))
            .bearer_auth(&self.id_token)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(FirebaseError::from_response(SERVICE, response).await);
        }
        tracing::debug!(%collection, %id, "firestore document patched");
        Ok(true)
    }

    pub async fn delete_document(&self, collection: &str, id: &str) -> Result<(), FirebaseError> {
        let response = self
            .http
            .delete(self.document_url(collection, id)?)
            .bearer_auth(&self.id_token)
            .send()
            .await?;
        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(FirebaseError::from_response(SERVICE, response).await)
        }
    }
}

/// Whether `id` can be used as a document id without changing the URL path.
///
/// Rejects separators, URL syntax, escapes and dot segments, which URL
/// normalisation would resolve against the collection.
fn is_document_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 1500
        && id != "."
        && id != ".."
        && !id.chars().any(|c| matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_control())
}

/// Quote a field name unless it is a simple identifier.
fn field_path(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

impl CollectionStore for Firestore {
    async fn add(&self, collection: &str, doc: Document) -> store::Result<String> {
        Ok(self.create_document(collection, &doc).await?)
    }

    async fn list(&self, collection: &str) -> store::Result<Vec<(String, Document)>> {
        Ok(self.list_documents(collection).await?)
    }

    async fn list_where(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> store::Result<Vec<(String, Document)>> {
        Ok(self.run_query(collection, field, value).await?)
    }

    async fn get(&self, collection: &str, id: &str) -> store::Result<Option<Document>> {
        Ok(self.get_document(collection, id).await?)
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> store::Result<()> {
        if self.patch_document(collection, id, &fields).await? {
            Ok(())
        } else {
            Err(StoreError::not_found(collection, id))
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> store::Result<()> {
        Ok(self.delete_document(collection, id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn firestore() -> Firestore {
        let config = BackendConfig {
            api_key: "key".into(),
            auth_domain: "caspian.firebaseapp.com".into(),
            project_id: "caspian".into(),
            storage_bucket: "caspian.appspot.com".into(),
            app_id: "1:2:web:3".into(),
            note_format: Default::default(),
        };
        Firestore::new(Client::new(), &config, "token")
    }

    #[test]
    fn test_document_url_rejects_path_escapes() {
        let fs = firestore();
        let url = fs.document_url("notes", "AbC123xyz").unwrap();
        assert!(url.ends_with("/documents/notes/AbC123xyz"));

        for id in ["", ".", "..", "../files/victim", "a/b", "%2e%2e", "a?b", "a#b", "a\\b"] {
            assert!(
                matches!(fs.document_url("notes", id), Err(FirebaseError::InvalidId(_))),
                "accepted {id:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_delete_with_escaping_id_sends_nothing() {
        let err = firestore().delete("notes", "../files/victim").await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
    }

    #[test]
    fn test_field_path_quoting() {
        assert_eq!(field_path("userId"), "userId");
        assert_eq!(field_path("storage_path"), "storage_path");
        assert_eq!(field_path("1st"), "`1st`");
        assert_eq!(field_path("a-b"), "`a-b`");
    }
}
