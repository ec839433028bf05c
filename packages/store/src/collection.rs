//! # Collection store: document CRUD against a named collection
//!
//! [`CollectionStore`] is the seam between Caspian and the document database.
//! Documents are flat JSON objects ([`Document`]); the store assigns ids on
//! [`add`](CollectionStore::add) and never stores the id inside the document.
//! Typed records convert through [`to_document`] and [`from_document`].
//!
//! Implementations: [`crate::MemoryStore`] for tests, and the Firestore REST
//! client in the `api` crate.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

/// A stored document without its id.
pub type Document = Map<String, Value>;

/// Async document store keyed by collection name and backend-assigned id.
pub trait CollectionStore {
    /// Insert a document and return the id assigned to it.
    fn add(
        &self,
        collection: &str,
        doc: Document,
    ) -> impl std::future::Future<Output = Result<String>>;

    /// Every document in the collection, unfiltered.
    fn list(
        &self,
        collection: &str,
    ) -> impl std::future::Future<Output = Result<Vec<(String, Document)>>>;

    /// Documents whose `field` equals `value`, filtered by the store itself.
    fn list_where(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> impl std::future::Future<Output = Result<Vec<(String, Document)>>>;

    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Document>>>;

    /// Merge `fields` into an existing document. Fails with
    /// [`StoreError::NotFound`] if `id` does not exist.
    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
    ) -> impl std::future::Future<Output = Result<()>>;

    /// Remove a document. Removing an absent id succeeds.
    fn delete(
        &self,
        collection: &str,
        id: &str,
    ) -> impl std::future::Future<Output = Result<()>>;
}

/// Serialize a record into a document.
pub fn to_document<T: Serialize>(record: &T) -> Result<Document> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Malformed(format!(
            "expected an object, got {other}"
        ))),
    }
}

/// Deserialize a record from a document, injecting `id`.
pub fn from_document<T: DeserializeOwned>(id: &str, mut doc: Document) -> Result<T> {
    doc.insert("id".to_string(), Value::String(id.to_string()));
    Ok(serde_json::from_value(Value::Object(doc))?)
}
