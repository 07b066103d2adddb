//! Remote document-store capability.
//!
//! The report store only needs five operations from a document database:
//! create with a server-assigned id, get, update, delete, and list a
//! collection. Timestamps come from the server clock.
//!
//! [`FirestoreClient`] speaks the Firestore REST API; [`MemoryDocumentClient`]
//! keeps documents in process and is what the tests run against.

mod firestore;
mod value;

pub use firestore::{Credentials, FirestoreClient};

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Plain JSON fields of a document.
pub type Fields = Map<String, Value>;

/// A document as returned by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Fields,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The addressed document does not exist.
    #[error("document not found: {path}")]
    NotFound { path: String },

    /// Credentials were rejected.
    #[error("request unauthorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// Any other non-success response.
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Network-level failure (DNS, connect, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Operations a report store needs from a document database.
pub trait DocumentClient {
    /// Create a document with a backend-assigned id.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`] from the backend.
    fn create(&self, collection: &str, fields: &Fields) -> Result<StoredDocument, ClientError>;

    /// Fetch one document; `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`] other than "not found".
    fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, ClientError>;

    /// Overwrite the given fields of an existing document.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotFound`] when the document does not exist.
    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: &Fields,
    ) -> Result<StoredDocument, ClientError>;

    /// Delete a document.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`] from the backend.
    fn delete(&self, collection: &str, id: &str) -> Result<(), ClientError>;

    /// All documents in a collection, in backend order.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`] from the backend.
    fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, ClientError>;

    /// Short backend label for status output.
    fn describe(&self) -> String;
}

impl<T: DocumentClient + ?Sized> DocumentClient for Arc<T> {
    fn create(&self, collection: &str, fields: &Fields) -> Result<StoredDocument, ClientError> {
        (**self).create(collection, fields)
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, ClientError> {
        (**self).get(collection, id)
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: &Fields,
    ) -> Result<StoredDocument, ClientError> {
        (**self).update(collection, id, fields)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), ClientError> {
        (**self).delete(collection, id)
    }

    fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, ClientError> {
        (**self).list(collection)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

// ---------------------------------------------------------------------------
// In-process backend
// ---------------------------------------------------------------------------

/// Document store held in memory, with Firestore-like semantics:
/// deleting a missing document succeeds, updating one fails with
/// [`ClientError::NotFound`].
#[derive(Debug, Default)]
pub struct MemoryDocumentClient {
    collections: Mutex<BTreeMap<String, Vec<StoredDocument>>>,
    offline: AtomicBool,
}

impl MemoryDocumentClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable backend: every call fails with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), ClientError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(ClientError::Transport("backend unreachable".into()))
        } else {
            Ok(())
        }
    }

    fn with_collection<R>(
        &self,
        collection: &str,
        f: impl FnOnce(&mut Vec<StoredDocument>) -> R,
    ) -> Result<R, ClientError> {
        self.check_online()?;
        let mut guard = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(f(guard.entry(collection.to_string()).or_default()))
    }
}

fn server_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

impl DocumentClient for MemoryDocumentClient {
    fn create(&self, collection: &str, fields: &Fields) -> Result<StoredDocument, ClientError> {
        self.with_collection(collection, |docs| {
            let now = server_now();
            let doc = StoredDocument {
                id: uuid::Uuid::new_v4().simple().to_string(),
                fields: fields.clone(),
                create_time: now,
                update_time: now,
            };
            docs.push(doc.clone());
            doc
        })
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, ClientError> {
        self.with_collection(collection, |docs| docs.iter().find(|d| d.id == id).cloned())
    }

    fn update(
        &self,
        collection: &str,
        id: &str,
        fields: &Fields,
    ) -> Result<StoredDocument, ClientError> {
        self.with_collection(collection, |docs| {
            let doc = docs.iter_mut().find(|d| d.id == id)?;
            for (key, value) in fields {
                doc.fields.insert(key.clone(), value.clone());
            }
            doc.update_time =
                std::cmp::max(server_now(), doc.update_time + Duration::microseconds(1));
            Some(doc.clone())
        })?
        .ok_or_else(|| ClientError::NotFound {
            path: format!("{collection}/{id}"),
        })
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), ClientError> {
        self.with_collection(collection, |docs| docs.retain(|d| d.id != id))
    }

    fn list(&self, collection: &str) -> Result<Vec<StoredDocument>, ClientError> {
        self.with_collection(collection, |docs| docs.clone())
    }

    fn describe(&self) -> String {
        "in-memory document store".to_string()
    }
}
