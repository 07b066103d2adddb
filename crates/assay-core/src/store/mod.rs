//! Report persistence.
//!
//! [`ReportStore`] is the capability the session controller drives. Two
//! backends implement it:
//!
//! - [`LocalFileStore`]: one JSON array in one file, rewritten on every
//!   mutation. Single writer only.
//! - [`RemoteDocumentStore`]: one document per report in a tenant-scoped
//!   collection behind a [`DocumentClient`](crate::remote::DocumentClient).
//!
//! The backends differ on missing ids: the local store rejects
//! `update` of an unknown id itself and treats `delete` of one as a no-op; the
//! remote store passes both cases through to the backend.
//!
//! [`select_store`] picks the backend once per session.

mod local;
mod remote;

pub use local::LocalFileStore;
pub use remote::{RemoteDocumentStore, collection_path};

use crate::config::StorageConfig;
use crate::error::{AssayError, Result};
use crate::model::report::{Report, ReportInput};
use crate::remote::{DocumentClient, FirestoreClient};

/// CRUD over saved reports.
pub trait ReportStore {
    /// All reports, newest `analysisDate` first.
    ///
    /// # Errors
    ///
    /// [`AssayError::StorageFault`] if the medium cannot be read.
    fn list(&self) -> Result<Vec<Report>>;

    /// Persist a new report and return its store-assigned id.
    ///
    /// # Errors
    ///
    /// [`AssayError::StorageFault`] if the medium cannot be written.
    fn add(&self, input: &ReportInput) -> Result<String>;

    /// Replace the mutable fields of report `id`.
    ///
    /// # Errors
    ///
    /// [`AssayError::NotFound`] for an unknown id (see the module docs for
    /// per-backend differences), [`AssayError::StorageFault`] otherwise.
    fn update(&self, id: &str, input: &ReportInput) -> Result<()>;

    /// Remove report `id`.
    ///
    /// # Errors
    ///
    /// [`AssayError::StorageFault`] on medium failure.
    fn delete(&self, id: &str) -> Result<()>;

    /// Fetch one report by id.
    ///
    /// # Errors
    ///
    /// [`AssayError::NotFound`] when no report has this id.
    fn get(&self, id: &str) -> Result<Report> {
        self.list()?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| AssayError::not_found(id))
    }

    /// Backend label and location, for status output.
    fn describe(&self) -> String;
}

/// The store chosen for a session, plus the fault that forced a fallback.
pub struct StoreSelection {
    pub store: Box<dyn ReportStore>,
    pub remote: bool,
    /// Set when remote mode was requested but could not be used.
    pub warning: Option<AssayError>,
}

/// Choose the backend for this session using the Firestore REST client.
///
/// See [`select_store_with`].
pub fn select_store(settings: &mut StorageConfig) -> StoreSelection {
    select_store_with(settings, |s| {
        FirestoreClient::connect(s).map(|client| Box::new(client) as Box<dyn DocumentClient>)
    })
}

/// Choose the backend for this session.
///
/// Remote mode is used only when `settings.remote` is on and `connect`
/// succeeds. Any configuration or connection fault is logged, returned as
/// the selection's warning, and turns `settings.remote` off so the rest of
/// the session stays on the local file.
pub fn select_store_with<F>(settings: &mut StorageConfig, connect: F) -> StoreSelection
where
    F: FnOnce(&StorageConfig) -> Result<Box<dyn DocumentClient>>,
{
    let mut warning = None;

    if settings.remote {
        match RemoteDocumentStore::open(settings, connect) {
            Ok(store) => {
                tracing::debug!(store = %store.describe(), "using remote report store");
                return StoreSelection {
                    store: Box::new(store),
                    remote: true,
                    warning: None,
                };
            }
            Err(err) => {
                tracing::warn!(error = %err, "remote store unavailable; falling back to local file");
                settings.remote = false;
                warning = Some(err);
            }
        }
    }

    let store = LocalFileStore::new(&settings.local_path);
    tracing::debug!(store = %store.describe(), "using local report store");
    StoreSelection {
        store: Box::new(store),
        remote: false,
        warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryDocumentClient;
    use tempfile::TempDir;

    fn settings(tmp: &TempDir) -> StorageConfig {
        StorageConfig {
            local_path: tmp.path().join("reports.json"),
            user_id: "analyst-1".into(),
            ..StorageConfig::default()
        }
    }

    #[test]
    fn local_is_default() {
        let tmp = TempDir::new().expect("tempdir");
        let mut cfg = settings(&tmp);
        let selection = select_store_with(&mut cfg, |_| panic!("remote must not be tried"));
        assert!(selection.warning.is_none());
        assert!(!selection.remote);
        assert!(selection.store.describe().starts_with("local"));
    }

    #[test]
    fn remote_used_when_enabled_and_connected() {
        let tmp = TempDir::new().expect("tempdir");
        let mut cfg = settings(&tmp);
        cfg.remote = true;
        let selection = select_store_with(&mut cfg, |_| {
            Ok(Box::new(MemoryDocumentClient::new()) as Box<dyn DocumentClient>)
        });
        assert!(selection.remote);
        assert!(cfg.remote);
        assert!(
            selection
                .store
                .describe()
                .contains("artifacts/default-app-id/users/analyst-1/product_analysis_reports_v3")
        );
    }

    #[test]
    fn connection_failure_downgrades_to_local() {
        let tmp = TempDir::new().expect("tempdir");
        let mut cfg = settings(&tmp);
        cfg.remote = true;
        let selection =
            select_store_with(&mut cfg, |_| Err(AssayError::configuration("no credentials")));
        assert!(matches!(selection.warning, Some(AssayError::ConfigurationFault(_))));
        assert!(!cfg.remote, "session must be forced back to local mode");
        assert!(selection.store.describe().starts_with("local"));
        assert!(selection.store.list().expect("local store usable").is_empty());
    }

    #[test]
    fn missing_user_id_is_a_configuration_fault() {
        let tmp = TempDir::new().expect("tempdir");
        let mut cfg = settings(&tmp);
        cfg.remote = true;
        cfg.user_id = "   ".into();
        let selection = select_store_with(&mut cfg, |_| {
            Ok(Box::new(MemoryDocumentClient::new()) as Box<dyn DocumentClient>)
        });
        assert!(matches!(selection.warning, Some(AssayError::ConfigurationFault(_))));
        assert!(!cfg.remote);
    }
}
