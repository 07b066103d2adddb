use serde_json::Value;

use super::ReportStore;
use crate::config::StorageConfig;
use crate::error::{AssayError, Result};
use crate::model::report::{Report, ReportInput, sort_newest_first};
use crate::remote::{ClientError, DocumentClient, Fields, StoredDocument};

const COLLECTION_NAME: &str = "product_analysis_reports_v3";

/// Tenant-scoped collection path: `artifacts/{app}/users/{user}/product_analysis_reports_v3`.
///
/// # Errors
///
/// [`AssayError::ConfigurationFault`] when the user id is blank.
pub fn collection_path(app_id: &str, user_id: &str) -> Result<String> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(AssayError::configuration(
            "a user id is required to scope the remote collection",
        ));
    }
    let app_id = match app_id.trim() {
        "" => crate::config::DEFAULT_APP_ID,
        trimmed => trimmed,
    };
    Ok(format!("artifacts/{app_id}/users/{user_id}/{COLLECTION_NAME}"))
}

/// Reports stored one document each in a remote collection.
///
/// Ids and timestamps are assigned by the backend. Missing-document behavior
/// on update and delete is whatever the backend reports.
pub struct RemoteDocumentStore {
    client: Box<dyn DocumentClient>,
    collection: String,
}

impl RemoteDocumentStore {
    #[must_use]
    pub fn new(client: Box<dyn DocumentClient>, collection: String) -> Self {
        Self { client, collection }
    }

    /// Resolve the collection from settings and connect through `connect`.
    ///
    /// # Errors
    ///
    /// Any fault from path resolution or from `connect`.
    pub fn open<F>(settings: &StorageConfig, connect: F) -> Result<Self>
    where
        F: FnOnce(&StorageConfig) -> Result<Box<dyn DocumentClient>>,
    {
        let collection = collection_path(&settings.app_id, &settings.user_id)?;
        let client = connect(settings)?;
        Ok(Self::new(client, collection))
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn fault(&self, id: Option<&str>, err: ClientError) -> AssayError {
        match (err, id) {
            (ClientError::NotFound { .. }, Some(id)) => AssayError::not_found(id),
            (err, _) => AssayError::storage(
                format!("remote store request on {} failed", self.collection),
                err,
            ),
        }
    }
}

fn to_fields(input: &ReportInput) -> Result<Fields> {
    match serde_json::to_value(input) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(AssayError::storage_msg(format!(
            "report payload serialized to {other} instead of an object"
        ))),
        Err(e) => Err(AssayError::storage("failed to serialize report payload", e)),
    }
}

fn to_report(doc: StoredDocument) -> Result<Report> {
    let StoredDocument {
        id,
        mut fields,
        create_time,
        update_time,
    } = doc;
    // Server metadata is authoritative for identity and timestamps.
    fields.remove("id");
    fields.remove("createdAt");
    fields.remove("updatedAt");

    let mut report: Report = serde_json::from_value(Value::Object(fields))
        .map_err(|e| AssayError::storage(format!("document {id} is not a report"), e))?;
    report.id = id;
    report.created_at = create_time;
    report.updated_at = update_time;
    Ok(report)
}

impl ReportStore for RemoteDocumentStore {
    fn list(&self) -> Result<Vec<Report>> {
        let docs = self
            .client
            .list(&self.collection)
            .map_err(|e| self.fault(None, e))?;
        let mut reports = docs.into_iter().map(to_report).collect::<Result<Vec<_>>>()?;
        sort_newest_first(&mut reports);
        Ok(reports)
    }

    fn add(&self, input: &ReportInput) -> Result<String> {
        let fields = to_fields(input)?;
        let doc = self
            .client
            .create(&self.collection, &fields)
            .map_err(|e| self.fault(None, e))?;
        tracing::info!(id = %doc.id, product = %input.product_code, "remote report added");
        Ok(doc.id)
    }

    fn update(&self, id: &str, input: &ReportInput) -> Result<()> {
        let fields = to_fields(input)?;
        self.client
            .update(&self.collection, id, &fields)
            .map_err(|e| self.fault(Some(id), e))?;
        tracing::info!(id = %id, "remote report updated");
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.client
            .delete(&self.collection, id)
            .map_err(|e| self.fault(Some(id), e))?;
        tracing::info!(id = %id, "remote report deleted");
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Report> {
        match self.client.get(&self.collection, id) {
            Ok(Some(doc)) => to_report(doc),
            Ok(None) => Err(AssayError::not_found(id)),
            Err(e) => Err(self.fault(Some(id), e)),
        }
    }

    fn describe(&self) -> String {
        format!("remote {} ({})", self.client.describe(), self.collection)
    }
}
