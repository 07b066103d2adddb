//! End-to-end report lifecycle against both store backends.
//!
//! Covers:
//! - add/list/update/delete bookkeeping (ids, timestamps, ordering)
//! - the APA-100 merge scenario through a full session
//! - remote fallback to the local file when the backend is unusable

use std::sync::Arc;

use assay_core::catalog::{AnalysisItemTemplate, Catalog, Product};
use assay_core::config::StorageConfig;
use assay_core::error::AssayError;
use assay_core::merge::merge;
use assay_core::model::report::{ReportInput, ReportItemResult};
use assay_core::remote::{DocumentClient, MemoryDocumentClient};
use assay_core::session::{ReportSession, SessionMode, SubmitOutcome};
use assay_core::store::{
    LocalFileStore, RemoteDocumentStore, ReportStore, collection_path, select_store_with,
};
use tempfile::TempDir;

fn apa_catalog() -> Catalog {
    Catalog::new(vec![Product {
        key: "productA".to_string(),
        name: "알파-아밀라아제 A-100".to_string(),
        code: "APA-100".to_string(),
        analysis_items: vec![
            AnalysisItemTemplate {
                item_name: "수분(%)".to_string(),
                specification: "10 이하".to_string(),
                result: String::new(),
            },
            AnalysisItemTemplate {
                item_name: "PH".to_string(),
                specification: "4~7".to_string(),
                result: String::new(),
            },
        ],
    }])
    .expect("valid catalog")
}

fn payload(date: &str, analyst: &str) -> ReportInput {
    ReportInput {
        product_name: "알파-아밀라아제 A-100".to_string(),
        product_code: "APA-100".to_string(),
        analysis_date: date.to_string(),
        analyst_name: analyst.to_string(),
        analysis_items: vec![
            ReportItemResult::new("수분(%)", "10 이하", "5"),
            ReportItemResult::new("PH", "4~7", "6.5"),
        ],
    }
}

fn local_store(tmp: &TempDir) -> LocalFileStore {
    LocalFileStore::new(tmp.path().join("nested/dir/reports.json"))
}

fn remote_store() -> RemoteDocumentStore {
    let client: Box<dyn DocumentClient> = Box::new(Arc::new(MemoryDocumentClient::new()));
    RemoteDocumentStore::new(client, collection_path("lab", "analyst").expect("path"))
}

/// Shared contract every backend must satisfy.
fn exercise_store(store: &dyn ReportStore) {
    assert!(store.list().expect("empty list").is_empty());

    let first = store.add(&payload("2025-01-10", "kim")).expect("add first");
    let second = store.add(&payload("2025-03-02", "lee")).expect("add second");
    assert_ne!(first, second);

    let listed = store.list().expect("list");
    assert_eq!(listed.len(), 2);
    let created = listed.iter().find(|r| r.id == first).expect("first present");
    assert_eq!(created.created_at, created.updated_at);
    assert_eq!(listed[0].id, second, "newest analysis date first");

    let untouched = store.get(&second).expect("get second");
    store
        .update(&first, &payload("2025-01-11", "kim"))
        .expect("update first");
    let updated = store.get(&first).expect("get first");
    assert!(updated.updated_at > updated.created_at);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.analysis_date, "2025-01-11");
    assert_eq!(store.get(&second).expect("get second"), untouched);

    store.delete(&first).expect("delete first");
    let remaining: Vec<String> = store
        .list()
        .expect("list")
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(remaining, [second]);
    assert!(matches!(store.get(&first), Err(AssayError::NotFound { .. })));
}

#[test]
fn local_store_lifecycle() {
    let tmp = TempDir::new().expect("tempdir");
    let store = local_store(&tmp);
    exercise_store(&store);
    assert!(store.path().exists());
}

#[test]
fn remote_store_lifecycle() {
    exercise_store(&remote_store());
}

#[test]
fn local_double_delete_succeeds() {
    let tmp = TempDir::new().expect("tempdir");
    let store = local_store(&tmp);
    let id = store.add(&payload("2025-01-10", "kim")).expect("add");
    store.delete(&id).expect("first delete");
    store.delete(&id).expect("second delete is a no-op");
    store.delete("never-existed").expect("unknown id is a no-op");
}

#[test]
fn unparseable_dates_sort_last() {
    let tmp = TempDir::new().expect("tempdir");
    let store = local_store(&tmp);
    for date in ["2024-05-01", "not-a-date", "2025-06-30", "2024-12-31T23:00:00"] {
        store.add(&payload(date, "kim")).expect("add");
    }
    let dates: Vec<String> = store
        .list()
        .expect("list")
        .into_iter()
        .map(|r| r.analysis_date)
        .collect();
    assert_eq!(
        dates,
        ["2025-06-30", "2024-12-31T23:00:00", "2024-05-01", "not-a-date"]
    );
}

#[test]
fn apa_scenario_projects_saved_results() {
    let catalog = apa_catalog();
    let saved = vec![
        ReportItemResult::new("PH", "old spec", "6.5"),
        ReportItemResult::new("수분(%)", "old spec", "5"),
        ReportItemResult::new("retired item", "-", "x"),
    ];

    let merged = merge(&catalog, "productA", &saved);
    assert_eq!(
        merged,
        [
            ReportItemResult::new("수분(%)", "10 이하", "5"),
            ReportItemResult::new("PH", "4~7", "6.5"),
        ]
    );
    assert!(merge(&catalog, "productZ", &saved).is_empty());
}

#[test]
fn session_create_edit_delete_round() {
    let tmp = TempDir::new().expect("tempdir");
    let mut session = ReportSession::new(apa_catalog(), Box::new(local_store(&tmp)));

    session.select_product("productA").expect("select");
    session.set_analyst_name("kim");
    session.set_result("수분(%)", "5").expect("moisture");
    session.set_result("PH", "6.5").expect("ph");
    let SubmitOutcome::Created(id) = session.submit().expect("create") else {
        panic!("expected create outcome");
    };

    let saved = session.reports().expect("list").remove(0);
    session.start_edit(&saved);
    assert_eq!(session.mode(), &SessionMode::Editing { report_id: id.clone() });
    assert_eq!(
        session.form().items,
        [
            ReportItemResult::new("수분(%)", "10 이하", "5"),
            ReportItemResult::new("PH", "4~7", "6.5"),
        ]
    );

    session.set_result("PH", "7").expect("ph");
    assert_eq!(session.submit().expect("update"), SubmitOutcome::Updated(id.clone()));

    session.request_delete(id.clone());
    assert_eq!(session.confirm_delete().expect("delete"), id);
    assert!(session.reports().expect("list").is_empty());
}

#[test]
fn remote_fallback_keeps_session_usable() {
    let tmp = TempDir::new().expect("tempdir");
    let mut settings = StorageConfig {
        remote: true,
        user_id: "analyst".to_string(),
        local_path: tmp.path().join("reports.json"),
        ..StorageConfig::default()
    };

    let selection = select_store_with(&mut settings, |_| {
        Err(AssayError::configuration("service account descriptor missing"))
    });
    assert!(!selection.remote);
    assert!(!settings.remote);
    let warning = selection.warning.expect("fallback warning");
    assert_eq!(warning.code().code(), "E5002");

    let mut session = ReportSession::new(apa_catalog(), selection.store);
    session.select_product("productA").expect("select");
    session.submit().expect("local save works after fallback");
    assert!(tmp.path().join("reports.json").exists());
}

#[test]
fn remote_outage_preserves_form() {
    let client = Arc::new(MemoryDocumentClient::new());
    let store = RemoteDocumentStore::new(
        Box::new(Arc::clone(&client)),
        collection_path("", "analyst").expect("path"),
    );
    assert!(store.collection().starts_with("artifacts/default-app-id/"));

    let mut session = ReportSession::new(apa_catalog(), Box::new(store));
    session.select_product("productA").expect("select");
    session.set_result("PH", "5").expect("ph");

    client.set_offline(true);
    let before = session.form().clone();
    assert!(matches!(session.submit(), Err(AssayError::StorageFault { .. })));
    assert_eq!(session.form(), &before);

    client.set_offline(false);
    assert!(matches!(session.submit(), Ok(SubmitOutcome::Created(_))));
}
