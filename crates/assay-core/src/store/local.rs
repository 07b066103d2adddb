//! Single-file JSON backend.
//!
//! # Layout
//!
//! ```text
//! product_analysis_reports.json   # [ {report}, {report}, ... ]
//! ```
//!
//! # Invariants
//!
//! - The file exists (holding `[]`) before the first read.
//! - Every mutation reads the whole array, edits it, and replaces the file via
//!   a temp file + rename in the same directory. There is no lock; concurrent
//!   writers can lose updates.
//! - `updated_at = max(now, previous updated_at + 1µs)`.

use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, SubsecRound, Utc};
use tempfile::NamedTempFile;

use super::ReportStore;
use crate::error::{AssayError, Result};
use crate::model::report::{Report, ReportInput, sort_newest_first};

/// Reports persisted as one JSON array in one file.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    path: PathBuf,
}

impl LocalFileStore {
    /// Does not touch the filesystem; the file is created on first access.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_file(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.parent_dir() {
            fs::create_dir_all(parent).map_err(|e| self.io_fault("create directory for", e))?;
        }
        fs::write(&self.path, "[]\n").map_err(|e| self.io_fault("initialize", e))?;
        tracing::debug!(path = %self.path.display(), "created empty report file");
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Report>> {
        self.ensure_file()?;
        let content = fs::read_to_string(&self.path).map_err(|e| self.io_fault("read", e))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            AssayError::storage(format!("{} is not a JSON report array", self.path.display()), e)
        })
    }

    fn write_all(&self, rows: &[Report]) -> Result<()> {
        let dir = self.parent_dir().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_fault("stage write for", e))?;

        serde_json::to_writer_pretty(tmp.as_file_mut(), rows)
            .map_err(|e| AssayError::storage("failed to serialize reports", e))?;
        tmp.write_all(b"\n")
            .and_then(|()| tmp.as_file().sync_data())
            .map_err(|e| self.io_fault("write", e))?;

        tmp.persist(&self.path)
            .map_err(|e| self.io_fault("replace", e.error))?;
        Ok(())
    }

    fn parent_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    fn io_fault(&self, action: &str, err: io::Error) -> AssayError {
        AssayError::storage(format!("failed to {action} {}", self.path.display()), err)
    }
}

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

impl ReportStore for LocalFileStore {
    fn list(&self) -> Result<Vec<Report>> {
        let mut rows = self.read_all()?;
        sort_newest_first(&mut rows);
        Ok(rows)
    }

    fn add(&self, input: &ReportInput) -> Result<String> {
        let mut rows = self.read_all()?;
        let id = uuid::Uuid::new_v4().to_string();
        rows.push(Report::from_input(id.clone(), input, now()));
        self.write_all(&rows)?;
        tracing::info!(id = %id, product = %input.product_code, "report added");
        Ok(id)
    }

    fn update(&self, id: &str, input: &ReportInput) -> Result<()> {
        let mut rows = self.read_all()?;
        let Some(row) = rows.iter_mut().find(|r| r.id == id) else {
            return Err(AssayError::not_found(id));
        };
        let stamp = std::cmp::max(now(), row.updated_at + Duration::microseconds(1));
        row.apply(input, stamp);
        self.write_all(&rows)?;
        tracing::info!(id = %id, "report updated");
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut rows = self.read_all()?;
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() == before {
            tracing::debug!(id = %id, "delete of unknown report id; nothing to do");
        }
        self.write_all(&rows)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("local JSON ({})", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::report::ReportItemResult;
    use tempfile::TempDir;

    fn setup() -> (TempDir, LocalFileStore) {
        let tmp = TempDir::new().expect("tempdir");
        let store = LocalFileStore::new(tmp.path().join("data").join("reports.json"));
        (tmp, store)
    }

    fn input(date: &str, result: &str) -> ReportInput {
        ReportInput {
            product_name: "알파-아밀라아제 A-100".into(),
            product_code: "APA-100".into(),
            analysis_date: date.into(),
            analyst_name: "kim".into(),
            analysis_items: vec![ReportItemResult::new("수분(%)", "10 이하", result)],
        }
    }

    #[test]
    fn first_read_creates_empty_array_file() {
        let (_tmp, store) = setup();
        assert!(!store.path().exists());
        assert!(store.list().expect("list").is_empty());
        let content = fs::read_to_string(store.path()).expect("file created");
        assert_eq!(content.trim(), "[]");
    }

    #[test]
    fn add_assigns_id_and_equal_timestamps() {
        let (_tmp, store) = setup();
        let payload = input("2025-04-01", "5");
        let id = store.add(&payload).expect("add");
        let rows = store.list().expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].created_at, rows[0].updated_at);
        assert_eq!(payload, input("2025-04-01", "5"), "payload must not be mutated");
    }

    #[test]
    fn update_advances_updated_at_and_keeps_created_at() {
        let (_tmp, store) = setup();
        let id = store.add(&input("2025-04-01", "5")).expect("add");
        let before = store.get(&id).expect("get");

        store.update(&id, &input("2025-04-02", "6")).expect("update");

        let after = store.get(&id).expect("get");
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at > after.created_at);
        assert_eq!(after.analysis_date, "2025-04-02");
        assert_eq!(after.analysis_items[0].result, "6");
    }

    #[test]
    fn update_unknown_id_is_not_found_and_writes_nothing() {
        let (_tmp, store) = setup();
        store.add(&input("2025-04-01", "5")).expect("add");
        let snapshot = fs::read_to_string(store.path()).expect("read");

        let err = store.update("missing", &input("2025-04-02", "6")).unwrap_err();
        assert!(matches!(err, AssayError::NotFound { ref id } if id == "missing"));
        assert_eq!(fs::read_to_string(store.path()).expect("read"), snapshot);
    }

    #[test]
    fn delete_is_idempotent() {
        let (_tmp, store) = setup();
        let keep = store.add(&input("2025-04-01", "5")).expect("add");
        let gone = store.add(&input("2025-04-02", "6")).expect("add");

        store.delete(&gone).expect("first delete");
        store.delete(&gone).expect("second delete is a no-op");

        let ids: Vec<String> = store.list().expect("list").into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![keep]);
    }

    #[test]
    fn update_preserves_fields_written_by_other_versions() {
        let (_tmp, store) = setup();
        fs::create_dir_all(store.path().parent().expect("parent")).expect("mkdir");
        fs::write(
            store.path(),
            r#"[{"id":"old","productCode":"APA-100","analysisDate":"2024-01-01",
                "createdAt":"2024-01-01T00:00:00","updatedAt":"2024-01-01T00:00:00",
                "approvedBy":"lead"}]"#,
        )
        .expect("seed");

        store.update("old", &input("2024-01-02", "7")).expect("update");

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).expect("read")).expect("json");
        assert_eq!(raw[0]["approvedBy"], "lead");
        assert_eq!(raw[0]["createdAt"], "2024-01-01T00:00:00.000000Z");
        assert_eq!(raw[0]["analysisItems"][0]["result"], "7");
    }

    #[test]
    fn records_with_non_string_dates_still_list() {
        let (_tmp, store) = setup();
        fs::create_dir_all(store.path().parent().expect("parent")).expect("mkdir");
        fs::write(
            store.path(),
            r#"[{"id":"good","productCode":"APA-100","analysisDate":"2025-03-01",
                 "createdAt":"2025-03-01T00:00:00Z","updatedAt":"2025-03-01T00:00:00Z"},
                {"id":"null-date","productCode":"APA-100","analysisDate":null,
                 "createdAt":null,"updatedAt":"2025-03-01T00:00:00Z"},
                {"id":"int-date","productCode":"APA-100","analysisDate":20250101}]"#,
        )
        .expect("seed");

        let ids: Vec<String> = store.list().expect("list").into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["good", "null-date", "int-date"]);

        store.update("null-date", &input("2025-03-02", "4")).expect("update");
        assert_eq!(store.list().expect("list")[0].id, "null-date");
    }

    #[test]
    fn corrupt_file_is_a_storage_fault() {
        let (_tmp, store) = setup();
        fs::create_dir_all(store.path().parent().expect("parent")).expect("mkdir");
        fs::write(store.path(), "{ not json").expect("seed");
        let err = store.list().unwrap_err();
        assert!(matches!(err, AssayError::StorageFault { .. }));
    }

    #[test]
    fn file_keeps_non_ascii_text_readable() {
        let (_tmp, store) = setup();
        store.add(&input("2025-04-01", "5")).expect("add");
        let content = fs::read_to_string(store.path()).expect("read");
        assert!(content.contains("수분(%)"));
        assert!(content.contains("\"productCode\": \"APA-100\""));
    }
}
