//! Subcommand handlers.
//!
//! Each handler resolves configuration, opens a [`ReportSession`] on the
//! selected store, and drives it the way an analyst would through a form.

pub mod add;
pub mod delete;
pub mod edit;
pub mod list;
pub mod products;
pub mod show;
pub mod status;

use assay_core::config::{EffectiveConfig, resolve_config};
use assay_core::store::select_store;
use assay_core::{AssayError, Catalog, ErrorCode, ReportSession};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use crate::output::{CliError, OutputMode, render_error, render_warning};

/// Storage settings given on the command line. These win over config files
/// and environment.
#[derive(Debug, Clone, Default)]
pub struct StorageOverrides {
    pub remote: bool,
    pub app_id: Option<String>,
    pub user_id: Option<String>,
    pub data: Option<PathBuf>,
}

/// Everything a report command needs.
pub struct Context {
    pub config: EffectiveConfig,
    pub session: ReportSession,
    /// Whether the session ended up on the remote store.
    pub remote: bool,
    /// Why remote mode was abandoned, if it was.
    pub fallback: Option<AssayError>,
}

pub fn load_config(
    overrides: &StorageOverrides,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<EffectiveConfig> {
    let mut config = match resolve_config(project_root) {
        Ok(config) => config,
        Err(e) => {
            let code = ErrorCode::ConfigParseError;
            render_error(
                output,
                &CliError::with_details(
                    format!("{}: {e:#}", code.message()),
                    code.hint().unwrap_or_default(),
                    code.code(),
                ),
            )?;
            return Err(e.context("failed to load configuration"));
        }
    };
    let storage = &mut config.project.storage;
    if overrides.remote {
        storage.remote = true;
    }
    if let Some(app_id) = &overrides.app_id {
        storage.app_id.clone_from(app_id);
    }
    if let Some(user_id) = &overrides.user_id {
        storage.user_id.clone_from(user_id);
    }
    if let Some(data) = &overrides.data {
        storage.local_path = project_root.join(data);
    }
    Ok(config)
}

pub fn load_catalog(
    config: &EffectiveConfig,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<Catalog> {
    config
        .project
        .catalog
        .load(project_root)
        .map_err(|e| crate::output::fail(output, AssayError::from(e)))
}

/// Resolve config, pick the store, and open a session on it.
///
/// A remote fallback is reported as a warning on stderr; the command then
/// carries on against the local file.
pub fn open_session(
    overrides: &StorageOverrides,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<Context> {
    let mut config = load_config(overrides, output, project_root)?;
    let catalog = load_catalog(&config, output, project_root)?;

    let selection = select_store(&mut config.project.storage);
    if let Some(warning) = &selection.warning {
        let mut notice = CliError::from(warning);
        notice.message = format!("{}; using local file instead", notice.message);
        render_warning(output, &notice)?;
    }

    Ok(Context {
        config,
        session: ReportSession::new(catalog, selection.store),
        remote: selection.remote,
        fallback: selection.warning,
    })
}

/// Split a `name=value` result argument. The value may be empty.
pub fn parse_result_arg(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ITEM=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing item name in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

pub fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD, got '{raw}': {e}"))
}

/// Copy form fields given on the command line into the session.
pub fn apply_form_args(
    session: &mut ReportSession,
    product: Option<&str>,
    date: Option<NaiveDate>,
    analyst: Option<&str>,
    results: &[(String, String)],
) -> Result<(), AssayError> {
    if let Some(key) = product {
        session.select_product(key)?;
    }
    if let Some(date) = date {
        session.set_analysis_date(date);
    }
    if let Some(name) = analyst {
        session.set_analyst_name(name);
    }
    for (item, value) in results {
        session.set_result(item, value.as_str())?;
    }
    Ok(())
}
