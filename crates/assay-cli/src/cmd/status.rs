//! `assay status`: which store is active and how it was chosen.

use crate::cmd::{StorageOverrides, open_session};
use crate::output::{CliError, OutputMode, pretty_kv, pretty_section, render_mode};
use clap::ValueEnum as _;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
struct StatusOutput {
    store: String,
    remote: bool,
    remote_requested: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback: Option<CliError>,
    app_id: String,
    user_id: String,
    local_path: String,
    products: usize,
    reports: Option<usize>,
    output: String,
}

pub fn run_status(
    overrides: &StorageOverrides,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let ctx = open_session(overrides, output, project_root)?;
    let storage = &ctx.config.project.storage;

    let reports = match ctx.session.reports() {
        Ok(reports) => Some(reports.len()),
        Err(err) => {
            tracing::warn!(error = %err, "could not count reports");
            None
        }
    };

    let status = StatusOutput {
        store: ctx.session.store_label(),
        remote: ctx.remote,
        remote_requested: ctx.remote || ctx.fallback.is_some(),
        fallback: ctx.fallback.as_ref().map(CliError::from),
        app_id: storage.normalized_app_id().to_string(),
        user_id: storage.user_id.clone(),
        local_path: storage.local_path.display().to_string(),
        products: ctx.session.catalog().len(),
        reports,
        output: output
            .to_possible_value()
            .map_or_else(String::new, |v| v.get_name().to_string()),
    };

    render_mode(output, &status, render_status_text, render_status_human)
}

fn render_status_text(s: &StatusOutput, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "store\t{}", s.store)?;
    writeln!(w, "remote\t{}", s.remote)?;
    writeln!(w, "products\t{}", s.products)?;
    if let Some(n) = s.reports {
        writeln!(w, "reports\t{n}")?;
    }
    if let Some(f) = &s.fallback {
        writeln!(w, "fallback\t{}", f.message)?;
    }
    Ok(())
}

fn render_status_human(s: &StatusOutput, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "assay status")?;
    pretty_kv(w, "Store", &s.store)?;
    pretty_kv(
        w,
        "Mode",
        match (s.remote, s.remote_requested) {
            (true, _) => "remote",
            (false, true) => "local (remote unavailable)",
            (false, false) => "local",
        },
    )?;
    if s.remote {
        pretty_kv(w, "App", &s.app_id)?;
        pretty_kv(w, "User", &s.user_id)?;
    }
    pretty_kv(w, "Products", s.products.to_string())?;
    pretty_kv(
        w,
        "Reports",
        s.reports.map_or_else(|| "unavailable".to_string(), |n| n.to_string()),
    )?;
    if let Some(f) = &s.fallback {
        pretty_kv(w, "Fallback", &f.message)?;
    }
    Ok(())
}
