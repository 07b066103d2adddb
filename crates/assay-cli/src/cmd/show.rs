//! `assay show`: one saved report in full.

use crate::cmd::{StorageOverrides, open_session};
use crate::output::{OutputMode, fail, pretty_kv, pretty_rule, pretty_section, render_mode};
use assay_core::Report;
use chrono::{DateTime, Local, Utc};
use clap::Args;
use std::io::{self, Write};
use std::path::Path;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Report id.
    pub id: String,
}

fn local_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() { "-" } else { value }
}

pub fn run_show(
    args: &ShowArgs,
    overrides: &StorageOverrides,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let ctx = open_session(overrides, output, project_root)?;
    let report = ctx
        .session
        .report(args.id.trim())
        .map_err(|e| fail(output, e))?;

    render_mode(output, &report, render_show_text, render_show_human)
}

fn render_show_text(report: &Report, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "id\t{}", report.id)?;
    writeln!(w, "product\t{}\t{}", report.product_code, report.product_name)?;
    writeln!(w, "date\t{}", report.analysis_date)?;
    writeln!(w, "analyst\t{}", report.analyst_name)?;
    for item in &report.analysis_items {
        writeln!(
            w,
            "item\t{}\t{}\t{}",
            item.item_name, item.specification, item.result
        )?;
    }
    Ok(())
}

fn render_show_human(report: &Report, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(
        w,
        &format!("{} ({})", report.product_name, report.product_code),
    )?;
    pretty_kv(w, "ID", &report.id)?;
    pretty_kv(w, "Date", &report.analysis_date)?;
    pretty_kv(w, "Analyst", or_dash(&report.analyst_name))?;
    pretty_kv(w, "Created", local_time(report.created_at))?;
    pretty_kv(w, "Updated", local_time(report.updated_at))?;

    writeln!(w)?;
    pretty_section(w, "Results")?;
    let width = report
        .analysis_items
        .iter()
        .map(|i| i.item_name.chars().count())
        .max()
        .unwrap_or(0);
    for item in &report.analysis_items {
        writeln!(
            w,
            "{:<width$}  {:<16}  {}",
            item.item_name,
            or_dash(&item.specification),
            or_dash(&item.result)
        )?;
    }
    if report.analysis_items.is_empty() {
        writeln!(w, "(no analysis items)")?;
    }
    pretty_rule(w)
}
