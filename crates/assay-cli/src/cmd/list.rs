//! `assay list`: saved reports, newest analysis date first.

use crate::cmd::{StorageOverrides, open_session};
use crate::output::{OutputMode, Renderable, fail, render_list};
use assay_core::Report;
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only reports for this product code.
    #[arg(long)]
    pub code: Option<String>,

    /// Show at most this many reports.
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

/// One listing row.
#[derive(Debug, Serialize)]
pub struct ReportRow {
    pub id: String,
    pub analysis_date: String,
    pub product_code: String,
    pub product_name: String,
    pub analyst_name: String,
    pub items: usize,
    pub updated_at: String,
}

impl From<&Report> for ReportRow {
    fn from(r: &Report) -> Self {
        Self {
            id: r.id.clone(),
            analysis_date: r.analysis_date.clone(),
            product_code: r.product_code.clone(),
            product_name: r.product_name.clone(),
            analyst_name: r.analyst_name.clone(),
            items: r.analysis_items.len(),
            updated_at: r.updated_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        }
    }
}

impl Renderable for ReportRow {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let analyst = if self.analyst_name.is_empty() {
            "-"
        } else {
            self.analyst_name.as_str()
        };
        writeln!(
            w,
            "{}  {:<10} {}  [{}]  {}",
            self.analysis_date, self.product_code, self.product_name, analyst, self.id
        )
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.id,
            self.analysis_date,
            self.product_code,
            self.product_name,
            self.analyst_name,
            self.items
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["id", "date", "code", "product", "analyst", "items"]
    }
}

fn select_rows(reports: &[Report], args: &ListArgs) -> Vec<ReportRow> {
    reports
        .iter()
        .filter(|r| args.code.as_deref().is_none_or(|code| r.product_code == code))
        .take(args.limit.unwrap_or(usize::MAX))
        .map(ReportRow::from)
        .collect()
}

pub fn run_list(
    args: &ListArgs,
    overrides: &StorageOverrides,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let ctx = open_session(overrides, output, project_root)?;
    let reports = ctx.session.reports().map_err(|e| fail(output, e))?;
    let rows = select_rows(&reports, args);

    if rows.is_empty() && output == OutputMode::Pretty {
        println!("No reports yet. Record one with `assay add --product <key>`.");
        return Ok(());
    }
    render_list(&rows, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assay_core::ReportInput;
    use chrono::Utc;

    fn report(id: &str, code: &str, date: &str) -> Report {
        Report::from_input(
            id.to_string(),
            &ReportInput {
                product_code: code.to_string(),
                analysis_date: date.to_string(),
                ..ReportInput::default()
            },
            Utc::now(),
        )
    }

    #[test]
    fn filters_by_code_and_limits() {
        let reports = vec![
            report("a", "APA-100", "2025-03-01"),
            report("b", "BGL-200", "2025-02-01"),
            report("c", "APA-100", "2025-01-01"),
        ];
        let args = ListArgs {
            code: Some("APA-100".into()),
            limit: Some(1),
        };
        let rows = select_rows(&reports, &args);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "a");
    }

    #[test]
    fn text_row_is_tab_separated() {
        let row = ReportRow::from(&report("a", "APA-100", "2025-03-01"));
        let mut buf = Vec::new();
        row.render_table(&mut buf).expect("render");
        let line = String::from_utf8(buf).expect("utf8");
        assert_eq!(line.trim_end().split('\t').count(), ReportRow::table_headers().len());
    }
}
