//! `assay add`: record a new analysis report.

use crate::cmd::{
    StorageOverrides, apply_form_args, open_session, parse_date_arg, parse_result_arg,
};
use crate::output::{OutputMode, fail, render};
use assay_core::SubmitOutcome;
use assay_core::model::report::ReportItemResult;
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Catalog key of the product tested.
    #[arg(short, long)]
    pub product: String,

    /// Analysis date (YYYY-MM-DD). Defaults to today.
    #[arg(short, long, value_parser = parse_date_arg)]
    pub date: Option<NaiveDate>,

    /// Analyst name. Defaults to `analyst` in the user config.
    #[arg(short, long)]
    pub analyst: Option<String>,

    /// Item result as ITEM=VALUE (repeatable).
    #[arg(short, long = "result", value_name = "ITEM=VALUE", value_parser = parse_result_arg)]
    pub results: Vec<(String, String)>,
}

/// JSON output for `assay add` and `assay edit`.
#[derive(Debug, Serialize)]
pub struct SaveOutput {
    pub id: String,
    pub action: &'static str,
    pub product_code: String,
    pub analysis_date: String,
    pub items: Vec<ReportItemResult>,
}

impl SaveOutput {
    pub fn new(
        outcome: &SubmitOutcome,
        product_code: String,
        analysis_date: NaiveDate,
        items: Vec<ReportItemResult>,
    ) -> Self {
        let action = match outcome {
            SubmitOutcome::Created(_) => "created",
            SubmitOutcome::Updated(_) => "updated",
        };
        Self {
            id: outcome.id().to_string(),
            action,
            product_code,
            analysis_date: analysis_date.format("%Y-%m-%d").to_string(),
            items,
        }
    }
}

pub fn render_saved(output: OutputMode, saved: &SaveOutput) -> anyhow::Result<()> {
    render(output, saved, |s, w| {
        writeln!(
            w,
            "✓ {} report {} ({}, {})",
            s.action, s.id, s.product_code, s.analysis_date
        )?;
        let filled = s.items.iter().filter(|i| !i.result.trim().is_empty()).count();
        writeln!(w, "  {filled}/{} item(s) with results", s.items.len())
    })
}

pub fn run_add(
    args: &AddArgs,
    overrides: &StorageOverrides,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let mut ctx = open_session(overrides, output, project_root)?;
    let analyst = args
        .analyst
        .as_deref()
        .or(ctx.config.user.analyst.as_deref())
        .map(str::to_string);

    apply_form_args(
        &mut ctx.session,
        Some(&args.product),
        args.date,
        analyst.as_deref(),
        &args.results,
    )
    .map_err(|e| fail(output, e))?;

    // submit() resets the form.
    let form = ctx.session.form().clone();
    let code = ctx
        .session
        .product()
        .map(|p| p.code.clone())
        .unwrap_or_default();

    let outcome = ctx.session.submit().map_err(|e| fail(output, e))?;
    render_saved(
        output,
        &SaveOutput::new(&outcome, code, form.analysis_date, form.items),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: AddArgs,
    }

    #[test]
    fn add_args_parse_date_and_results() {
        let w = Wrapper::parse_from([
            "test",
            "--product",
            "productA",
            "--date",
            "2025-02-03",
            "-r",
            "PH (3%)=6",
        ]);
        assert_eq!(w.args.date, NaiveDate::from_ymd_opt(2025, 2, 3));
        assert_eq!(w.args.results, [("PH (3%)".to_string(), "6".to_string())]);
        assert!(w.args.analyst.is_none());
    }

    #[test]
    fn add_args_reject_bad_date() {
        assert!(Wrapper::try_parse_from(["test", "-p", "productA", "-d", "yesterday"]).is_err());
    }

    #[test]
    fn save_output_labels_action() {
        let out = SaveOutput::new(
            &SubmitOutcome::Updated("r1".into()),
            "APA-100".into(),
            NaiveDate::from_ymd_opt(2025, 1, 2).expect("date"),
            Vec::new(),
        );
        assert_eq!(out.action, "updated");
        assert_eq!(out.analysis_date, "2025-01-02");
    }
}
