//! `assay edit`: change a saved report.
//!
//! Loads the report into an edit form (results projected onto the product's
//! current items), applies the given changes, and saves it back under the
//! same id.

use crate::cmd::add::{SaveOutput, render_saved};
use crate::cmd::{
    StorageOverrides, apply_form_args, open_session, parse_date_arg, parse_result_arg,
};
use crate::output::{OutputMode, fail};
use chrono::NaiveDate;
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Report id.
    pub id: String,

    /// Move the report to another catalog product.
    #[arg(short, long)]
    pub product: Option<String>,

    /// New analysis date (YYYY-MM-DD).
    #[arg(short, long, value_parser = parse_date_arg)]
    pub date: Option<NaiveDate>,

    /// New analyst name.
    #[arg(short, long)]
    pub analyst: Option<String>,

    /// Item result as ITEM=VALUE (repeatable).
    #[arg(short, long = "result", value_name = "ITEM=VALUE", value_parser = parse_result_arg)]
    pub results: Vec<(String, String)>,
}

pub fn run_edit(
    args: &EditArgs,
    overrides: &StorageOverrides,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let mut ctx = open_session(overrides, output, project_root)?;
    let report = ctx
        .session
        .report(args.id.trim())
        .map_err(|e| fail(output, e))?;

    ctx.session.start_edit(&report);
    if ctx.session.product().is_none() && args.product.is_none() {
        tracing::warn!(
            code = %report.product_code,
            "product code is not in the catalog; pass --product to re-assign it"
        );
    }

    apply_form_args(
        &mut ctx.session,
        args.product.as_deref(),
        args.date,
        args.analyst.as_deref(),
        &args.results,
    )
    .map_err(|e| fail(output, e))?;

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
        args: EditArgs,
    }

    #[test]
    fn edit_args_are_all_optional_besides_id() {
        let w = Wrapper::parse_from(["test", "r1"]);
        assert_eq!(w.args.id, "r1");
        assert!(w.args.product.is_none());
        assert!(w.args.date.is_none());
        assert!(w.args.results.is_empty());
    }

    #[test]
    fn edit_args_accept_multiple_results() {
        let w = Wrapper::parse_from(["test", "r1", "-r", "수분(%)=4", "-r", "성상=적합"]);
        assert_eq!(w.args.results.len(), 2);
        assert_eq!(w.args.results[1].1, "적합");
    }
}
