//! `assay delete`: remove a saved report.
//!
//! Deletion is irreversible, so it asks for confirmation on a terminal
//! unless `--force` is given.

use crate::cmd::{StorageOverrides, open_session};
use crate::output::{OutputMode, fail, render};
use clap::Args;
use serde::Serialize;
use std::io::{IsTerminal, Write};
use std::path::Path;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Report id.
    pub id: String,

    /// Skip interactive confirmation prompt.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct DeleteOutput {
    id: String,
    deleted: bool,
}

fn confirm_delete(id: &str, label: &str) -> anyhow::Result<bool> {
    if !std::io::stdin().is_terminal() || !std::io::stdout().is_terminal() {
        return Ok(true);
    }

    eprint!("Delete report {id} ({label})? [y/N] ");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    let answer = input.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

pub fn run_delete(
    args: &DeleteArgs,
    overrides: &StorageOverrides,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let mut ctx = open_session(overrides, output, project_root)?;
    let id = args.id.trim();

    ctx.session.request_delete(id);
    if !args.force {
        // Prompt label only; unknown ids are still passed to the store.
        let label = ctx.session.report(id).map_or_else(
            |_| "unknown report".to_string(),
            |r| format!("{} {}", r.product_code, r.analysis_date),
        );
        if !confirm_delete(id, &label)? {
            ctx.session.cancel_delete();
            anyhow::bail!("deletion of '{id}' cancelled");
        }
    }

    let deleted = ctx.session.confirm_delete().map_err(|e| fail(output, e))?;
    render(
        output,
        &DeleteOutput {
            id: deleted,
            deleted: true,
        },
        |d, w| writeln!(w, "✓ deleted report {}", d.id),
    )
}
