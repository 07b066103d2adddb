#![forbid(unsafe_code)]

mod cmd;
mod output;

use assay_core::config::load_user_config;
use clap::{Parser, Subcommand};
use output::{OutputMode, resolve_output_mode};
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "assay: product lab-analysis reports",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Output format: pretty, text, or json.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Store reports in the remote document store.
    #[arg(long, global = true)]
    remote: bool,

    /// Application id that scopes the remote collection.
    #[arg(long, global = true, value_name = "ID")]
    app_id: Option<String>,

    /// User id that scopes the remote collection.
    #[arg(long, global = true, value_name = "ID")]
    user_id: Option<String>,

    /// Local JSON file holding the reports.
    #[arg(long, global = true, value_name = "PATH")]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self, user_pref: Option<&str>) -> OutputMode {
        resolve_output_mode(self.format, self.json, user_pref)
    }

    fn overrides(&self) -> cmd::StorageOverrides {
        cmd::StorageOverrides {
            remote: self.remote,
            app_id: self.app_id.clone(),
            user_id: self.user_id.clone(),
            data: self.data.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Catalog",
        about = "List catalog products",
        after_help = "EXAMPLES:\n    # Show every product\n    assay products\n\n    # Emit machine-readable output\n    assay products --json"
    )]
    Products,

    #[command(
        next_help_heading = "Catalog",
        about = "Show one product's analysis items",
        after_help = "EXAMPLES:\n    # Show the items tested for productA\n    assay product productA"
    )]
    Product(cmd::products::ProductArgs),

    #[command(
        next_help_heading = "Reports",
        about = "Record a new analysis report",
        long_about = "Record a new analysis report for a catalog product. Items not given \
                      with --result are saved with an empty result.",
        after_help = "EXAMPLES:\n    # Record moisture and pH for productA\n    assay add --product productA --analyst kim \\\n        --result '수분(%)=5' --result PH=6.5\n\n    # Backdate a report\n    assay add --product productB --date 2025-01-31"
    )]
    Add(cmd::add::AddArgs),

    #[command(
        next_help_heading = "Reports",
        about = "List saved reports",
        long_about = "List saved reports, newest analysis date first.",
        after_help = "EXAMPLES:\n    # List reports\n    assay list\n\n    # Only one product\n    assay list --code APA-100\n\n    # Emit machine-readable output\n    assay list --json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Reports",
        about = "Show one report",
        after_help = "EXAMPLES:\n    # Show a report\n    assay show 3f0c9a2e-...\n\n    # Emit machine-readable output\n    assay show 3f0c9a2e-... --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Reports",
        about = "Edit a saved report",
        long_about = "Load a saved report, apply the given changes, and save it back. \
                      Results are projected onto the product's current items first.",
        after_help = "EXAMPLES:\n    # Correct one result\n    assay edit 3f0c9a2e-... --result PH=6.8\n\n    # Move a report to another product\n    assay edit 3f0c9a2e-... --product productB"
    )]
    Edit(cmd::edit::EditArgs),

    #[command(
        next_help_heading = "Reports",
        about = "Delete a report",
        after_help = "EXAMPLES:\n    # Delete after a confirmation prompt\n    assay delete 3f0c9a2e-...\n\n    # Skip the prompt\n    assay delete 3f0c9a2e-... --force"
    )]
    Delete(cmd::delete::DeleteArgs),

    #[command(
        next_help_heading = "Project",
        about = "Show the active store and configuration",
        after_help = "EXAMPLES:\n    # Which backend is in use?\n    assay status\n\n    # Try the remote store\n    assay status --remote --user-id kim"
    )]
    Status,
}

/// Default log filter when `ASSAY_LOG` is unset.
const fn default_log_filter(verbose: bool, debug_env: bool) -> &'static str {
    if verbose || debug_env {
        "assay=debug,info"
    } else {
        "assay=info,warn"
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("ASSAY_LOG").unwrap_or_else(|_| {
        EnvFilter::new(default_log_filter(verbose, env::var("DEBUG").is_ok()))
    });

    let format = env::var("ASSAY_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if cli.verbose {
        debug!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    // A broken user config is reported with its code once a command loads it.
    let user_output = match load_user_config() {
        Ok(user) => user.output,
        Err(err) => {
            debug!(error = %err, "user config unreadable; ignoring output preference");
            None
        }
    };
    let output = cli.output_mode(user_output.as_deref());

    match cli.command {
        Commands::Products => cmd::products::run_products(output, &project_root),
        Commands::Product(ref args) => cmd::products::run_product(args, output, &project_root),
        Commands::Add(ref args) => {
            cmd::add::run_add(args, &cli.overrides(), output, &project_root)
        }
        Commands::List(ref args) => {
            cmd::list::run_list(args, &cli.overrides(), output, &project_root)
        }
        Commands::Show(ref args) => {
            cmd::show::run_show(args, &cli.overrides(), output, &project_root)
        }
        Commands::Edit(ref args) => {
            cmd::edit::run_edit(args, &cli.overrides(), output, &project_root)
        }
        Commands::Delete(ref args) => {
            cmd::delete::run_delete(args, &cli.overrides(), output, &project_root)
        }
        Commands::Status => cmd::status::run_status(&cli.overrides(), output, &project_root),
    }
}
