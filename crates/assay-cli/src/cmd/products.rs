//! `assay products` / `assay product <key>`: browse the catalog.

use crate::cmd::{StorageOverrides, load_catalog, load_config};
use crate::output::{
    OutputMode, Renderable, pretty_kv, pretty_rule, pretty_section, render_list, render_mode,
};
use assay_core::AssayError;
use assay_core::catalog::{AnalysisItemTemplate, Product};
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

#[derive(Args, Debug)]
pub struct ProductArgs {
    /// Catalog key, e.g. `productA`.
    pub key: String,
}

#[derive(Debug, Serialize)]
struct ProductRow {
    key: String,
    code: String,
    name: String,
    items: usize,
}

impl From<&Product> for ProductRow {
    fn from(p: &Product) -> Self {
        Self {
            key: p.key.clone(),
            code: p.code.clone(),
            name: p.name.clone(),
            items: p.analysis_items.len(),
        }
    }
}

impl Renderable for ProductRow {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{:<12} {:<10} {} ({} items)",
            self.key, self.code, self.name, self.items
        )
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}\t{}\t{}\t{}", self.key, self.code, self.name, self.items)
    }

    fn table_headers() -> &'static [&'static str] {
        &["key", "code", "name", "items"]
    }
}

pub fn run_products(output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let config = load_config(&StorageOverrides::default(), output, project_root)?;
    let catalog = load_catalog(&config, output, project_root)?;
    let rows: Vec<ProductRow> = catalog.list_all().iter().map(ProductRow::from).collect();
    render_list(&rows, output)
}

pub fn run_product(
    args: &ProductArgs,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let config = load_config(&StorageOverrides::default(), output, project_root)?;
    let catalog = load_catalog(&config, output, project_root)?;
    let product = catalog.get(args.key.trim()).ok_or_else(|| {
        crate::output::fail(
            output,
            AssayError::validation(format!("unknown product '{}'", args.key)),
        )
    })?;

    render_mode(output, product, render_product_text, render_product_human)
}

fn render_product_text(product: &Product, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{}\t{}\t{}", product.key, product.code, product.name)?;
    for item in &product.analysis_items {
        writeln!(w, "{}\t{}", item.item_name, item.specification)?;
    }
    Ok(())
}

fn render_product_human(product: &Product, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &product.label())?;
    pretty_kv(w, "Key", &product.key)?;
    pretty_kv(w, "Items", product.analysis_items.len().to_string())?;
    pretty_rule(w)?;
    let width = name_width(&product.analysis_items);
    for item in &product.analysis_items {
        writeln!(w, "{:<width$}  {}", item.item_name, spec_or_dash(&item.specification))?;
    }
    Ok(())
}

fn name_width(items: &[AnalysisItemTemplate]) -> usize {
    items
        .iter()
        .map(|i| i.item_name.chars().count())
        .max()
        .unwrap_or(0)
}

fn spec_or_dash(spec: &str) -> &str {
    if spec.trim().is_empty() { "-" } else { spec }
}
