//! Report session controller.
//!
//! A session owns the catalog, the store picked for it, and one form. The
//! form is either creating a new report or editing a saved one:
//!
//! ```text
//!            start_edit(report)
//! Creating ─────────────────────▶ Editing { report_id }
//!    ▲                                 │
//!    └──── submit() ok / cancel() ─────┘
//! ```
//!
//! Every fault is returned to the caller with state and form untouched, so a
//! failed save never loses what the analyst typed. Deletion goes through a
//! separate two-step gate (`request_delete` / `confirm_delete`).

use chrono::{Local, NaiveDate};
use tracing::info;

use crate::catalog::{Catalog, Product};
use crate::error::{AssayError, Result};
use crate::merge::merge;
use crate::model::report::{Report, ReportInput, ReportItemResult, parse_analysis_date};
use crate::store::ReportStore;

/// Whether submit creates a new report or updates a saved one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    Creating,
    Editing { report_id: String },
}

/// In-progress form contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportForm {
    /// Catalog key; empty when no product is selected.
    pub product_key: String,
    pub analysis_date: NaiveDate,
    pub analyst_name: String,
    pub items: Vec<ReportItemResult>,
}

impl ReportForm {
    fn blank(today: NaiveDate) -> Self {
        Self {
            product_key: String::new(),
            analysis_date: today,
            analyst_name: String::new(),
            items: Vec::new(),
        }
    }
}

/// Result of a successful [`ReportSession::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(String),
    Updated(String),
}

impl SubmitOutcome {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Created(id) | Self::Updated(id) => id,
        }
    }
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

pub struct ReportSession {
    catalog: Catalog,
    store: Box<dyn ReportStore>,
    mode: SessionMode,
    form: ReportForm,
    pending_delete: Option<String>,
    today: fn() -> NaiveDate,
}

impl ReportSession {
    #[must_use]
    pub fn new(catalog: Catalog, store: Box<dyn ReportStore>) -> Self {
        Self::with_today(catalog, store, local_today)
    }

    /// Like [`ReportSession::new`] with a fixed source for "today".
    #[must_use]
    pub fn with_today(
        catalog: Catalog,
        store: Box<dyn ReportStore>,
        today: fn() -> NaiveDate,
    ) -> Self {
        Self {
            catalog,
            store,
            mode: SessionMode::Creating,
            form: ReportForm::blank(today()),
            pending_delete: None,
            today,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> &SessionMode {
        &self.mode
    }

    #[must_use]
    pub const fn form(&self) -> &ReportForm {
        &self.form
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    /// The selected product, if any.
    #[must_use]
    pub fn product(&self) -> Option<&Product> {
        self.catalog.get(&self.form.product_key)
    }

    /// Label of the store this session writes to.
    #[must_use]
    pub fn store_label(&self) -> String {
        self.store.describe()
    }

    /// Saved reports, newest first.
    ///
    /// # Errors
    ///
    /// Whatever the store reports.
    pub fn reports(&self) -> Result<Vec<Report>> {
        self.store.list()
    }

    /// One saved report.
    ///
    /// # Errors
    ///
    /// [`AssayError::NotFound`] for an unknown id, or any store fault.
    pub fn report(&self, id: &str) -> Result<Report> {
        self.store.get(id)
    }

    /// Switch the form to another product, carrying over results whose item
    /// names still exist. An empty key clears the selection.
    ///
    /// # Errors
    ///
    /// [`AssayError::ValidationFault`] for a key the catalog does not know.
    pub fn select_product(&mut self, key: &str) -> Result<()> {
        let key = key.trim();
        if key.is_empty() {
            self.form.product_key.clear();
            self.form.items.clear();
            return Ok(());
        }
        if key == self.form.product_key {
            return Ok(());
        }
        if self.catalog.get(key).is_none() {
            return Err(AssayError::validation(format!("unknown product '{key}'")));
        }

        self.form.items = merge(&self.catalog, key, &self.form.items);
        self.form.product_key = key.to_string();
        Ok(())
    }

    pub const fn set_analysis_date(&mut self, date: NaiveDate) {
        self.form.analysis_date = date;
    }

    pub fn set_analyst_name(&mut self, name: impl Into<String>) {
        self.form.analyst_name = name.into();
    }

    /// Record the result for one item of the selected product.
    ///
    /// # Errors
    ///
    /// [`AssayError::ValidationFault`] when the form has no such item.
    pub fn set_result(&mut self, item_name: &str, value: impl Into<String>) -> Result<()> {
        let item = self
            .form
            .items
            .iter_mut()
            .find(|item| item.item_name == item_name)
            .ok_or_else(|| {
                AssayError::validation(format!("the form has no analysis item '{item_name}'"))
            })?;
        item.result = value.into();
        Ok(())
    }

    /// Save the form. On success the session is back to a blank create form.
    ///
    /// # Errors
    ///
    /// [`AssayError::ValidationFault`] with no product selected (the store is
    /// not called), or any store fault. Either way the form is kept.
    pub fn submit(&mut self) -> Result<SubmitOutcome> {
        let input = self.payload()?;

        let outcome = match &self.mode {
            SessionMode::Creating => SubmitOutcome::Created(self.store.add(&input)?),
            SessionMode::Editing { report_id } => {
                self.store.update(report_id, &input)?;
                SubmitOutcome::Updated(report_id.clone())
            }
        };

        info!(id = outcome.id(), product = %input.product_code, "report saved");
        self.reset();
        Ok(outcome)
    }

    fn payload(&self) -> Result<ReportInput> {
        let product = self
            .product()
            .ok_or_else(|| AssayError::validation("select a product before saving"))?;

        Ok(ReportInput {
            product_name: product.name.clone(),
            product_code: product.code.clone(),
            analysis_date: self.form.analysis_date.format("%Y-%m-%d").to_string(),
            analyst_name: self.form.analyst_name.trim().to_string(),
            analysis_items: self.form.items.clone(),
        })
    }

    /// Load a saved report into the form for editing.
    ///
    /// If the report's product code is no longer in the catalog its items are
    /// kept exactly as saved and no product is selected.
    pub fn start_edit(&mut self, report: &Report) {
        let analysis_date = parse_analysis_date(&report.analysis_date)
            .map_or_else(self.today, |dt| dt.date());

        let (product_key, items) = match self.catalog.find_by_code(&report.product_code) {
            Some(product) => (
                product.key.clone(),
                merge(&self.catalog, &product.key, &report.analysis_items),
            ),
            None => (String::new(), report.analysis_items.clone()),
        };

        self.form = ReportForm {
            product_key,
            analysis_date,
            analyst_name: report.analyst_name.clone(),
            items,
        };
        self.mode = SessionMode::Editing {
            report_id: report.id.clone(),
        };
    }

    /// Drop the form and go back to creating.
    pub fn cancel(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.mode = SessionMode::Creating;
        self.form = ReportForm::blank((self.today)());
    }

    /// Mark `id` for deletion; nothing is removed until [`Self::confirm_delete`].
    pub fn request_delete(&mut self, id: impl Into<String>) {
        self.pending_delete = Some(id.into());
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Delete the report marked by [`Self::request_delete`].
    ///
    /// The mark is cleared whether or not the delete succeeds.
    ///
    /// # Errors
    ///
    /// [`AssayError::ValidationFault`] when nothing is marked, or the store's
    /// fault.
    pub fn confirm_delete(&mut self) -> Result<String> {
        let id = self
            .pending_delete
            .take()
            .ok_or_else(|| AssayError::validation("no report is awaiting delete confirmation"))?;
        self.store.delete(&id)?;
        info!(id = %id, "report deleted");
        Ok(id)
    }
}
