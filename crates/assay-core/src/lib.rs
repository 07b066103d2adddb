//! assay-core library.
//!
//! Product catalog, report persistence (local JSON file or a remote document
//! store), template merge, and the report session controller.
//!
//! # Conventions
//!
//! - **Errors**: library faults are [`error::AssayError`]; `anyhow` only in
//!   config loading.
//! - **Logging**: `tracing` macros (`info!` for mutations, `debug!` for store
//!   selection, `warn!` for fallbacks).

pub mod catalog;
pub mod config;
pub mod error;
pub mod merge;
pub mod model;
pub mod remote;
pub mod session;
pub mod store;

pub use catalog::{Catalog, Product};
pub use error::{AssayError, ErrorCode, Result};
pub use model::report::{Report, ReportInput, ReportItemResult};
pub use session::{ReportSession, SessionMode, SubmitOutcome};
pub use store::{ReportStore, StoreSelection, select_store};
