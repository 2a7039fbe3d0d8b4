mod errors;
mod library_service;
pub mod report;

pub use errors::{LibraryApplicationError, Result};
pub use library_service::{
    ImportSummary, ServiceDependencies, SharedCatalog, borrow_item, catalog_stats, load_catalog,
    pay_fine, recent_transactions, return_item, save_catalog, share, snapshot,
};
pub use report::{ReportFormat, render};
