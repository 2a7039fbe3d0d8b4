pub mod catalog_store;
pub mod transaction_log;

pub use catalog_store::{
    CatalogStore, LoadReport, LoadedSnapshot, RejectedRecord, StoreError,
};
pub use transaction_log::{LogEntry, TransactionKind, TransactionLog};
