use crate::domain::{BorrowError, CatalogError, ReturnError};
use crate::ports::StoreError;
use thiserror::Error;

/// 図書館アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum LibraryApplicationError {
    /// 貸出の拒否（利用者・資料が見つからない、上限、貸出中）
    #[error("Borrow rejected: {0}")]
    BorrowRejected(#[from] BorrowError),

    /// 返却の拒否
    #[error("Return rejected: {0}")]
    ReturnRejected(#[from] ReturnError),

    /// カタログ操作のエラー（延滞金、登録など）
    #[error("Catalog error: {0}")]
    CatalogError(#[from] CatalogError),

    /// CatalogStoreのエラー
    #[error("Catalog store error")]
    StoreError(#[source] StoreError),

    /// レポートの生成に失敗
    #[error("Report rendering failed: {0}")]
    ReportError(String),
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, LibraryApplicationError>;
