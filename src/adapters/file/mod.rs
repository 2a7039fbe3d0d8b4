pub mod csv_store;
pub mod json_store;
pub mod text_store;
pub mod transaction_log;

// パブリックに型を再エクスポート
pub use csv_store::CatalogStore as CsvCatalogStore;
pub use json_store::CatalogStore as JsonCatalogStore;
pub use text_store::CatalogStore as TextCatalogStore;
pub use transaction_log::TransactionLog as FileTransactionLog;

use crate::ports::catalog_store::{Result, StoreError};
use std::path::Path;

/// ファイル全体を文字列として読み込む
///
/// UTF-8でない内容は`StoreError::Malformed`になる。
pub(crate) async fn read_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StoreError::from_io(path, e))
}

/// ファイルを書き出す（親ディレクトリがなければ作成する）
pub(crate) async fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::from_io(parent, e))?;
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| StoreError::from_io(path, e))
}
