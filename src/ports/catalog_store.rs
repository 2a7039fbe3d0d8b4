use crate::domain::{CatalogSnapshot, ItemRecord, PatronRecord};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 永続化のエラー
///
/// ファイル単位の失敗のみ。レコード単位の不正は`LoadReport`で報告する。
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("malformed data in {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// I/Oエラーを種類ごとに振り分ける
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound { path },
            io::ErrorKind::PermissionDenied => StoreError::PermissionDenied { path },
            io::ErrorKind::InvalidData => StoreError::Malformed {
                path,
                reason: source.to_string(),
            },
            _ => StoreError::Io { path, source },
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// 読み飛ばしたレコード
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    /// 例: "row 3", "record 2", "line 14"
    pub location: String,
    pub reason: String,
}

/// レコード単位の読み込み結果
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport<T> {
    pub accepted: Vec<T>,
    pub rejected: Vec<RejectedRecord>,
}

impl<T> LoadReport<T> {
    pub fn new() -> Self {
        Self {
            accepted: Vec::new(),
            rejected: Vec::new(),
        }
    }

    pub fn accept(&mut self, record: T) {
        self.accepted.push(record);
    }

    pub fn reject(&mut self, location: impl Into<String>, reason: impl ToString) {
        self.rejected.push(RejectedRecord {
            location: location.into(),
            reason: reason.to_string(),
        });
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }
}

impl<T> Default for LoadReport<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// 読み込んだカタログ
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSnapshot {
    pub library_name: Option<String>,
    pub items: LoadReport<ItemRecord>,
    pub patrons: LoadReport<PatronRecord>,
}

/// カタログ保存ポート
///
/// テキスト・表形式・構造化形式の各アダプタが実装する。
/// 保存はスナップショットを読むだけ、読み込みは新しいレコードを返すだけで、
/// 稼働中のカタログには触れない。
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// スナップショットを書き出す（既存の内容は置き換える）
    async fn save(&self, snapshot: &CatalogSnapshot) -> Result<()>;

    /// 読み込む
    ///
    /// 不正なレコードは読み飛ばして`LoadReport::rejected`に記録する。
    /// ファイルが存在しない・読めない・全体が壊れている場合のみエラー。
    async fn load(&self) -> Result<LoadedSnapshot>;
}
