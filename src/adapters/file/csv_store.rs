use super::{read_file, write_file};
use crate::domain::{CatalogSnapshot, ItemRecord, PatronRecord, ValidationError};
use crate::ports::catalog_store::{
    CatalogStore as CatalogStoreTrait, LoadReport, LoadedSnapshot, Result, StoreError,
};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

const ITEMS_FILE: &str = "items.csv";
const PATRONS_FILE: &str = "patrons.csv";

const ITEM_COLUMNS: [&str; 7] = ["id", "title", "creator", "year", "genre", "kind", "available"];
const PATRON_COLUMNS: [&str; 5] = ["id", "name", "email", "borrowed_count", "fine_balance"];

/// 表形式（CSV）のカタログ保存
///
/// ディレクトリ内に`items.csv`と`patrons.csv`の2ファイルを置く。
/// 1行目はヘッダ。列の順序は問わない。
pub struct CatalogStore {
    dir: PathBuf,
}

impl CatalogStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn items_path(&self) -> PathBuf {
        self.dir.join(ITEMS_FILE)
    }

    pub fn patrons_path(&self) -> PathBuf {
        self.dir.join(PATRONS_FILE)
    }
}

fn encode<T: Serialize>(path: &Path, records: &[T]) -> Result<Vec<u8>> {
    let malformed = |reason: String| StoreError::Malformed {
        path: path.to_path_buf(),
        reason,
    };
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record).map_err(|e| malformed(e.to_string()))?;
    }
    writer.into_inner().map_err(|e| malformed(e.to_string()))
}

/// CSVの本文をレコードに変換する
///
/// ヘッダに必須列がなければファイル全体を`Malformed`とする。
/// 各行の変換・検証に失敗した場合はその行だけを読み飛ばす。
fn decode<T, F>(path: &Path, contents: &str, required: &[&str], validate: F) -> Result<LoadReport<T>>
where
    T: DeserializeOwned,
    F: Fn(&T) -> std::result::Result<(), ValidationError>,
{
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| StoreError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?
        .clone();

    let mut report = LoadReport::new();
    if headers.is_empty() {
        return Ok(report);
    }
    if let Some(column) = required.iter().find(|c| !headers.iter().any(|h| h == **c)) {
        return Err(StoreError::Malformed {
            path: path.to_path_buf(),
            reason: format!("missing column `{}` in header", column),
        });
    }

    for (index, result) in reader.records().enumerate() {
        // ヘッダが1行目
        let fallback_line = index as u64 + 2;
        let parsed = result.map_err(|e| (fallback_line, e.to_string())).and_then(|row| {
            let line = row.position().map_or(fallback_line, |p| p.line());
            row.deserialize::<T>(Some(&headers))
                .map_err(|e| e.to_string())
                .and_then(|record| validate(&record).map(|()| record).map_err(|e| e.to_string()))
                .map_err(|reason| (line, reason))
        });
        match parsed {
            Ok(record) => report.accept(record),
            Err((line, reason)) => {
                let location = format!("row {}", line);
                tracing::warn!(path = %path.display(), %location, %reason, "skipping malformed row");
                report.reject(location, reason);
            }
        }
    }
    Ok(report)
}

#[async_trait]
impl CatalogStoreTrait for CatalogStore {
    async fn save(&self, snapshot: &CatalogSnapshot) -> Result<()> {
        let items_path = self.items_path();
        let patrons_path = self.patrons_path();

        write_file(&items_path, encode(&items_path, &snapshot.items)?).await?;
        write_file(&patrons_path, encode(&patrons_path, &snapshot.patrons)?).await?;

        tracing::info!(
            dir = %self.dir.display(),
            items = snapshot.items.len(),
            patrons = snapshot.patrons.len(),
            "saved catalog as CSV"
        );
        Ok(())
    }

    async fn load(&self) -> Result<LoadedSnapshot> {
        let items_path = self.items_path();
        let patrons_path = self.patrons_path();

        let items_csv = read_file(&items_path).await?;
        let patrons_csv = read_file(&patrons_path).await?;

        let items = decode(&items_path, &items_csv, &ITEM_COLUMNS, ItemRecord::validate)?;
        let patrons = decode(
            &patrons_path,
            &patrons_csv,
            &PATRON_COLUMNS,
            PatronRecord::validate,
        )?;

        tracing::info!(
            dir = %self.dir.display(),
            items = items.accepted_count(),
            patrons = patrons.accepted_count(),
            skipped = items.rejected_count() + patrons.rejected_count(),
            "loaded catalog from CSV"
        );

        // CSVは図書館名を持たない
        Ok(LoadedSnapshot {
            library_name: None,
            items,
            patrons,
        })
    }
}
