use super::{read_file, write_file};
use crate::domain::{CatalogSnapshot, ItemRecord, PatronRecord, ValidationError};
use crate::ports::catalog_store::{
    CatalogStore as CatalogStoreTrait, LoadReport, LoadedSnapshot, Result, StoreError,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// 構造化形式（JSON）のカタログ保存
///
/// スナップショットをそのまま1つのJSONドキュメントとして書き出す。
/// 読み込みは要素ごとに検証し、壊れた要素だけを読み飛ばす。
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// トップレベルの配列を取り出す
    fn section<'a>(&self, document: &'a Value, key: &str) -> Result<&'a [Value]> {
        match document.get(key) {
            Some(Value::Array(values)) => Ok(values.as_slice()),
            Some(_) => Err(self.malformed(format!("`{}` is not an array", key))),
            None => Err(self.malformed(format!("missing `{}` section", key))),
        }
    }

    fn malformed(&self, reason: impl ToString) -> StoreError {
        StoreError::Malformed {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

/// 配列の各要素をレコードに変換する
///
/// 変換または検証に失敗した要素は`rejected`に入る。
fn collect_records<T, F>(section: &str, values: &[Value], validate: F) -> LoadReport<T>
where
    T: DeserializeOwned,
    F: Fn(&T) -> std::result::Result<(), ValidationError>,
{
    let mut report = LoadReport::new();
    for (index, value) in values.iter().enumerate() {
        let location = format!("{}[{}]", section, index);
        let parsed = serde_json::from_value::<T>(value.clone())
            .map_err(|e| e.to_string())
            .and_then(|record| validate(&record).map(|()| record).map_err(|e| e.to_string()));
        match parsed {
            Ok(record) => report.accept(record),
            Err(reason) => {
                tracing::warn!(%location, %reason, "skipping malformed record");
                report.reject(location, reason);
            }
        }
    }
    report
}

#[async_trait]
impl CatalogStoreTrait for CatalogStore {
    async fn save(&self, snapshot: &CatalogSnapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot).map_err(|e| self.malformed(e))?;
        write_file(&self.path, json).await?;

        tracing::info!(
            path = %self.path.display(),
            items = snapshot.items.len(),
            patrons = snapshot.patrons.len(),
            "saved catalog as JSON"
        );
        Ok(())
    }

    async fn load(&self) -> Result<LoadedSnapshot> {
        let contents = read_file(&self.path).await?;
        let document: Value = serde_json::from_str(&contents).map_err(|e| self.malformed(e))?;

        let items = collect_records(
            "items",
            self.section(&document, "items")?,
            ItemRecord::validate,
        );
        let patrons = collect_records(
            "patrons",
            self.section(&document, "patrons")?,
            PatronRecord::validate,
        );
        let library_name = document
            .get("library_name")
            .and_then(Value::as_str)
            .map(str::to_string);

        tracing::info!(
            path = %self.path.display(),
            items = items.accepted_count(),
            patrons = patrons.accepted_count(),
            skipped = items.rejected_count() + patrons.rejected_count(),
            "loaded catalog from JSON"
        );

        Ok(LoadedSnapshot {
            library_name,
            items,
            patrons,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Genre, ItemId, ItemKind, PatronId, PremiumTier};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn snapshot() -> CatalogSnapshot {
        CatalogSnapshot {
            library_name: "Python Learning Library".to_string(),
            generated_at: Utc::now(),
            items: vec![ItemRecord {
                id: ItemId::new(102).unwrap(),
                title: "Web Development".to_string(),
                creator: "Jane Smith".to_string(),
                year: 2024,
                genre: Genre::NonFiction,
                kind: ItemKind::Digital,
                available: true,
                holder_id: None,
                file_format: Some("PDF".to_string()),
                file_size_mb: Some(5.2),
                download_count: Some(3),
            }],
            patrons: vec![PatronRecord {
                id: PatronId::new(1002).unwrap(),
                name: "Bob".to_string(),
                email: "bob@email.com".to_string(),
                tier: Some(PremiumTier::Gold),
                borrowed_count: 0,
                fine_balance: dec!(2.50),
            }],
        }
    }

    #[tokio::test]
    async fn test_save_then_load_preserves_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path().join("library.json"));
        let snapshot = snapshot();

        store.save(&snapshot).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded.library_name.as_deref(), Some("Python Learning Library"));
        assert_eq!(loaded.items.accepted, snapshot.items);
        assert_eq!(loaded.patrons.accepted, snapshot.patrons);
        assert!(loaded.items.rejected.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_elements_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.json");
        let json = r#"{
            "library_name": "Test",
            "items": [
                {"id": 1, "title": "Ok", "creator": "A", "year": 2001, "genre": "Fiction",
                 "kind": "physical", "available": true},
                {"id": 2, "title": "No year", "creator": "B", "genre": "Fiction",
                 "kind": "physical", "available": true},
                {"id": 3, "title": "Bad genre", "creator": "C", "year": 2001, "genre": "Cooking",
                 "kind": "physical", "available": true}
            ],
            "patrons": [
                {"id": 7, "name": "P", "email": "p@x.io", "borrowed_count": 0, "fine_balance": "0"},
                {"id": -1, "name": "Q", "email": "q@x.io", "borrowed_count": 0, "fine_balance": "0"}
            ]
        }"#;
        tokio::fs::write(&path, json).await.unwrap();

        let loaded = CatalogStore::new(&path).load().await.unwrap();

        assert_eq!(loaded.items.accepted_count(), 1);
        assert_eq!(loaded.items.rejected_count(), 2);
        assert_eq!(loaded.items.rejected[0].location, "items[1]");
        assert_eq!(loaded.patrons.accepted_count(), 1);
        assert_eq!(loaded.patrons.rejected[0].location, "patrons[1]");
    }

    #[tokio::test]
    async fn test_unparseable_document_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let result = CatalogStore::new(&path).load().await;

        assert!(matches!(result, Err(StoreError::Malformed { .. })));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = CatalogStore::new(dir.path().join("absent.json")).load().await;

        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }
}
