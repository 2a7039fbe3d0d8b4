use super::{read_file, write_file};
use crate::domain::{CatalogSnapshot, ItemKind, ItemRecord, PatronRecord};
use crate::ports::catalog_store::{
    CatalogStore as CatalogStoreTrait, LoadReport, LoadedSnapshot, Result, StoreError,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::{Display, Write as _};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const RULE: &str = "==================================================";
const SEPARATOR: &str = "--------------------------------------------------";

/// 人が読むためのテキスト形式のカタログ保存
///
/// ```text
/// === Python Learning Library Data ===
/// Generated: 2026-10-19 09:30:00
/// ==================================================
///
/// ITEMS:
/// --------------------------------------------------
/// ID: 101
/// Title: Python Programming
/// ...
/// --------------------------------------------------
///
/// PATRONS:
/// --------------------------------------------------
/// ID: 1001
/// ...
/// ```
///
/// 区切り線で囲まれた`Key: value`の並びが1レコード。
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
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Items,
    Patrons,
}

/// 1レコード分の`Key: value`
struct Block {
    start_line: usize,
    fields: HashMap<String, String>,
    /// キーと値の形になっていない行
    stray_line: Option<usize>,
}

impl Block {
    fn new(start_line: usize) -> Self {
        Self {
            start_line,
            fields: HashMap::new(),
            stray_line: None,
        }
    }

    fn required<T>(&self, key: &str) -> std::result::Result<T, String>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self
            .fields
            .get(key)
            .ok_or_else(|| format!("missing field `{}`", key))?;
        raw.parse()
            .map_err(|e| format!("invalid `{}` value {:?}: {}", key, raw, e))
    }

    fn optional<T>(&self, key: &str) -> std::result::Result<Option<T>, String>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.fields.get(key) {
            None => Ok(None),
            Some(_) => self.required(key).map(Some),
        }
    }

    fn text(&self, key: &str) -> std::result::Result<String, String> {
        self.fields
            .get(key)
            .cloned()
            .ok_or_else(|| format!("missing field `{}`", key))
    }

    fn check_stray(&self) -> std::result::Result<(), String> {
        match self.stray_line {
            Some(line) => Err(format!("line {} is not a `Key: value` pair", line)),
            None => Ok(()),
        }
    }

    fn to_item(&self) -> std::result::Result<ItemRecord, String> {
        self.check_stray()?;
        let record = ItemRecord {
            id: self.required("ID")?,
            title: self.text("Title")?,
            creator: self.text("Creator")?,
            year: self.required("Year")?,
            genre: self.required("Genre")?,
            kind: self.required::<ItemKind>("Kind")?,
            available: self.required("Available")?,
            holder_id: self.optional("Holder")?,
            file_format: self.optional("File Format")?,
            file_size_mb: self.optional("File Size MB")?,
            download_count: self.optional("Downloads")?,
        };
        record.validate().map_err(|e| e.to_string())?;
        Ok(record)
    }

    fn to_patron(&self) -> std::result::Result<PatronRecord, String> {
        self.check_stray()?;
        let record = PatronRecord {
            id: self.required("ID")?,
            name: self.text("Name")?,
            email: self.text("Email")?,
            tier: self.optional("Tier")?,
            borrowed_count: self.required("Borrowed Items")?,
            fine_balance: self.required("Fine")?,
        };
        record.validate().map_err(|e| e.to_string())?;
        Ok(record)
    }
}

fn render(snapshot: &CatalogSnapshot) -> String {
    let mut out = String::new();
    // Stringへの書き込みは失敗しない
    let _ = writeln!(out, "=== {} Data ===", snapshot.library_name);
    let _ = writeln!(
        out,
        "Generated: {}",
        snapshot.generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(out, "{}\n", RULE);

    let _ = writeln!(out, "ITEMS:\n{}", SEPARATOR);
    for item in &snapshot.items {
        let _ = writeln!(out, "ID: {}", item.id);
        let _ = writeln!(out, "Title: {}", item.title);
        let _ = writeln!(out, "Creator: {}", item.creator);
        let _ = writeln!(out, "Year: {}", item.year);
        let _ = writeln!(out, "Genre: {}", item.genre);
        let _ = writeln!(out, "Kind: {}", item.kind.as_str());
        let _ = writeln!(out, "Available: {}", item.available);
        if let Some(holder) = item.holder_id {
            let _ = writeln!(out, "Holder: {}", holder);
        }
        if let Some(format) = &item.file_format {
            let _ = writeln!(out, "File Format: {}", format);
        }
        if let Some(size) = item.file_size_mb {
            let _ = writeln!(out, "File Size MB: {}", size);
        }
        if let Some(downloads) = item.download_count {
            let _ = writeln!(out, "Downloads: {}", downloads);
        }
        let _ = writeln!(out, "{}", SEPARATOR);
    }

    let _ = writeln!(out, "\nPATRONS:\n{}", SEPARATOR);
    for patron in &snapshot.patrons {
        let _ = writeln!(out, "ID: {}", patron.id);
        let _ = writeln!(out, "Name: {}", patron.name);
        let _ = writeln!(out, "Email: {}", patron.email);
        if let Some(tier) = patron.tier {
            let _ = writeln!(out, "Tier: {}", tier);
        }
        let _ = writeln!(out, "Borrowed Items: {}", patron.borrowed_count);
        let _ = writeln!(out, "Fine: {}", patron.fine_balance);
        let _ = writeln!(out, "{}", SEPARATOR);
    }
    out
}

/// 区切り線だけの行
fn is_rule(line: &str) -> bool {
    !line.is_empty() && (line.chars().all(|c| c == '-') || line.chars().all(|c| c == '='))
}

struct Parsed {
    library_name: Option<String>,
    items: LoadReport<ItemRecord>,
    patrons: LoadReport<PatronRecord>,
}

impl Parsed {
    fn finish_block(&mut self, section: Section, block: Block) {
        if block.fields.is_empty() && block.stray_line.is_none() {
            return;
        }
        let location = format!("line {}", block.start_line);
        let outcome = match section {
            Section::Items => block.to_item().map(|r| self.items.accept(r)),
            Section::Patrons => block.to_patron().map(|r| self.patrons.accept(r)),
            // 見出しより前の内容は無視する
            Section::Preamble => Ok(()),
        };
        if let Err(reason) = outcome {
            tracing::warn!(%location, %reason, "skipping malformed record");
            match section {
                Section::Items => self.items.reject(location, reason),
                Section::Patrons => self.patrons.reject(location, reason),
                Section::Preamble => {}
            }
        }
    }
}

fn parse(contents: &str) -> Parsed {
    let mut parsed = Parsed {
        library_name: None,
        items: LoadReport::new(),
        patrons: LoadReport::new(),
    };
    let mut section = Section::Preamble;
    let mut block: Option<Block> = None;

    for (index, raw_line) in contents.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();

        if line.is_empty() {
            continue;
        }
        if let Some(name) = line
            .strip_prefix("=== ")
            .and_then(|rest| rest.strip_suffix(" ==="))
        {
            parsed.library_name = Some(name.trim_end_matches(" Data").to_string());
            continue;
        }
        if is_rule(line) || line == "ITEMS:" || line == "PATRONS:" {
            if let Some(done) = block.take() {
                parsed.finish_block(section, done);
            }
            match line {
                "ITEMS:" => section = Section::Items,
                "PATRONS:" => section = Section::Patrons,
                _ => {}
            }
            continue;
        }
        if section == Section::Preamble {
            continue;
        }

        let current = block.get_or_insert_with(|| Block::new(line_no));
        match line.split_once(':') {
            Some((key, value)) => {
                current
                    .fields
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
            None => {
                current.stray_line.get_or_insert(line_no);
            }
        }
    }
    if let Some(done) = block.take() {
        parsed.finish_block(section, done);
    }
    parsed
}

#[async_trait]
impl CatalogStoreTrait for CatalogStore {
    async fn save(&self, snapshot: &CatalogSnapshot) -> Result<()> {
        write_file(&self.path, render(snapshot)).await?;

        tracing::info!(
            path = %self.path.display(),
            items = snapshot.items.len(),
            patrons = snapshot.patrons.len(),
            "saved catalog as text"
        );
        Ok(())
    }

    async fn load(&self) -> Result<LoadedSnapshot> {
        let contents = read_file(&self.path).await?;
        if !contents.lines().any(|l| l.trim() == "ITEMS:") {
            return Err(StoreError::Malformed {
                path: self.path.clone(),
                reason: "missing ITEMS: section".to_string(),
            });
        }

        let parsed = parse(&contents);

        tracing::info!(
            path = %self.path.display(),
            items = parsed.items.accepted_count(),
            patrons = parsed.patrons.accepted_count(),
            skipped = parsed.items.rejected_count() + parsed.patrons.rejected_count(),
            "loaded catalog from text"
        );

        Ok(LoadedSnapshot {
            library_name: parsed.library_name,
            items: parsed.items,
            patrons: parsed.patrons,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Genre, ItemId, PatronId, PremiumTier};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn snapshot() -> CatalogSnapshot {
        CatalogSnapshot {
            library_name: "Python Learning Library".to_string(),
            generated_at: Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap(),
            items: vec![
                ItemRecord {
                    id: ItemId::new(101).unwrap(),
                    title: "Python Programming: A Primer".to_string(),
                    creator: "John Doe".to_string(),
                    year: 2023,
                    genre: Genre::Programming,
                    kind: ItemKind::Physical,
                    available: false,
                    holder_id: Some(PatronId::new(1001).unwrap()),
                    file_format: None,
                    file_size_mb: None,
                    download_count: None,
                },
                ItemRecord {
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
                    download_count: Some(2),
                },
            ],
            patrons: vec![
                PatronRecord {
                    id: PatronId::new(1001).unwrap(),
                    name: "Alice".to_string(),
                    email: "alice@email.com".to_string(),
                    tier: None,
                    borrowed_count: 1,
                    fine_balance: dec!(0),
                },
                PatronRecord {
                    id: PatronId::new(1002).unwrap(),
                    name: "Bob".to_string(),
                    email: "bob@email.com".to_string(),
                    tier: Some(PremiumTier::Gold),
                    borrowed_count: 0,
                    fine_balance: dec!(3.00),
                },
            ],
        }
    }

    #[test]
    fn test_render_layout() {
        let text = render(&snapshot());

        assert!(text.starts_with("=== Python Learning Library Data ===\nGenerated: 2026-10-19 09:30:00\n"));
        assert!(text.contains("ITEMS:\n--------------------------------------------------\nID: 101\n"));
        assert!(text.contains("Holder: 1001\n"));
        assert!(text.contains("Tier: Gold\n"));
        assert!(text.contains("Fine: 3.00\n"));
    }

    #[tokio::test]
    async fn test_save_then_load_preserves_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path().join("library_data.txt"));
        let snapshot = snapshot();

        store.save(&snapshot).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded.library_name.as_deref(), Some("Python Learning Library"));
        assert_eq!(loaded.items.accepted, snapshot.items);
        assert_eq!(loaded.patrons.accepted, snapshot.patrons);
    }

    #[test]
    fn test_malformed_blocks_are_skipped() {
        let text = "=== Test Data ===\n\
                    ITEMS:\n\
                    ----------\n\
                    ID: 1\nTitle: Good\nCreator: A\nYear: 2000\nGenre: Fiction\nKind: physical\nAvailable: true\n\
                    ----------\n\
                    ID: 2\nTitle: No Year\nCreator: B\nGenre: Fiction\nKind: physical\nAvailable: true\n\
                    ----------\n\
                    ID: 3\nthis line is garbage\nTitle: Stray\nCreator: C\nYear: 2000\nGenre: Fiction\nKind: physical\nAvailable: true\n\
                    ----------\n\
                    PATRONS:\n\
                    ----------\n\
                    ID: 9\nName: Zed\nEmail: not-an-email\nBorrowed Items: 0\nFine: 0\n\
                    ----------\n";

        let parsed = parse(text);

        assert_eq!(parsed.library_name.as_deref(), Some("Test"));
        assert_eq!(parsed.items.accepted_count(), 1);
        assert_eq!(parsed.items.rejected_count(), 2);
        assert_eq!(parsed.items.rejected[0].location, "line 12");
        assert!(parsed.items.rejected[0].reason.contains("Year"));
        assert_eq!(parsed.patrons.accepted_count(), 0);
        assert_eq!(parsed.patrons.rejected_count(), 1);
    }

    #[tokio::test]
    async fn test_file_without_sections_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        tokio::fs::write(&path, "just some notes\n").await.unwrap();

        let result = CatalogStore::new(&path).load().await;

        assert!(matches!(result, Err(StoreError::Malformed { .. })));
    }
}
