use crate::domain::{CatalogSnapshot, ItemKind, ItemRecord, PatronRecord};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Write as _;
use std::str::FromStr;

use super::errors::{LibraryApplicationError, Result};

/// レポートの出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Csv,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "csv" => Ok(ReportFormat::Csv),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("Invalid report format: {}", other)),
        }
    }
}

/// スナップショットからレポートを生成する
///
/// スナップショットはコピーなので、ここでカタログの状態が変わることはない。
pub fn render(snapshot: &CatalogSnapshot, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(render_text(snapshot)),
        ReportFormat::Csv => render_csv(snapshot),
        ReportFormat::Json => serde_json::to_string_pretty(snapshot)
            .map_err(|e| LibraryApplicationError::ReportError(e.to_string())),
    }
}

fn item_line(item: &ItemRecord) -> String {
    let status = match item.holder_id {
        Some(holder) => format!("Borrowed by Patron {}", holder),
        None => "Available".to_string(),
    };
    let mut line = format!(
        "[Book #{}] '{}' by {} ({}) - {}",
        item.id, item.title, item.creator, item.year, status
    );
    if item.kind == ItemKind::Digital {
        line.push_str(&format!(
            " | Format: {} | Size: {}MB | Downloads: {}",
            item.file_format.as_deref().unwrap_or("-"),
            item.file_size_mb.unwrap_or_default(),
            item.download_count.unwrap_or_default()
        ));
    }
    line
}

fn patron_line(patron: &PatronRecord) -> String {
    let line = format!(
        "Patron #{}: {} ({}) - Items: {}, Fine: ${:.2}",
        patron.id, patron.name, patron.email, patron.borrowed_count, patron.fine_balance
    );
    match patron.tier {
        Some(tier) => format!("{} | Premium: {}", line, tier),
        None => line,
    }
}

fn render_text(snapshot: &CatalogSnapshot) -> String {
    let total = snapshot.items.len();
    let on_loan = snapshot.items.iter().filter(|i| !i.available).count();
    let fines: Decimal = snapshot.patrons.iter().map(|p| p.fine_balance).sum();

    let mut out = String::new();
    // Stringへの書き込みは失敗しない
    let _ = writeln!(out, "=== {} Report ===", snapshot.library_name);
    let _ = writeln!(
        out,
        "Generated: {}\n",
        snapshot.generated_at.format("%Y-%m-%d %H:%M:%S")
    );

    let _ = writeln!(out, "Items ({}):", total);
    for item in &snapshot.items {
        let _ = writeln!(out, "  {}", item_line(item));
    }
    let _ = writeln!(out, "\nPatrons ({}):", snapshot.patrons.len());
    for patron in &snapshot.patrons {
        let _ = writeln!(out, "  {}", patron_line(patron));
    }

    let _ = writeln!(out, "\nStatistics:");
    let _ = writeln!(out, "  Available: {}", total - on_loan);
    let _ = writeln!(out, "  On loan: {}", on_loan);
    if total > 0 {
        let _ = writeln!(
            out,
            "  On loan rate: {:.1}%",
            on_loan as f64 / total as f64 * 100.0
        );
    }
    let _ = writeln!(out, "  Outstanding fines: ${:.2}", fines);
    out
}

/// 資料の表と利用者の表を空行で区切って出力する
fn render_csv(snapshot: &CatalogSnapshot) -> Result<String> {
    let items = csv_table(&snapshot.items)?;
    let patrons = csv_table(&snapshot.patrons)?;
    Ok(format!("{}\n{}", items, patrons))
}

fn csv_table<T: Serialize>(records: &[T]) -> Result<String> {
    let report_error = LibraryApplicationError::ReportError;

    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record).map_err(|e| report_error(e.to_string()))?;
    }
    let bytes = writer.into_inner().map_err(|e| report_error(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| report_error(e.to_string()))
}
