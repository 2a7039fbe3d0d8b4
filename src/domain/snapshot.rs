use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    Email, Genre, Item, ItemFormat, ItemId, Patron, PatronId, PremiumTier, ValidationError,
};

/// 受け付ける出版年の範囲
pub const MIN_YEAR: i32 = 1000;
pub const MAX_YEAR: i32 = 2100;

/// 資料の形態（フラットなレコード用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Physical,
    Digital,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Physical => "physical",
            ItemKind::Digital => "digital",
        }
    }
}

impl std::str::FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "physical" => Ok(ItemKind::Physical),
            "digital" => Ok(ItemKind::Digital),
            other => Err(format!("Invalid item kind: {}", other)),
        }
    }
}

/// 資料のフラットなレコード
///
/// レポート出力と永続化の両方で使う読み取り専用のコピー。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: ItemId,
    pub title: String,
    pub creator: String,
    pub year: i32,
    pub genre: Genre,
    pub kind: ItemKind,
    pub available: bool,
    pub holder_id: Option<PatronId>,
    pub file_format: Option<String>,
    pub file_size_mb: Option<f64>,
    pub download_count: Option<u32>,
}

impl ItemRecord {
    /// 読み込み時のバリデーション
    ///
    /// - タイトルが空でないこと
    /// - 出版年が1000〜2100であること
    /// - 電子書籍はファイル形式とサイズを持つこと
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&self.year) {
            return Err(ValidationError::YearOutOfRange(self.year));
        }
        if self.kind == ItemKind::Digital {
            if self.file_format.as_deref().is_none_or(|f| f.trim().is_empty()) {
                return Err(ValidationError::MissingDigitalField("file_format"));
            }
            if self.file_size_mb.is_none() {
                return Err(ValidationError::MissingDigitalField("file_size_mb"));
            }
        }
        Ok(())
    }

    /// 新しい資料を作成する
    ///
    /// 貸出状態は復元しない（作成された資料は常に貸出可能）。
    pub fn into_item(self) -> Result<Item, ValidationError> {
        self.validate()?;
        let item = match self.kind {
            ItemKind::Physical => Item::physical(self.id, self.title, self.creator, self.year),
            ItemKind::Digital => Item::digital(
                self.id,
                self.title,
                self.creator,
                self.year,
                self.file_size_mb.unwrap_or_default(),
                self.file_format.unwrap_or_default(),
            )
            .with_download_count(self.download_count.unwrap_or_default()),
        };
        Ok(item.with_genre(self.genre))
    }
}

impl From<&Item> for ItemRecord {
    fn from(item: &Item) -> Self {
        let (kind, file_format, file_size_mb, download_count) = match item.format() {
            ItemFormat::Physical => (ItemKind::Physical, None, None, None),
            ItemFormat::Digital(edition) => (
                ItemKind::Digital,
                Some(edition.file_format.clone()),
                Some(edition.file_size_mb),
                Some(edition.download_count),
            ),
        };
        Self {
            id: item.id(),
            title: item.title().to_string(),
            creator: item.creator().to_string(),
            year: item.year(),
            genre: item.genre(),
            kind,
            available: item.is_available(),
            holder_id: item.holder(),
            file_format,
            file_size_mb,
            download_count,
        }
    }
}

/// 利用者のフラットなレコード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatronRecord {
    pub id: PatronId,
    pub name: String,
    pub email: String,
    /// 一般会員は`None`
    pub tier: Option<PremiumTier>,
    pub borrowed_count: usize,
    #[serde(with = "rust_decimal::serde::str")]
    pub fine_balance: Decimal,
}

impl PatronRecord {
    pub fn validate(&self) -> Result<(), ValidationError> {
        Email::parse(self.email.as_str())?;
        if self.fine_balance < Decimal::ZERO {
            return Err(ValidationError::NegativeFine(self.fine_balance));
        }
        Ok(())
    }

    /// 新しい利用者を作成する
    ///
    /// 延滞金残高は引き継ぐが、借りている資料は復元しない。
    pub fn into_patron(self, registered_at: DateTime<Utc>) -> Result<Patron, ValidationError> {
        let email = Email::parse(self.email)?;
        let patron = match self.tier {
            None => Patron::standard(self.id, self.name, email, registered_at),
            Some(tier) => Patron::premium(self.id, self.name, email, tier, registered_at),
        };
        patron.with_fine_balance(self.fine_balance)
    }
}

impl From<&Patron> for PatronRecord {
    fn from(patron: &Patron) -> Self {
        Self {
            id: patron.id(),
            name: patron.name().to_string(),
            email: patron.email().to_string(),
            tier: patron.tier(),
            borrowed_count: patron.held_items().len(),
            fine_balance: patron.fine_balance(),
        }
    }
}

/// カタログ全体の読み取り専用スナップショット
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub library_name: String,
    pub generated_at: DateTime<Utc>,
    pub items: Vec<ItemRecord>,
    pub patrons: Vec<PatronRecord>,
}
