use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{Genre, ItemId, PatronId, ValidationError};

/// 紙の本の延滞金（1日あたり）
pub const PHYSICAL_DAILY_LATE_FEE: Decimal = dec!(0.50);

/// 電子書籍の延滞金（1日あたり、紙の本の半額）
pub const DIGITAL_DAILY_LATE_FEE: Decimal = dec!(0.25);

/// 貸出可能な資料の能力
///
/// 紙の本と電子書籍で振る舞いが異なる部分だけをまとめる。
pub trait Lendable {
    /// 延滞日数から延滞金を計算する
    ///
    /// 丸めは表示時のみ。戻り値は全精度のまま。
    fn late_fee(&self, days_late: i64) -> Decimal;

    /// 1行の状態表示
    fn summary(&self) -> String;
}

/// 電子書籍固有の属性
#[derive(Debug, Clone, PartialEq)]
pub struct DigitalEdition {
    pub file_size_mb: f64,
    pub file_format: String,
    pub download_count: u32,
}

/// 資料の形態
#[derive(Debug, Clone, PartialEq)]
pub enum ItemFormat {
    Physical,
    Digital(DigitalEdition),
}

impl ItemFormat {
    pub fn daily_late_fee(&self) -> Decimal {
        match self {
            ItemFormat::Physical => PHYSICAL_DAILY_LATE_FEE,
            ItemFormat::Digital(_) => DIGITAL_DAILY_LATE_FEE,
        }
    }
}

/// 貸出中の情報
///
/// 貸出可否・借り手・貸出日時を1つの値にまとめることで、
/// 「貸出中なのに借り手がいない」状態を作れないようにする。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkout {
    pub holder: PatronId,
    pub borrowed_at: DateTime<Utc>,
}

/// 資料 - 貸し出せる1冊（1点）
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    id: ItemId,
    title: String,
    creator: String,
    year: i32,
    genre: Genre,
    format: ItemFormat,
    checkout: Option<Checkout>,
}

impl Item {
    /// 紙の本を作成する（貸出可能な状態）
    pub fn physical(
        id: ItemId,
        title: impl Into<String>,
        creator: impl Into<String>,
        year: i32,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            creator: creator.into(),
            year,
            genre: Genre::default(),
            format: ItemFormat::Physical,
            checkout: None,
        }
    }

    /// 電子書籍を作成する（貸出可能な状態、ダウンロード数0）
    pub fn digital(
        id: ItemId,
        title: impl Into<String>,
        creator: impl Into<String>,
        year: i32,
        file_size_mb: f64,
        file_format: impl Into<String>,
    ) -> Self {
        Self {
            format: ItemFormat::Digital(DigitalEdition {
                file_size_mb,
                file_format: file_format.into(),
                download_count: 0,
            }),
            ..Self::physical(id, title, creator, year)
        }
    }

    pub fn with_genre(mut self, genre: Genre) -> Self {
        self.genre = genre;
        self
    }

    /// ダウンロード数を引き継ぐ（読み込んだレコードからの復元用）
    pub(crate) fn with_download_count(mut self, count: u32) -> Self {
        if let ItemFormat::Digital(edition) = &mut self.format {
            edition.download_count = count;
        }
        self
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn creator(&self) -> &str {
        &self.creator
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn genre(&self) -> Genre {
        self.genre
    }

    pub fn format(&self) -> &ItemFormat {
        &self.format
    }

    pub fn is_digital(&self) -> bool {
        matches!(self.format, ItemFormat::Digital(_))
    }

    pub fn is_available(&self) -> bool {
        self.checkout.is_none()
    }

    pub fn checkout(&self) -> Option<&Checkout> {
        self.checkout.as_ref()
    }

    pub fn holder(&self) -> Option<PatronId> {
        self.checkout.map(|c| c.holder)
    }

    pub fn borrowed_at(&self) -> Option<DateTime<Utc>> {
        self.checkout.map(|c| c.borrowed_at)
    }

    /// IDを変更する
    ///
    /// # エラー
    /// 正の整数でない場合は`ValidationError`を返し、元のIDを保持する
    pub fn set_id(&mut self, raw: i64) -> Result<(), ValidationError> {
        self.id = ItemId::new(raw)?;
        Ok(())
    }

    /// ジャンルを変更する
    ///
    /// # エラー
    /// 既定の6種類以外は`ValidationError::UnknownGenre`を返し、元のジャンルを保持する
    pub fn set_genre(&mut self, raw: &str) -> Result<(), ValidationError> {
        self.genre = raw.parse()?;
        Ok(())
    }

    /// 貸し出す
    ///
    /// 貸出可能な場合のみ成功し、借り手と日時を記録する。
    /// 既に貸出中なら`false`を返し、何も変更しない。
    pub fn borrow(&mut self, holder: PatronId, now: DateTime<Utc>) -> bool {
        if self.checkout.is_some() {
            return false;
        }
        self.checkout = Some(Checkout {
            holder,
            borrowed_at: now,
        });
        true
    }

    /// 返却する
    ///
    /// 貸出中なら経過日数（切り捨て）を返して貸出可能に戻す。
    /// 既に貸出可能なら0を返し、何も変更しない。
    pub fn return_item(&mut self, now: DateTime<Utc>) -> i64 {
        match self.checkout.take() {
            Some(checkout) => (now - checkout.borrowed_at).num_days().max(0),
            None => 0,
        }
    }

    /// 電子書籍をダウンロードする
    ///
    /// 紙の本の場合は`None`。
    pub fn download(&mut self) -> Option<u32> {
        match &mut self.format {
            ItemFormat::Digital(edition) => {
                edition.download_count = edition.download_count.saturating_add(1);
                Some(edition.download_count)
            }
            ItemFormat::Physical => None,
        }
    }
}

impl Lendable for Item {
    fn late_fee(&self, days_late: i64) -> Decimal {
        Decimal::from(days_late.max(0)) * self.format.daily_late_fee()
    }

    fn summary(&self) -> String {
        let status = match self.holder() {
            None => "Available".to_string(),
            Some(holder) => format!("Borrowed by Patron {}", holder),
        };
        let base = format!(
            "[Book #{}] '{}' by {} ({}) - {}",
            self.id, self.title, self.creator, self.year, status
        );
        match &self.format {
            ItemFormat::Physical => base,
            ItemFormat::Digital(edition) => format!(
                "{} | Format: {} | Size: {}MB | Downloads: {}",
                base, edition.file_format, edition.file_size_mb, edition.download_count
            ),
        }
    }
}
