use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// 資料ID - カタログ内で一意な正の整数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct ItemId(u32);

impl ItemId {
    /// 生の整数から作成する
    ///
    /// # エラー
    /// 0以下の値は`ValidationError::NonPositiveId`
    pub fn new(raw: i64) -> Result<Self, ValidationError> {
        positive_id(raw).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for ItemId {
    type Error = ValidationError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl FromStr for ItemId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_id(s).and_then(Self::new)
    }
}

impl From<ItemId> for u32 {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 利用者ID - カタログ内で一意な正の整数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct PatronId(u32);

impl PatronId {
    /// 生の整数から作成する
    ///
    /// # エラー
    /// 0以下の値は`ValidationError::NonPositiveId`
    pub fn new(raw: i64) -> Result<Self, ValidationError> {
        positive_id(raw).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for PatronId {
    type Error = ValidationError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl FromStr for PatronId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_id(s).and_then(Self::new)
    }
}

impl From<PatronId> for u32 {
    fn from(id: PatronId) -> Self {
        id.0
    }
}

impl fmt::Display for PatronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn parse_id(s: &str) -> Result<i64, ValidationError> {
    s.trim()
        .parse()
        .map_err(|_| ValidationError::NotAnInteger(s.to_string()))
}

fn positive_id(raw: i64) -> Result<u32, ValidationError> {
    if raw <= 0 {
        return Err(ValidationError::NonPositiveId(raw));
    }
    u32::try_from(raw).map_err(|_| ValidationError::IdOutOfRange(raw))
}

/// ジャンル
///
/// 不変条件：固定の6種類のみ。これ以外の値は型として存在できない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Genre {
    Fiction,
    #[serde(rename = "Non-Fiction")]
    NonFiction,
    Science,
    History,
    Programming,
    #[default]
    General,
}

impl Genre {
    pub const ALL: [Genre; 6] = [
        Genre::Fiction,
        Genre::NonFiction,
        Genre::Science,
        Genre::History,
        Genre::Programming,
        Genre::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Fiction => "Fiction",
            Genre::NonFiction => "Non-Fiction",
            Genre::Science => "Science",
            Genre::History => "History",
            Genre::Programming => "Programming",
            Genre::General => "General",
        }
    }
}

impl FromStr for Genre {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Genre::ALL
            .into_iter()
            .find(|genre| genre.as_str() == s.trim())
            .ok_or_else(|| ValidationError::UnknownGenre(s.to_string()))
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// プレミアム会員のランク
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PremiumTier {
    Silver,
    Gold,
    Platinum,
}

impl PremiumTier {
    /// 同時に借りられる冊数
    pub fn borrow_limit(&self) -> usize {
        match self {
            PremiumTier::Silver => 5,
            PremiumTier::Gold => 7,
            PremiumTier::Platinum => 10,
        }
    }

    /// 基本の猶予期間に加算される日数
    pub fn bonus_grace_days(&self) -> i64 {
        match self {
            PremiumTier::Silver => 7,
            PremiumTier::Gold => 14,
            PremiumTier::Platinum => 21,
        }
    }

    /// 1段階上のランク（Platinumは据え置き）
    pub fn next(&self) -> Self {
        match self {
            PremiumTier::Silver => PremiumTier::Gold,
            PremiumTier::Gold | PremiumTier::Platinum => PremiumTier::Platinum,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PremiumTier::Silver => "Silver",
            PremiumTier::Gold => "Gold",
            PremiumTier::Platinum => "Platinum",
        }
    }
}

impl FromStr for PremiumTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Silver" => Ok(PremiumTier::Silver),
            "Gold" => Ok(PremiumTier::Gold),
            "Platinum" => Ok(PremiumTier::Platinum),
            other => Err(ValidationError::UnknownTier(other.to_string())),
        }
    }
}

impl fmt::Display for PremiumTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// メールアドレス
///
/// `@`と`.`の両方を含む場合のみ受け付ける。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        if raw.contains('@') && raw.contains('.') {
            Ok(Self(raw))
        } else {
            Err(ValidationError::InvalidEmail(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Email {
    type Error = ValidationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id_accepts_positive() {
        let id = ItemId::new(101).unwrap();
        assert_eq!(id.value(), 101);
    }

    #[test]
    fn test_item_id_rejects_zero_and_negative() {
        assert_eq!(ItemId::new(0), Err(ValidationError::NonPositiveId(0)));
        assert_eq!(ItemId::new(-5), Err(ValidationError::NonPositiveId(-5)));
    }

    #[test]
    fn test_ids_parse_from_text() {
        assert_eq!("101".parse::<ItemId>().unwrap().value(), 101);
        assert_eq!(
            "abc".parse::<PatronId>(),
            Err(ValidationError::NotAnInteger("abc".to_string()))
        );
        assert_eq!("-1".parse::<PatronId>(), Err(ValidationError::NonPositiveId(-1)));
    }

    #[test]
    fn test_patron_id_rejects_out_of_range() {
        let raw = i64::from(u32::MAX) + 1;
        assert_eq!(PatronId::new(raw), Err(ValidationError::IdOutOfRange(raw)));
    }

    #[test]
    fn test_genre_parses_display_names() {
        for genre in Genre::ALL {
            assert_eq!(genre.as_str().parse::<Genre>().unwrap(), genre);
        }
        assert_eq!("Non-Fiction".parse::<Genre>().unwrap(), Genre::NonFiction);
    }

    #[test]
    fn test_genre_rejects_unknown() {
        let result = "Poetry".parse::<Genre>();
        assert_eq!(
            result.unwrap_err(),
            ValidationError::UnknownGenre("Poetry".to_string())
        );
    }

    #[test]
    fn test_genre_default_is_general() {
        assert_eq!(Genre::default(), Genre::General);
    }

    #[test]
    fn test_premium_tier_limits_and_bonus_days() {
        assert_eq!(PremiumTier::Silver.borrow_limit(), 5);
        assert_eq!(PremiumTier::Gold.borrow_limit(), 7);
        assert_eq!(PremiumTier::Platinum.borrow_limit(), 10);
        assert_eq!(PremiumTier::Silver.bonus_grace_days(), 7);
        assert_eq!(PremiumTier::Gold.bonus_grace_days(), 14);
        assert_eq!(PremiumTier::Platinum.bonus_grace_days(), 21);
    }

    #[test]
    fn test_premium_tier_progression_stops_at_platinum() {
        assert_eq!(PremiumTier::Silver.next(), PremiumTier::Gold);
        assert_eq!(PremiumTier::Gold.next(), PremiumTier::Platinum);
        assert_eq!(PremiumTier::Platinum.next(), PremiumTier::Platinum);
    }

    #[test]
    fn test_email_validation() {
        assert!(Email::parse("alice@email.com").is_ok());
        assert!(Email::parse("alice.email.com").is_err());
        assert!(Email::parse("alice@localhost").is_err());
    }

    #[test]
    fn test_ids_serialize_as_plain_integers() {
        let id = ItemId::new(42).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        let parsed: ItemId = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, id);
        assert!(serde_json::from_str::<ItemId>("0").is_err());
    }
}
