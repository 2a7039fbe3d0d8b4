use rust_decimal::Decimal;
use thiserror::Error;

use super::{ItemId, PatronId};

/// 入力値のバリデーションエラー
///
/// いずれも回復可能。拒否された場合、元の値はそのまま保持される。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("id must be a positive integer, got {0}")]
    NonPositiveId(i64),

    #[error("not an integer: {0}")]
    NotAnInteger(String),

    #[error("id {0} is out of range")]
    IdOutOfRange(i64),

    #[error("unknown genre: {0}")]
    UnknownGenre(String),

    #[error("unknown premium tier: {0}")]
    UnknownTier(String),

    #[error("invalid email: {0}")]
    InvalidEmail(String),

    #[error("title cannot be empty")]
    EmptyTitle,

    #[error("invalid year: {0}")]
    YearOutOfRange(i32),

    #[error("fine balance cannot be negative: {0}")]
    NegativeFine(Decimal),

    #[error("digital item requires {0}")]
    MissingDigitalField(&'static str),
}

/// 延滞金操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FineError {
    /// 金額が0以下
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// 残高を超える支払い
    #[error("payment {amount} exceeds balance {balance}")]
    ExceedsBalance { amount: Decimal, balance: Decimal },
}

/// 貸出のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BorrowError {
    #[error("patron {0} not found")]
    PatronNotFound(PatronId),

    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    /// 貸出上限に達している、または延滞金がある
    #[error("patron {0} cannot borrow (reached limit or has fines)")]
    PatronIneligible(PatronId),

    #[error("item {0} is not available")]
    ItemUnavailable(ItemId),
}

/// 返却のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReturnError {
    #[error("patron {0} not found")]
    PatronNotFound(PatronId),

    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    /// 別の利用者が借りている資料は返却できない
    #[error("item {item_id} is held by patron {holder}")]
    HeldByAnotherPatron { item_id: ItemId, holder: PatronId },
}

/// カタログ操作（登録・利用者管理）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("item {0} already exists")]
    DuplicateItem(ItemId),

    #[error("patron {0} already registered")]
    DuplicatePatron(PatronId),

    #[error("patron {0} not found")]
    PatronNotFound(PatronId),

    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    /// プレミアム会員限定の操作
    #[error("patron {0} is not a premium member")]
    NotPremium(PatronId),

    /// 電子書籍限定の操作
    #[error("item {0} is not a digital item")]
    NotDigital(ItemId),

    #[error(transparent)]
    Fine(#[from] FineError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
