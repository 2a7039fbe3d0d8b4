use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ItemId, PatronId};

/// イベント：資料が貸し出された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemBorrowed {
    pub item_id: ItemId,
    pub patron_id: PatronId,
    pub borrowed_at: DateTime<Utc>,
}

/// イベント：資料が返却された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReturned {
    pub item_id: ItemId,
    pub patron_id: PatronId,
    pub returned_at: DateTime<Utc>,
    pub days_held: i64,
    /// 猶予期間を過ぎた場合のみ
    pub late_fee: Option<Decimal>,
}

/// イベント：延滞金が支払われた
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinePaid {
    pub patron_id: PatronId,
    pub amount: Decimal,
    pub remaining_balance: Decimal,
    pub paid_at: DateTime<Utc>,
}

/// ドメインイベント統合型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainEvent {
    ItemBorrowed(ItemBorrowed),
    ItemReturned(ItemReturned),
    FinePaid(FinePaid),
}

impl DomainEvent {
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::ItemBorrowed(e) => e.borrowed_at,
            DomainEvent::ItemReturned(e) => e.returned_at,
            DomainEvent::FinePaid(e) => e.paid_at,
        }
    }
}
