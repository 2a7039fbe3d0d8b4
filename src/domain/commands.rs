use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ItemId, PatronId};

/// コマンド：資料を貸し出す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowItem {
    pub patron_id: PatronId,
    pub item_id: ItemId,
    pub borrowed_at: DateTime<Utc>,
}

/// コマンド：資料を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnItem {
    pub patron_id: PatronId,
    pub item_id: ItemId,
    pub returned_at: DateTime<Utc>,
}

/// コマンド：延滞金を支払う
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayFine {
    pub patron_id: PatronId,
    pub amount: Decimal,
    pub paid_at: DateTime<Utc>,
}
