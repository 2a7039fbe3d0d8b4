use crate::domain::DomainEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 取引ログの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Borrow,
    Return,
    FinePayment,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Borrow => "BORROW",
            TransactionKind::Return => "RETURN",
            TransactionKind::FinePayment => "FINE_PAYMENT",
        }
    }
}

/// 取引ログの1行
///
/// `[YYYY-MM-DD HH:MM:SS] KIND: details`の形式で書き出される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub recorded_at: DateTime<Utc>,
    pub kind: TransactionKind,
    pub details: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            self.kind.as_str(),
            self.details
        )
    }
}

impl From<&DomainEvent> for LogEntry {
    fn from(event: &DomainEvent) -> Self {
        let (kind, details) = match event {
            DomainEvent::ItemBorrowed(e) => (
                TransactionKind::Borrow,
                format!("patron {} borrowed item {}", e.patron_id, e.item_id),
            ),
            DomainEvent::ItemReturned(e) => {
                let fee = match e.late_fee {
                    Some(fee) => format!("late fee ${:.2}", fee),
                    None => "on time".to_string(),
                };
                (
                    TransactionKind::Return,
                    format!(
                        "patron {} returned item {} after {} days ({})",
                        e.patron_id, e.item_id, e.days_held, fee
                    ),
                )
            }
            DomainEvent::FinePaid(e) => (
                TransactionKind::FinePayment,
                format!(
                    "patron {} paid ${:.2} (remaining ${:.2})",
                    e.patron_id, e.amount, e.remaining_balance
                ),
            ),
        };
        Self {
            recorded_at: event.occurred_at(),
            kind,
            details,
        }
    }
}

/// 取引ログポート
///
/// 貸出・返却などの出来事を時刻付きで追記するだけの観測用ログ。
/// ここでの失敗が貸出・返却の判断に影響することはない。
#[async_trait]
pub trait TransactionLog: Send + Sync {
    /// 1行追記する
    async fn append(&self, entry: LogEntry) -> Result<()>;

    /// 末尾からn行を古い順で返す
    async fn tail(&self, n: usize) -> Result<Vec<String>>;
}
