use crate::domain::{
    Catalog, CatalogError, CatalogSnapshot, CatalogStats, DomainEvent, FinePaid, ItemBorrowed,
    ItemReturned, commands::*,
};
use crate::ports::{CatalogStore, LogEntry, TransactionLog};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::errors::{LibraryApplicationError, Result};

/// 複数のタスクから共有されるカタログ
///
/// 1回の貸出・返却の「確認してから変更する」までをロックの中で行う。
pub type SharedCatalog = Arc<Mutex<Catalog>>;

/// カタログを共有可能にする
pub fn share(catalog: Catalog) -> SharedCatalog {
    Arc::new(Mutex::new(catalog))
}

/// サービスの依存関係
///
/// 振る舞い（メソッド）は持たず、関数に依存関係を渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub catalog: SharedCatalog,
    pub transaction_log: Arc<dyn TransactionLog>,
}

/// 読み込み結果の集計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// カタログに追加された資料の数
    pub items_accepted: usize,
    /// 読み飛ばした資料レコードの数
    pub items_rejected: usize,
    pub patrons_accepted: usize,
    pub patrons_rejected: usize,
    /// 既に同じIDが登録されていたため追加しなかった数
    pub duplicates: usize,
}

/// カタログのロックを取得する
///
/// パニックしたタスクがロックを汚染していても、カタログの各操作は
/// 途中で状態を壊さないため、そのまま中身を使う。
fn lock(catalog: &SharedCatalog) -> MutexGuard<'_, Catalog> {
    catalog.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 取引ログに記録する
///
/// 記録の失敗は警告として残すだけで、操作の結果には影響しない。
async fn record(transaction_log: &Arc<dyn TransactionLog>, event: DomainEvent) {
    let entry = LogEntry::from(&event);
    let kind = entry.kind.as_str();
    if let Err(e) = transaction_log.append(entry).await {
        tracing::warn!(error = %e, kind, "failed to append transaction log entry");
    }
}

/// 資料を貸し出す
///
/// ビジネスルール：
/// - 利用者と資料が存在すること
/// - 利用者が借りられる状態であること（上限・延滞金）
/// - 資料が貸出可能であること
///
/// 同じ資料を同時に借りようとした場合、成功するのは1件だけ。
///
/// # 引数
/// * `deps` - サービスの依存関係
/// * `cmd` - 貸出コマンド
pub async fn borrow_item(deps: &ServiceDependencies, cmd: BorrowItem) -> Result<ItemBorrowed> {
    let outcome = {
        let mut catalog = lock(&deps.catalog);
        catalog.borrow_item(cmd.patron_id, cmd.item_id, cmd.borrowed_at)
    };

    let event = outcome.inspect_err(|e| {
        tracing::info!(
            patron_id = %cmd.patron_id,
            item_id = %cmd.item_id,
            reason = %e,
            "borrow rejected"
        );
    })?;

    tracing::info!(
        patron_id = %event.patron_id,
        item_id = %event.item_id,
        "item borrowed"
    );
    record(&deps.transaction_log, DomainEvent::ItemBorrowed(event.clone())).await;

    Ok(event)
}

/// 資料を返却する
///
/// ビジネスルール：
/// - 猶予期間を超えた日数分の延滞金を利用者に加算する
/// - 既に貸出可能な資料の返却は0日扱いで成功する
/// - 別の利用者が借りている資料は返却できない
///
/// # 引数
/// * `deps` - サービスの依存関係
/// * `cmd` - 返却コマンド
pub async fn return_item(deps: &ServiceDependencies, cmd: ReturnItem) -> Result<ItemReturned> {
    let outcome = {
        let mut catalog = lock(&deps.catalog);
        catalog.return_item(cmd.patron_id, cmd.item_id, cmd.returned_at)
    };

    let event = outcome.inspect_err(|e| {
        tracing::info!(
            patron_id = %cmd.patron_id,
            item_id = %cmd.item_id,
            reason = %e,
            "return rejected"
        );
    })?;

    match event.late_fee {
        Some(fee) => tracing::info!(
            patron_id = %event.patron_id,
            item_id = %event.item_id,
            days_held = event.days_held,
            late_fee = %fee,
            "item returned late"
        ),
        None => tracing::info!(
            patron_id = %event.patron_id,
            item_id = %event.item_id,
            days_held = event.days_held,
            "item returned"
        ),
    }
    record(&deps.transaction_log, DomainEvent::ItemReturned(event.clone())).await;

    Ok(event)
}

/// 延滞金を支払う
///
/// 金額は正で、残高以下であること。拒否された場合、残高は変わらない。
pub async fn pay_fine(deps: &ServiceDependencies, cmd: PayFine) -> Result<FinePaid> {
    let outcome = {
        let mut catalog = lock(&deps.catalog);
        catalog.pay_fine(cmd.patron_id, cmd.amount, cmd.paid_at)
    };

    let event = outcome?;
    tracing::info!(
        patron_id = %event.patron_id,
        amount = %event.amount,
        remaining = %event.remaining_balance,
        "fine paid"
    );
    record(&deps.transaction_log, DomainEvent::FinePaid(event.clone())).await;

    Ok(event)
}

/// カタログの読み取り専用コピーを作成する
pub fn snapshot(deps: &ServiceDependencies, generated_at: DateTime<Utc>) -> CatalogSnapshot {
    lock(&deps.catalog).snapshot(generated_at)
}

pub fn catalog_stats(deps: &ServiceDependencies) -> CatalogStats {
    lock(&deps.catalog).stats()
}

/// 直近の取引ログをn行返す
///
/// 取引ログが読めない場合は警告を残して空を返す。
pub async fn recent_transactions(deps: &ServiceDependencies, n: usize) -> Vec<String> {
    match deps.transaction_log.tail(n).await {
        Ok(lines) => lines,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read transaction log");
            Vec::new()
        }
    }
}

/// カタログを保存する
///
/// ロックはスナップショットの作成中だけ保持する。
pub async fn save_catalog(
    deps: &ServiceDependencies,
    store: &dyn CatalogStore,
    generated_at: DateTime<Utc>,
) -> Result<()> {
    let snapshot = snapshot(deps, generated_at);
    store
        .save(&snapshot)
        .await
        .map_err(LibraryApplicationError::StoreError)
}

/// 保存されたカタログを読み込んで追加する
///
/// ビジネスルール：
/// - 読み込んだレコードからは常に新しい資料・利用者を作成する（貸出状態は復元しない）
/// - 既に登録されているIDは追加せず、重複として数える
/// - 不正なレコードは読み飛ばして数える（ファイル全体は失敗しない）
///
/// # エラー
/// ファイルが存在しない・読めない・全体が壊れている場合のみ`StoreError`
pub async fn load_catalog(
    deps: &ServiceDependencies,
    store: &dyn CatalogStore,
    loaded_at: DateTime<Utc>,
) -> Result<ImportSummary> {
    let loaded = store
        .load()
        .await
        .map_err(LibraryApplicationError::StoreError)?;

    let mut summary = ImportSummary {
        items_rejected: loaded.items.rejected_count(),
        patrons_rejected: loaded.patrons.rejected_count(),
        ..ImportSummary::default()
    };

    let mut catalog = lock(&deps.catalog);
    for record in loaded.items.accepted {
        let item_id = record.id;
        match record.into_item().map_err(CatalogError::from).and_then(|item| catalog.add_item(item)) {
            Ok(()) => summary.items_accepted += 1,
            Err(CatalogError::DuplicateItem(_)) => {
                tracing::warn!(%item_id, "skipping item already in catalog");
                summary.duplicates += 1;
            }
            Err(e) => {
                tracing::warn!(%item_id, error = %e, "skipping invalid item");
                summary.items_rejected += 1;
            }
        }
    }
    for record in loaded.patrons.accepted {
        let patron_id = record.id;
        match record
            .into_patron(loaded_at)
            .map_err(CatalogError::from)
            .and_then(|patron| catalog.register_patron(patron))
        {
            Ok(()) => summary.patrons_accepted += 1,
            Err(CatalogError::DuplicatePatron(_)) => {
                tracing::warn!(%patron_id, "skipping patron already registered");
                summary.duplicates += 1;
            }
            Err(e) => {
                tracing::warn!(%patron_id, error = %e, "skipping invalid patron");
                summary.patrons_rejected += 1;
            }
        }
    }
    drop(catalog);

    tracing::info!(
        source = loaded.library_name.as_deref().unwrap_or("unnamed"),
        items = summary.items_accepted,
        patrons = summary.patrons_accepted,
        rejected = summary.items_rejected + summary.patrons_rejected,
        duplicates = summary.duplicates,
        "catalog imported"
    );

    Ok(summary)
}
