use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::{
    Borrower, BorrowError, CatalogError, CatalogSnapshot, FinePaid, Genre, Item, ItemBorrowed,
    ItemId, ItemRecord, ItemReturned, Lendable, Patron, PatronId, PatronRecord, ReturnError,
};

/// カタログの集計
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogStats {
    pub total_items: usize,
    pub available_items: usize,
    pub on_loan_items: usize,
    pub digital_items: usize,
    pub total_patrons: usize,
    pub premium_patrons: usize,
    pub outstanding_fines: Decimal,
}

impl CatalogStats {
    /// 貸出中の割合（%）。資料がなければ0。
    pub fn on_loan_percentage(&self) -> f64 {
        if self.total_items == 0 {
            return 0.0;
        }
        self.on_loan_items as f64 / self.total_items as f64 * 100.0
    }
}

/// Catalog集約 - 資料と利用者を所有し、貸出・返却を調整する
///
/// ビジネスルール：
/// - 資料IDと利用者IDはそれぞれ一意（重複登録は拒否）
/// - 資料の貸出情報（借り手・日時）が唯一の正本
/// - 利用者の貸出リストは、この集約の操作の中でのみ資料と同時に更新される
///
/// 外部には参照（`&Item`, `&Patron`）かコピー（`snapshot`）しか渡さないため、
/// 集約の外から状態を壊すことはできない。
#[derive(Debug, Clone)]
pub struct Catalog {
    name: String,
    created_at: DateTime<Utc>,
    items: IndexMap<ItemId, Item>,
    patrons: IndexMap<PatronId, Patron>,
}

impl Catalog {
    pub fn new(name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            created_at,
            items: IndexMap::new(),
            patrons: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // ------------------------------------------------------------------------
    // 登録
    // ------------------------------------------------------------------------

    /// 資料を追加する
    ///
    /// # エラー
    /// 同じIDの資料があれば`CatalogError::DuplicateItem`
    pub fn add_item(&mut self, item: Item) -> Result<(), CatalogError> {
        if self.items.contains_key(&item.id()) {
            return Err(CatalogError::DuplicateItem(item.id()));
        }
        self.items.insert(item.id(), item);
        Ok(())
    }

    /// 利用者を登録する
    ///
    /// # エラー
    /// 同じIDの利用者がいれば`CatalogError::DuplicatePatron`
    pub fn register_patron(&mut self, patron: Patron) -> Result<(), CatalogError> {
        if self.patrons.contains_key(&patron.id()) {
            return Err(CatalogError::DuplicatePatron(patron.id()));
        }
        self.patrons.insert(patron.id(), patron);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // 参照
    // ------------------------------------------------------------------------

    pub fn find_item(&self, item_id: ItemId) -> Option<&Item> {
        self.items.get(&item_id)
    }

    pub fn find_patron(&self, patron_id: PatronId) -> Option<&Patron> {
        self.patrons.get(&patron_id)
    }

    /// 登録順の資料
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// 登録順の利用者
    pub fn patrons(&self) -> impl Iterator<Item = &Patron> {
        self.patrons.values()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn patron_count(&self) -> usize {
        self.patrons.len()
    }

    /// 利用者が借りている資料のID（未登録の利用者は空）
    pub fn held_items(&self, patron_id: PatronId) -> Vec<ItemId> {
        self.patrons
            .get(&patron_id)
            .map(|patron| patron.held_items().to_vec())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // 貸出・返却
    // ------------------------------------------------------------------------

    /// 資料を貸し出す
    ///
    /// ビジネスルール：
    /// - 利用者と資料が存在すること
    /// - 利用者が借りられる状態であること（上限・延滞金）
    /// - 資料が貸出可能であること
    ///
    /// どの条件で失敗しても状態は変わらない。
    pub fn borrow_item(
        &mut self,
        patron_id: PatronId,
        item_id: ItemId,
        now: DateTime<Utc>,
    ) -> Result<ItemBorrowed, BorrowError> {
        let patron = self
            .patrons
            .get_mut(&patron_id)
            .ok_or(BorrowError::PatronNotFound(patron_id))?;
        let item = self
            .items
            .get_mut(&item_id)
            .ok_or(BorrowError::ItemNotFound(item_id))?;

        if !patron.can_borrow() {
            return Err(BorrowError::PatronIneligible(patron_id));
        }
        if !item.borrow(patron_id, now) {
            return Err(BorrowError::ItemUnavailable(item_id));
        }
        patron.add_hold(item_id);

        Ok(ItemBorrowed {
            item_id,
            patron_id,
            borrowed_at: now,
        })
    }

    /// 資料を返却する
    ///
    /// ビジネスルール：
    /// - 猶予期間 = 14日 + 会員種別ごとの追加日数
    /// - 猶予期間を超えた日数分の延滞金を利用者に加算する
    /// - 既に貸出可能な資料の返却は0日扱いで成功する（延滞金なし）
    /// - 別の利用者が借りている資料は返却できない
    pub fn return_item(
        &mut self,
        patron_id: PatronId,
        item_id: ItemId,
        now: DateTime<Utc>,
    ) -> Result<ItemReturned, ReturnError> {
        let patron = self
            .patrons
            .get_mut(&patron_id)
            .ok_or(ReturnError::PatronNotFound(patron_id))?;
        let item = self
            .items
            .get_mut(&item_id)
            .ok_or(ReturnError::ItemNotFound(item_id))?;

        if let Some(holder) = item.holder() {
            if holder != patron_id {
                return Err(ReturnError::HeldByAnotherPatron { item_id, holder });
            }
        }

        let days_held = item.return_item(now);
        patron.remove_hold(item_id);

        let grace_period = patron.grace_period_days();
        let late_fee = if days_held > grace_period {
            let fee = item.late_fee(days_held - grace_period);
            patron.add_fine(fee).ok().map(|()| fee)
        } else {
            None
        };

        Ok(ItemReturned {
            item_id,
            patron_id,
            returned_at: now,
            days_held,
            late_fee,
        })
    }

    // ------------------------------------------------------------------------
    // 利用者の操作
    // ------------------------------------------------------------------------

    fn patron_mut(&mut self, patron_id: PatronId) -> Result<&mut Patron, CatalogError> {
        self.patrons
            .get_mut(&patron_id)
            .ok_or(CatalogError::PatronNotFound(patron_id))
    }

    fn item_mut(&mut self, item_id: ItemId) -> Result<&mut Item, CatalogError> {
        self.items
            .get_mut(&item_id)
            .ok_or(CatalogError::ItemNotFound(item_id))
    }

    /// 延滞金を加算し、新しい残高を返す
    pub fn add_fine(&mut self, patron_id: PatronId, amount: Decimal) -> Result<Decimal, CatalogError> {
        let patron = self.patron_mut(patron_id)?;
        patron.add_fine(amount)?;
        Ok(patron.fine_balance())
    }

    /// 延滞金を支払う
    pub fn pay_fine(
        &mut self,
        patron_id: PatronId,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<FinePaid, CatalogError> {
        let patron = self.patron_mut(patron_id)?;
        patron.pay_fine(amount)?;
        Ok(FinePaid {
            patron_id,
            amount,
            remaining_balance: patron.fine_balance(),
            paid_at: now,
        })
    }

    /// 資料を予約する（プレミアム会員のみ）
    ///
    /// 新たに予約できた場合`true`、予約済みなら`false`。
    pub fn reserve_item(&mut self, patron_id: PatronId, item_id: ItemId) -> Result<bool, CatalogError> {
        if !self.items.contains_key(&item_id) {
            return Err(CatalogError::ItemNotFound(item_id));
        }
        self.patron_mut(patron_id)?
            .reserve(item_id)
            .ok_or(CatalogError::NotPremium(patron_id))
    }

    /// 会員ランクを上げる（プレミアム会員のみ）
    ///
    /// ランクが変わった場合`true`、Platinumで据え置きなら`false`。
    pub fn upgrade_patron(&mut self, patron_id: PatronId) -> Result<bool, CatalogError> {
        self.patron_mut(patron_id)?
            .upgrade_tier()
            .ok_or(CatalogError::NotPremium(patron_id))
    }

    pub fn update_patron_email(&mut self, patron_id: PatronId, raw: &str) -> Result<(), CatalogError> {
        self.patron_mut(patron_id)?.update_email(raw)?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // 資料の操作
    // ------------------------------------------------------------------------

    pub fn set_item_genre(&mut self, item_id: ItemId, raw: &str) -> Result<(), CatalogError> {
        self.item_mut(item_id)?.set_genre(raw)?;
        Ok(())
    }

    /// 電子書籍をダウンロードし、累計ダウンロード数を返す
    pub fn download_item(&mut self, item_id: ItemId) -> Result<u32, CatalogError> {
        self.item_mut(item_id)?
            .download()
            .ok_or(CatalogError::NotDigital(item_id))
    }

    // ------------------------------------------------------------------------
    // 検索・集計
    // ------------------------------------------------------------------------

    /// タイトルまたは著者名で検索する（大文字小文字を区別しない）
    pub fn search(&self, query: &str) -> Vec<&Item> {
        let query = query.to_lowercase();
        self.items
            .values()
            .filter(|item| {
                item.title().to_lowercase().contains(&query)
                    || item.creator().to_lowercase().contains(&query)
            })
            .collect()
    }

    pub fn items_sorted_by_title(&self) -> Vec<&Item> {
        let mut items: Vec<&Item> = self.items.values().collect();
        items.sort_by_key(|item| item.title().to_lowercase());
        items
    }

    pub fn items_sorted_by_year(&self, newest_first: bool) -> Vec<&Item> {
        let mut items: Vec<&Item> = self.items.values().collect();
        items.sort_by_key(|item| item.year());
        if newest_first {
            items.reverse();
        }
        items
    }

    pub fn items_by_genre(&self) -> BTreeMap<Genre, Vec<&Item>> {
        self.items.values().fold(BTreeMap::new(), |mut grouped, item| {
            grouped.entry(item.genre()).or_insert_with(Vec::new).push(item);
            grouped
        })
    }

    pub fn stats(&self) -> CatalogStats {
        let on_loan_items = self.items.values().filter(|i| !i.is_available()).count();
        CatalogStats {
            total_items: self.items.len(),
            available_items: self.items.len() - on_loan_items,
            on_loan_items,
            digital_items: self.items.values().filter(|i| i.is_digital()).count(),
            total_patrons: self.patrons.len(),
            premium_patrons: self.patrons.values().filter(|p| p.is_premium()).count(),
            outstanding_fines: self.patrons.values().map(Patron::fine_balance).sum(),
        }
    }

    /// 読み取り専用のコピーを作成する
    pub fn snapshot(&self, generated_at: DateTime<Utc>) -> CatalogSnapshot {
        CatalogSnapshot {
            library_name: self.name.clone(),
            generated_at,
            items: self.items.values().map(ItemRecord::from).collect(),
            patrons: self.patrons.values().map(PatronRecord::from).collect(),
        }
    }

    /// 資料と利用者の貸出情報が一致しているか
    ///
    /// - 貸出中の資料は、借り手の貸出リストにちょうど1回だけ現れる
    /// - 利用者の貸出リストの資料は、その利用者に貸出中である
    /// - 貸出リストの件数は上限を超えない
    pub fn is_consistent(&self) -> bool {
        let items_agree = self.items.values().all(|item| match item.holder() {
            Some(holder) => self.patrons.values().all(|patron| {
                let count = patron.held_items().iter().filter(|id| **id == item.id()).count();
                if patron.id() == holder {
                    count == 1
                } else {
                    count == 0
                }
            }),
            None => self.patrons.values().all(|patron| !patron.holds(item.id())),
        });
        let patrons_agree = self.patrons.values().all(|patron| {
            patron.held_items().len() <= patron.borrow_limit()
                && patron.held_items().iter().all(|item_id| {
                    self.items
                        .get(item_id)
                        .is_some_and(|item| item.holder() == Some(patron.id()))
                })
        });
        items_agree && patrons_agree
    }
}
