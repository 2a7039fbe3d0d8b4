use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{Email, FineError, ItemId, PatronId, PremiumTier, ValidationError};

/// 一般会員の貸出上限
pub const STANDARD_BORROW_LIMIT: usize = 3;

/// 基本の猶予期間（日数）
pub const BASE_GRACE_DAYS: i64 = 14;

/// プレミアム会員が借りられる延滞金の上限（この金額未満なら可）
pub const PREMIUM_FINE_THRESHOLD: Decimal = dec!(5.00);

/// 借り手としての能力
pub trait Borrower {
    /// 同時に借りられる冊数
    fn borrow_limit(&self) -> usize;

    /// 新たに借りられるか
    fn can_borrow(&self) -> bool;

    /// 基本の猶予期間に加算される日数
    fn bonus_grace_days(&self) -> i64;

    /// 延滞金が発生するまでの日数
    fn grace_period_days(&self) -> i64 {
        BASE_GRACE_DAYS + self.bonus_grace_days()
    }
}

/// プレミアム会員固有の属性
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PremiumMembership {
    pub tier: PremiumTier,
    reservations: Vec<ItemId>,
}

impl PremiumMembership {
    pub fn new(tier: PremiumTier) -> Self {
        Self {
            tier,
            reservations: Vec::new(),
        }
    }

    pub fn reservations(&self) -> &[ItemId] {
        &self.reservations
    }
}

/// 会員種別
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatronKind {
    Standard,
    Premium(PremiumMembership),
}

/// 利用者
///
/// 借りている資料はIDのみで保持する（資料そのものはカタログが所有）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patron {
    id: PatronId,
    name: String,
    email: Email,
    held_items: Vec<ItemId>,
    fine_balance: Decimal,
    registered_at: DateTime<Utc>,
    kind: PatronKind,
}

impl Patron {
    /// 一般会員を作成する
    pub fn standard(
        id: PatronId,
        name: impl Into<String>,
        email: Email,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            email,
            held_items: Vec::new(),
            fine_balance: Decimal::ZERO,
            registered_at,
            kind: PatronKind::Standard,
        }
    }

    /// プレミアム会員を作成する
    pub fn premium(
        id: PatronId,
        name: impl Into<String>,
        email: Email,
        tier: PremiumTier,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: PatronKind::Premium(PremiumMembership::new(tier)),
            ..Self::standard(id, name, email, registered_at)
        }
    }

    /// 延滞金残高を引き継いで作成し直す（読み込んだレコードからの復元用）
    pub(crate) fn with_fine_balance(mut self, balance: Decimal) -> Result<Self, ValidationError> {
        if balance < Decimal::ZERO {
            return Err(ValidationError::NegativeFine(balance));
        }
        self.fine_balance = balance;
        Ok(self)
    }

    pub fn id(&self) -> PatronId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn kind(&self) -> &PatronKind {
        &self.kind
    }

    pub fn tier(&self) -> Option<PremiumTier> {
        match &self.kind {
            PatronKind::Premium(membership) => Some(membership.tier),
            PatronKind::Standard => None,
        }
    }

    pub fn is_premium(&self) -> bool {
        matches!(self.kind, PatronKind::Premium(_))
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    /// 借りている資料のID（借りた順）
    pub fn held_items(&self) -> &[ItemId] {
        &self.held_items
    }

    pub fn holds(&self, item_id: ItemId) -> bool {
        self.held_items.contains(&item_id)
    }

    pub fn fine_balance(&self) -> Decimal {
        self.fine_balance
    }

    /// メールアドレスを変更する
    ///
    /// # エラー
    /// `@`と`.`を含まない場合は`ValidationError::InvalidEmail`を返し、元の値を保持する
    pub fn update_email(&mut self, raw: &str) -> Result<(), ValidationError> {
        self.email = Email::parse(raw)?;
        Ok(())
    }

    /// 借りている資料を追加する
    ///
    /// 既に含まれている場合は`false`（エラーではない）。
    pub fn add_hold(&mut self, item_id: ItemId) -> bool {
        if self.holds(item_id) {
            return false;
        }
        self.held_items.push(item_id);
        true
    }

    /// 借りている資料を取り除く
    pub fn remove_hold(&mut self, item_id: ItemId) -> bool {
        match self.held_items.iter().position(|id| *id == item_id) {
            Some(index) => {
                self.held_items.remove(index);
                true
            }
            None => false,
        }
    }

    /// 延滞金を加算する
    ///
    /// # エラー
    /// 0以下の金額は`FineError::NonPositiveAmount`（残高は変わらない）
    pub fn add_fine(&mut self, amount: Decimal) -> Result<(), FineError> {
        if amount <= Decimal::ZERO {
            return Err(FineError::NonPositiveAmount(amount));
        }
        self.fine_balance += amount;
        Ok(())
    }

    /// 延滞金を支払う
    ///
    /// # エラー
    /// - 0以下の金額は`FineError::NonPositiveAmount`
    /// - 残高を超える金額は`FineError::ExceedsBalance`
    pub fn pay_fine(&mut self, amount: Decimal) -> Result<(), FineError> {
        if amount <= Decimal::ZERO {
            return Err(FineError::NonPositiveAmount(amount));
        }
        if amount > self.fine_balance {
            return Err(FineError::ExceedsBalance {
                amount,
                balance: self.fine_balance,
            });
        }
        self.fine_balance -= amount;
        Ok(())
    }

    /// 予約する（プレミアム会員のみ）
    ///
    /// 一般会員は`None`。既に予約済みなら`Some(false)`。
    pub fn reserve(&mut self, item_id: ItemId) -> Option<bool> {
        match &mut self.kind {
            PatronKind::Premium(membership) => {
                if membership.reservations.contains(&item_id) {
                    return Some(false);
                }
                membership.reservations.push(item_id);
                Some(true)
            }
            PatronKind::Standard => None,
        }
    }

    /// ランクを1段階上げる（プレミアム会員のみ）
    ///
    /// 一般会員は`None`。Platinumで据え置きの場合は`Some(false)`。
    pub fn upgrade_tier(&mut self) -> Option<bool> {
        match &mut self.kind {
            PatronKind::Premium(membership) => {
                let previous = membership.tier;
                membership.tier = previous.next();
                Some(membership.tier != previous)
            }
            PatronKind::Standard => None,
        }
    }

    /// 1行の会員情報
    pub fn summary(&self) -> String {
        let base = format!(
            "Patron #{}: {} ({}) - Items: {}, Fine: ${:.2}",
            self.id,
            self.name,
            self.email,
            self.held_items.len(),
            self.fine_balance
        );
        match &self.kind {
            PatronKind::Standard => base,
            PatronKind::Premium(membership) => format!(
                "{} | Premium: {} (+{} days)",
                base,
                membership.tier,
                membership.tier.bonus_grace_days()
            ),
        }
    }
}

impl Borrower for Patron {
    fn borrow_limit(&self) -> usize {
        match &self.kind {
            PatronKind::Standard => STANDARD_BORROW_LIMIT,
            PatronKind::Premium(membership) => membership.tier.borrow_limit(),
        }
    }

    fn can_borrow(&self) -> bool {
        let under_limit = self.held_items.len() < self.borrow_limit();
        match &self.kind {
            PatronKind::Standard => under_limit && self.fine_balance.is_zero(),
            PatronKind::Premium(_) => under_limit && self.fine_balance < PREMIUM_FINE_THRESHOLD,
        }
    }

    fn bonus_grace_days(&self) -> i64 {
        self.tier().map_or(0, |tier| tier.bonus_grace_days())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(raw: i64) -> ItemId {
        ItemId::new(raw).unwrap()
    }

    fn alice() -> Patron {
        Patron::standard(
            PatronId::new(1001).unwrap(),
            "Alice",
            Email::parse("alice@email.com").unwrap(),
            Utc::now(),
        )
    }

    fn bob(tier: PremiumTier) -> Patron {
        Patron::premium(
            PatronId::new(1002).unwrap(),
            "Bob",
            Email::parse("bob@email.com").unwrap(),
            tier,
            Utc::now(),
        )
    }

    #[test]
    fn test_new_patron_has_no_holds_and_no_fines() {
        let patron = alice();
        assert!(patron.held_items().is_empty());
        assert_eq!(patron.fine_balance(), Decimal::ZERO);
        assert!(patron.can_borrow());
    }

    #[test]
    fn test_add_hold_is_idempotent() {
        let mut patron = alice();
        assert!(patron.add_hold(item(101)));
        assert!(!patron.add_hold(item(101)));
        assert_eq!(patron.held_items(), &[item(101)]);
    }

    #[test]
    fn test_remove_hold_reports_whether_removed() {
        let mut patron = alice();
        patron.add_hold(item(101));
        patron.add_hold(item(102));

        assert!(patron.remove_hold(item(101)));
        assert!(!patron.remove_hold(item(101)));
        assert_eq!(patron.held_items(), &[item(102)]);
    }

    #[test]
    fn test_standard_limit_is_three() {
        let mut patron = alice();
        for raw in 1..=3 {
            assert!(patron.can_borrow());
            patron.add_hold(item(raw));
        }
        assert!(!patron.can_borrow());
    }

    #[test]
    fn test_standard_cannot_borrow_with_any_fine() {
        let mut patron = alice();
        patron.add_fine(dec!(0.01)).unwrap();
        assert!(!patron.can_borrow());
    }

    #[test]
    fn test_premium_gold_fine_threshold() {
        let mut patron = bob(PremiumTier::Gold);
        for raw in 1..=6 {
            patron.add_hold(item(raw));
        }

        patron.add_fine(dec!(4.99)).unwrap();
        assert!(patron.can_borrow());

        patron.add_fine(dec!(0.01)).unwrap();
        assert_eq!(patron.fine_balance(), dec!(5.00));
        assert!(!patron.can_borrow());

        // 冊数に関係なく5.00以上なら不可
        let mut empty_handed = bob(PremiumTier::Gold);
        empty_handed.add_fine(dec!(5.00)).unwrap();
        assert!(!empty_handed.can_borrow());
    }

    #[test]
    fn test_premium_limit_by_tier() {
        let mut patron = bob(PremiumTier::Gold);
        for raw in 1..=7 {
            patron.add_hold(item(raw));
        }
        assert_eq!(patron.borrow_limit(), 7);
        assert!(!patron.can_borrow());
    }

    #[test]
    fn test_grace_period() {
        assert_eq!(alice().grace_period_days(), 14);
        assert_eq!(bob(PremiumTier::Silver).grace_period_days(), 21);
        assert_eq!(bob(PremiumTier::Gold).grace_period_days(), 28);
        assert_eq!(bob(PremiumTier::Platinum).grace_period_days(), 35);
    }

    #[test]
    fn test_add_fine_rejects_non_positive() {
        let mut patron = alice();
        assert_eq!(
            patron.add_fine(Decimal::ZERO),
            Err(FineError::NonPositiveAmount(Decimal::ZERO))
        );
        assert!(patron.add_fine(dec!(-1)).is_err());
        assert_eq!(patron.fine_balance(), Decimal::ZERO);
    }

    #[test]
    fn test_pay_fine() {
        let mut patron = alice();
        patron.add_fine(dec!(3.00)).unwrap();

        assert_eq!(
            patron.pay_fine(dec!(3.50)),
            Err(FineError::ExceedsBalance {
                amount: dec!(3.50),
                balance: dec!(3.00)
            })
        );
        assert!(patron.pay_fine(Decimal::ZERO).is_err());
        assert_eq!(patron.fine_balance(), dec!(3.00));

        patron.pay_fine(dec!(1.25)).unwrap();
        assert_eq!(patron.fine_balance(), dec!(1.75));
        patron.pay_fine(dec!(1.75)).unwrap();
        assert!(patron.fine_balance().is_zero());
        assert!(patron.can_borrow());
    }

    #[test]
    fn test_reserve_only_for_premium() {
        let mut standard = alice();
        assert_eq!(standard.reserve(item(101)), None);

        let mut premium = bob(PremiumTier::Silver);
        assert_eq!(premium.reserve(item(101)), Some(true));
        assert_eq!(premium.reserve(item(101)), Some(false));
        assert_eq!(premium.reserve(item(102)), Some(true));
        match premium.kind() {
            PatronKind::Premium(membership) => {
                assert_eq!(membership.reservations(), &[item(101), item(102)])
            }
            PatronKind::Standard => panic!("expected premium patron"),
        }
    }

    #[test]
    fn test_upgrade_tier_recomputes_bonus_days() {
        let mut patron = bob(PremiumTier::Silver);
        assert_eq!(patron.upgrade_tier(), Some(true));
        assert_eq!(patron.tier(), Some(PremiumTier::Gold));
        assert_eq!(patron.bonus_grace_days(), 14);

        assert_eq!(patron.upgrade_tier(), Some(true));
        assert_eq!(patron.upgrade_tier(), Some(false));
        assert_eq!(patron.tier(), Some(PremiumTier::Platinum));
        assert_eq!(patron.bonus_grace_days(), 21);

        assert_eq!(alice().upgrade_tier(), None);
    }

    #[test]
    fn test_update_email_keeps_previous_on_rejection() {
        let mut patron = alice();
        assert!(patron.update_email("not-an-email").is_err());
        assert_eq!(patron.email().as_str(), "alice@email.com");

        patron.update_email("alice@library.org").unwrap();
        assert_eq!(patron.email().as_str(), "alice@library.org");
    }

    #[test]
    fn test_summary() {
        let mut patron = alice();
        patron.add_fine(dec!(3)).unwrap();
        assert_eq!(
            patron.summary(),
            "Patron #1001: Alice (alice@email.com) - Items: 0, Fine: $3.00"
        );
        assert!(bob(PremiumTier::Gold)
            .summary()
            .ends_with("| Premium: Gold (+14 days)"));
    }
}
