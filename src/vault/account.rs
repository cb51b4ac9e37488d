//! Collateral balance operations scoped to `(account, currency)`:
//! `deposit` / `withdraw` / `transfer`.

use dashmap::DashMap;

use crate::error::VaultError;
use crate::fixed::X18;
use crate::order::AccountId;
use crate::vault::market::Currency;

/// A `(account, currency) -> signed balance` ledger. Credits are positive;
/// a negative balance represents a liability (e.g. mid-accrual funding
/// debit) and is permitted to exist transiently.
#[derive(Debug, Default)]
pub struct BalanceSheet {
    balances: DashMap<(AccountId, Currency), X18>,
}

impl BalanceSheet {
    /// An empty ledger.
    #[must_use]
    pub fn new() -> Self {
        BalanceSheet::default()
    }

    /// The current balance for `(account, currency)`; `0` if never touched.
    #[must_use]
    pub fn balance(&self, account: AccountId, currency: Currency) -> X18 {
        self.balances.get(&(account, currency)).map(|b| *b).unwrap_or(X18::ZERO)
    }

    /// Credits `amount` (must be non-negative) to `(account, currency)`.
    pub fn deposit(&self, account: AccountId, currency: Currency, amount: X18) {
        self.adjust(account, currency, amount);
    }

    /// Debits `amount` (must be non-negative) from `(account, currency)`.
    /// Rejected if it would leave the balance negative — callers enforcing
    /// a margin-aware withdrawal policy should check `free_margin` first
    /// and treat this as the final balance-sufficiency guard.
    pub fn withdraw(&self, account: AccountId, currency: Currency, amount: X18) -> Result<(), VaultError> {
        let current = self.balance(account, currency);
        if current < amount {
            return Err(VaultError::InsufficientBalance);
        }
        self.adjust(account, currency, -amount);
        Ok(())
    }

    /// Moves `amount` from `from` to `to` within the same currency.
    pub fn transfer(&self, from: AccountId, to: AccountId, currency: Currency, amount: X18) -> Result<(), VaultError> {
        self.withdraw(from, currency, amount)?;
        self.deposit(to, currency, amount);
        Ok(())
    }

    /// Applies a signed delta directly, bypassing the non-negative
    /// withdrawal guard (used for fee charges and funding/P&L postings,
    /// which may legitimately drive a balance negative).
    pub fn adjust(&self, account: AccountId, currency: Currency, delta: X18) {
        let mut entry = self.balances.entry((account, currency)).or_insert(X18::ZERO);
        *entry = *entry + delta;
    }
}
