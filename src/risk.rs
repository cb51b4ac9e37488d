//! Pre-trade and portfolio risk checks.
//!
//! These are free functions over `&Vault` / `&dyn MarkPriceSource` rather
//! than methods on either — the risk engine is its own top-level
//! component wired against both by reference, not an owner of either.

use crate::error::VaultError;
use crate::fixed::X18;
use crate::order::{AccountId, Order, Side};
use crate::vault::market::Currency;
use crate::vault::MarkPriceSource;
use crate::vault::Vault;

/// Computes the hypothetical post-trade margin for `order` and rejects if
/// it would violate the initial-margin rule, or if the market is
/// reduce-only and the order would grow the position past zero.
///
/// Returns `Ok(())` if the order may proceed; `Err` otherwise with no state
/// change (the order is rejected at the boundary). Error
/// variants are reused from [`VaultError`] rather than a bespoke risk-engine
/// enum, matching how [`crate::vault::Vault::apply_one_settlement`] reports
/// the same rejection reasons (reduce-only and margin shortfalls both map
/// to `InsufficientMargin`).
pub fn pre_trade_check(vault: &Vault, marks: &dyn MarkPriceSource, order: &Order) -> Result<(), VaultError> {
    let config = vault.market(order.symbol_id).ok_or(VaultError::MarketNotFound)?;
    if !config.is_active() {
        return Err(VaultError::MarketNotFound);
    }
    let mark = marks.mark_price(order.symbol_id).ok_or(VaultError::PriceStale)?;

    let position = vault.position(order.account_id, order.symbol_id);
    let signed_qty = match order.side {
        Side::Buy => order.remaining(),
        Side::Sell => -order.remaining(),
    };
    let signed_qty = X18::from_raw(signed_qty);
    let new_size = position.size + signed_qty;

    if config.is_reduce_only() && grows_exposure(position.size, new_size) {
        return Err(VaultError::InsufficientMargin);
    }

    let opening = if !position.is_flat() && !new_size.is_zero() && position.size.is_positive() != new_size.is_positive() {
        new_size.abs()
    } else {
        (new_size.abs() - position.size.abs()).clamp(X18::ZERO, new_size.abs())
    };
    if opening.is_zero() {
        return Ok(());
    }

    let required = opening.mul(mark).mul(config.initial_margin);
    let info = vault.get_margin_info(order.account_id, config.quote_currency, marks);
    if info.free_margin < required {
        return Err(VaultError::InsufficientMargin);
    }
    Ok(())
}

/// The largest additional size (unsigned, in the direction `is_buy`
/// implies) that keeps free margin at or above zero at the current mark.
#[must_use]
pub fn max_order_size(vault: &Vault, marks: &dyn MarkPriceSource, account: AccountId, market_id: u64, is_buy: bool) -> X18 {
    let Some(config) = vault.market(market_id) else { return X18::ZERO };
    let Some(mark) = marks.mark_price(market_id) else { return X18::ZERO };
    if mark.is_zero() || config.initial_margin.is_zero() {
        return X18::ZERO;
    }

    let info = vault.get_margin_info(account, config.quote_currency, marks);
    if info.free_margin <= X18::ZERO {
        return X18::ZERO;
    }

    let position = vault.position(account, market_id);
    let delta_sign_is_reducing = !position.is_flat() && position.size.is_positive() != is_buy;
    // A reducing order (opposite sign to the current position) frees
    // margin rather than consuming it up to the position's full size; the
    // simple per-unit bound below only applies to the net-opening portion.
    let free_margin_per_unit = mark.mul(config.initial_margin);
    let opening_capacity = info.free_margin.div(free_margin_per_unit);

    if delta_sign_is_reducing {
        position.size.abs() + opening_capacity
    } else {
        opening_capacity
    }
}

/// `true` if `total_collateral < 0` in `quote_currency`.
#[must_use]
pub fn is_bankrupt(vault: &Vault, marks: &dyn MarkPriceSource, account: AccountId, quote_currency: Currency) -> bool {
    vault.get_margin_info(account, quote_currency, marks).total_collateral < X18::ZERO
}

fn grows_exposure(current_size: X18, new_size: X18) -> bool {
    if current_size.is_zero() {
        return !new_size.is_zero();
    }
    let same_direction = current_size.is_positive() == new_size.is_positive();
    same_direction && new_size.abs() > current_size.abs()
}
