//! Conditional-order trigger evaluation and liquidation-price computation.

use crate::fixed::X18;
use crate::order::Side;

/// `true` if a pending trigger with `(side, trigger_price)` should fire
/// given `reference`: buy triggers fire when `reference >= trigger_price`,
/// sell triggers fire when `reference <= trigger_price`. Stop-loss and
/// take-profit orders share this geometry; the distinction between them is
/// purely semantic (how the caller chose `side`/`trigger_price`), not
/// something this function needs to know about.
#[must_use]
pub fn should_fire(side: Side, trigger_price: X18, reference: X18) -> bool {
    match side {
        Side::Buy => reference >= trigger_price,
        Side::Sell => reference <= trigger_price,
    }
}

/// The price at which a position with `entry_price`/`size` (signed, long
/// positive) becomes liquidatable at `maintenance_margin` (absolute quote
/// amount, not a fraction). `None` if `size` is zero.
///
/// `liq = entry - maintenance_margin / size` for longs,
/// `liq = entry + maintenance_margin / |size|` for shorts.
#[must_use]
pub fn liquidation_price(entry_price: X18, size: X18, maintenance_margin: X18) -> Option<X18> {
    if size.is_zero() {
        return None;
    }
    if size.is_positive() {
        Some(entry_price - maintenance_margin.div(size))
    } else {
        Some(entry_price + maintenance_margin.div(size.abs()))
    }
}
