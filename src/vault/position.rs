//! Perpetual position tracking: signed size, entry-price recomputation on
//! same-sign additions, and realised P&L on reductions.

use crate::fixed::X18;
use crate::order::Side;

/// An open (or flat) perpetual position in one market for one account.
///
/// Sign convention: `size` is signed, positive for long, negative for
/// short; [`Position::side`] is derived from the sign and is never stored
/// independently, so the two can never disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Signed contract size in X18; positive long, negative short.
    pub size: X18,
    /// Size-weighted average entry price.
    pub entry_price: X18,
    /// Cumulative funding paid (negative) or received (positive).
    pub accumulated_funding: X18,
    /// Unix seconds of the last funding accrual applied to this position.
    pub last_funding_time: u64,
}

impl Position {
    /// A flat (no position) starting state.
    #[must_use]
    pub fn flat() -> Self {
        Position {
            size: X18::ZERO,
            entry_price: X18::ZERO,
            accumulated_funding: X18::ZERO,
            last_funding_time: 0,
        }
    }

    /// `true` if the position carries no size.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.size.is_zero()
    }

    /// The side implied by the sign of `size`; meaningless on a flat
    /// position but defined as `Buy` for a deterministic return value.
    #[must_use]
    pub fn side(&self) -> Side {
        if self.size.is_negative() {
            Side::Sell
        } else {
            Side::Buy
        }
    }

    /// Applies a signed size delta at `price`, returning any realised P&L.
    ///
    /// Same-sign additions (or opening from flat) recompute `entry_price`
    /// as a size-weighted average and realise nothing. Opposite-sign
    /// reductions realise P&L against the existing `entry_price` for the
    /// portion that reduces `size` toward zero; entry price is left
    /// unchanged by a reduction. A delta that crosses through zero splits
    /// into a full reduction (realising P&L on the whole prior size) plus
    /// a fresh open of the residual at `price`.
    pub fn apply_delta(&mut self, delta: X18, price: X18) -> X18 {
        if delta.is_zero() {
            return X18::ZERO;
        }
        if self.is_flat() || same_sign(self.size, delta) {
            let new_size = self.size + delta;
            let notional = self.entry_price.mul(self.size) + price.mul(delta);
            self.entry_price = if new_size.is_zero() { X18::ZERO } else { notional.div(new_size) };
            self.size = new_size;
            return X18::ZERO;
        }

        if delta.abs() <= self.size.abs() {
            let realized = realized_pnl(self.size, self.entry_price, price, delta.abs());
            self.size = self.size + delta;
            if self.size.is_zero() {
                self.entry_price = X18::ZERO;
            }
            realized
        } else {
            let closing_amount = self.size.abs();
            let realized = realized_pnl(self.size, self.entry_price, price, closing_amount);
            let residual = delta + sign_of(self.size).mul(closing_amount);
            self.size = residual;
            self.entry_price = price;
            realized
        }
    }
}

fn same_sign(a: X18, b: X18) -> bool {
    (a.is_positive() || a.is_zero()) == (b.is_positive() || b.is_zero())
}

fn sign_of(v: X18) -> X18 {
    if v.is_negative() { -X18::ONE } else { X18::ONE }
}

/// Realised P&L on closing `closing_amount` (unsigned) of a position with
/// `size`/`entry_price` at `exit_price`: `(exit - entry) * closing_amount`
/// for longs, the negation for shorts.
fn realized_pnl(size: X18, entry_price: X18, exit_price: X18, closing_amount: X18) -> X18 {
    let delta_price = exit_price - entry_price;
    if size.is_negative() {
        -delta_price.mul(closing_amount)
    } else {
        delta_price.mul(closing_amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_from_flat_sets_entry_price() {
        let mut position = Position::flat();
        let realized = position.apply_delta(X18::from_int(10), X18::from_int(100));
        assert_eq!(realized, X18::ZERO);
        assert_eq!(position.size, X18::from_int(10));
        assert_eq!(position.entry_price, X18::from_int(100));
    }

    #[test]
    fn same_sign_addition_recomputes_weighted_entry() {
        let mut position = Position::flat();
        position.apply_delta(X18::from_int(10), X18::from_int(100));
        position.apply_delta(X18::from_int(10), X18::from_int(200));
        assert_eq!(position.size, X18::from_int(20));
        assert_eq!(position.entry_price, X18::from_int(150));
    }

    #[test]
    fn partial_reduction_realizes_pnl_and_preserves_entry() {
        let mut position = Position::flat();
        position.apply_delta(X18::from_int(10), X18::from_int(100));
        let realized = position.apply_delta(X18::from_int(-4), X18::from_int(120));
        assert_eq!(realized, X18::from_int(80));
        assert_eq!(position.size, X18::from_int(6));
        assert_eq!(position.entry_price, X18::from_int(100));
    }

    #[test]
    fn full_close_zeroes_entry_price() {
        let mut position = Position::flat();
        position.apply_delta(X18::from_int(10), X18::from_int(100));
        position.apply_delta(X18::from_int(-10), X18::from_int(90));
        assert!(position.is_flat());
        assert_eq!(position.entry_price, X18::ZERO);
    }

    #[test]
    fn crossing_delta_closes_then_reopens_on_the_other_side() {
        let mut position = Position::flat();
        position.apply_delta(X18::from_int(10), X18::from_int(100));
        let realized = position.apply_delta(X18::from_int(-15), X18::from_int(110));
        assert_eq!(realized, X18::from_int(100));
        assert_eq!(position.size, X18::from_int(-5));
        assert_eq!(position.entry_price, X18::from_int(110));
        assert_eq!(position.side(), Side::Sell);
    }
}
