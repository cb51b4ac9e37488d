//! Margin accounting: `get_margin_info` / `is_liquidatable`.

use crate::fixed::X18;

/// A snapshot of an account's margin state in one currency, as returned by
/// `get_margin_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarginInfo {
    /// Sum of quote balances plus unrealised P&L across open positions.
    pub total_collateral: X18,
    /// `Σ |position_notional| * initial_margin_fraction`.
    pub used_margin: X18,
    /// `total_collateral - used_margin`.
    pub free_margin: X18,
    /// `total_collateral / used_margin`, or `X18::ZERO` if no margin is used.
    pub margin_ratio: X18,
    /// `Σ |position_notional| * maintenance_margin_fraction`.
    pub maintenance_margin: X18,
    /// `true` if equity has fallen below `maintenance_margin`.
    pub liquidatable: bool,
}

/// A single position's contribution to an account's margin computation.
#[derive(Debug, Clone, Copy)]
pub struct PositionExposure {
    /// Signed position size in X18.
    pub size: X18,
    /// Size-weighted entry price.
    pub entry_price: X18,
    /// Current mark price for the position's market.
    pub mark_price: X18,
    /// Market's initial-margin fraction.
    pub initial_margin_fraction: X18,
    /// Market's maintenance-margin fraction.
    pub maintenance_margin_fraction: X18,
}

impl PositionExposure {
    fn notional(&self) -> X18 {
        self.size.abs().mul(self.mark_price)
    }

    fn unrealized_pnl(&self) -> X18 {
        let delta = self.mark_price - self.entry_price;
        if self.size.is_negative() {
            -delta.mul(self.size.abs())
        } else {
            delta.mul(self.size)
        }
    }
}

/// Computes [`MarginInfo`] from an account's quote-currency collateral and
/// its open-position exposures.
#[must_use]
pub fn compute_margin_info(quote_collateral: X18, exposures: &[PositionExposure]) -> MarginInfo {
    let mut unrealized = X18::ZERO;
    let mut used_margin = X18::ZERO;
    let mut maintenance_margin = X18::ZERO;

    for exposure in exposures {
        unrealized = unrealized + exposure.unrealized_pnl();
        used_margin = used_margin + exposure.notional().mul(exposure.initial_margin_fraction);
        maintenance_margin =
            maintenance_margin + exposure.notional().mul(exposure.maintenance_margin_fraction);
    }

    let total_collateral = quote_collateral + unrealized;
    let free_margin = total_collateral - used_margin;
    let margin_ratio = if used_margin.is_zero() {
        X18::ZERO
    } else {
        total_collateral.div(used_margin)
    };
    let liquidatable = total_collateral < maintenance_margin;

    MarginInfo {
        total_collateral,
        used_margin,
        free_margin,
        margin_ratio,
        maintenance_margin,
        liquidatable,
    }
}
