//! Per-market admin configuration: margin fractions, fees, position
//! limits, and liquidation parameters.

use bitflags::bitflags;

use crate::error::VaultError;
use crate::fixed::X18;

bitflags! {
    /// Boolean flags on a market config.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MarketFlags: u8 {
        /// Market accepts new orders and settlements.
        const ACTIVE = 0b0000_0001;
        /// Only position-reducing orders are accepted.
        const REDUCE_ONLY_MODE = 0b0000_0010;
    }
}

/// A currency identifier for balance bookkeeping.
pub type Currency = u32;

/// Admin-configured parameters for a single perpetual market.
#[derive(Debug, Clone, Copy)]
pub struct MarketConfig {
    /// The market's unique id; also the book's `symbol_id`.
    pub market_id: u64,
    /// Currency the position's size is denominated in.
    pub base_currency: Currency,
    /// Currency collateral, fees, and P&L are denominated in.
    pub quote_currency: Currency,
    /// Fraction of notional required as margin to open a position.
    pub initial_margin: X18,
    /// Fraction of notional below which a position is liquidatable.
    pub maintenance_margin: X18,
    /// `1 / initial_margin`, exposed separately for convenience.
    pub max_leverage: X18,
    /// Fee fraction charged to the maker side (may be negative: a rebate).
    pub maker_fee: X18,
    /// Fee fraction charged to the taker side.
    pub taker_fee: X18,
    /// Minimum order size accepted by the book for this market.
    pub min_order_size: X18,
    /// Maximum absolute position size any single account may hold.
    pub max_position_size: X18,
    /// Fraction of the liquidation penalty paid to the liquidator; the
    /// remainder goes to the insurance fund.
    pub liquidator_penalty_share: X18,
    /// Total penalty rate applied to the liquidated notional.
    pub liquidation_penalty_rate: X18,
    /// `ACTIVE` / `REDUCE_ONLY_MODE`.
    pub flags: MarketFlags,
}

impl MarketConfig {
    /// Validates `0 < maintenance <= initial < 1`.
    pub fn validate(&self) -> Result<(), VaultError> {
        let zero = X18::ZERO;
        let one = X18::ONE;
        if self.maintenance_margin <= zero
            || self.maintenance_margin > self.initial_margin
            || self.initial_margin >= one
        {
            return Err(VaultError::InvalidMarginFractions);
        }
        Ok(())
    }

    /// `true` if new orders/settlements are accepted.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.flags.contains(MarketFlags::ACTIVE)
    }

    /// `true` if only position-reducing orders are currently accepted.
    #[must_use]
    pub fn is_reduce_only(&self) -> bool {
        self.flags.contains(MarketFlags::REDUCE_ONLY_MODE)
    }
}
