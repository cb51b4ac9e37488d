//! Market depth snapshots.
//!
//! Wire-facing, so these derive `serde::Serialize`/`Deserialize`, unlike
//! the internal `PriceLevel`.

use serde::{Deserialize, Serialize};

/// Aggregated view of a single price point for depth reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLevel {
    /// Price in X18.
    pub price: i128,
    /// Total resting quantity at this price, in X18.
    pub quantity: i128,
    /// Number of orders resting at this price.
    pub order_count: usize,
}

/// A point-in-time snapshot of both book sides, best price first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketDepth {
    /// Bid levels, best (highest) price first.
    pub bids: Vec<DepthLevel>,
    /// Ask levels, best (lowest) price first.
    pub asks: Vec<DepthLevel>,
    /// Nanosecond timestamp this snapshot was taken.
    pub timestamp: u64,
}
