//! Engine-wide running counters.
//!
//! Implemented with plain `AtomicU64`s, consistent with the rest of the
//! book internals, rather than a periodically-snapshotted struct.

use std::sync::atomic::AtomicU64;

/// Lock-free counters updated as the engine processes orders.
#[derive(Debug, Default)]
pub struct EngineStats {
    /// Total orders accepted across all symbols.
    pub orders_placed: AtomicU64,
    /// Total orders cancelled (explicit cancel, IOC/FOK/STP residual).
    pub orders_cancelled: AtomicU64,
    /// Total trades executed across all symbols.
    pub trades: AtomicU64,
    /// Cumulative traded quantity (raw X18 units).
    pub volume: AtomicU64,
}

/// A point-in-time copy of [`EngineStats`], suitable for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// See [`EngineStats::orders_placed`].
    pub orders_placed: u64,
    /// See [`EngineStats::orders_cancelled`].
    pub orders_cancelled: u64,
    /// See [`EngineStats::trades`].
    pub trades: u64,
    /// See [`EngineStats::volume`].
    pub volume: u64,
}

impl EngineStats {
    /// Reads all counters with `Relaxed` ordering into a plain snapshot.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        use std::sync::atomic::Ordering::Relaxed;
        StatsSnapshot {
            orders_placed: self.orders_placed.load(Relaxed),
            orders_cancelled: self.orders_cancelled.load(Relaxed),
            trades: self.trades.load(Relaxed),
            volume: self.volume.load(Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering::Relaxed;

    #[test]
    fn snapshot_reflects_counters() {
        let stats = EngineStats::default();
        stats.orders_placed.fetch_add(3, Relaxed);
        stats.trades.fetch_add(1, Relaxed);
        let snap = stats.snapshot();
        assert_eq!(snap.orders_placed, 3);
        assert_eq!(snap.trades, 1);
    }
}
