//! Multi-symbol matching engine: routes orders to the right per-symbol
//! book, runs cancel/modify, batches, and tracks engine-wide statistics.
//!
//! Per-symbol books live in a `HashMap` guarded by a `std::sync::RwLock`:
//! symbol add/remove takes the write lock, everything else (placing,
//! cancelling, querying) takes a read lock since each
//! [`crate::book::OrderBook`] is independently thread-safe.

pub mod batch;
pub mod stats;
pub mod worker;

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::{error, info};

use crate::book::listener::{BookListener, NullListener};
use crate::book::snapshot::MarketDepth;
use crate::book::OrderBook;
use crate::error::ExchangeError;
use crate::order::{Order, OrderId, Trade};
use stats::EngineStats;

/// Engine-wide tuning knobs, mirroring `EngineConfig` in `engine.hpp`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of shard worker threads when `async_mode` is enabled.
    pub worker_threads: usize,
    /// Upper bound on the number of operations accepted in one batch call.
    pub max_batch_size: usize,
    /// Whether self-trade prevention is enabled by default for new books.
    pub enable_self_trade_prevention: bool,
    /// Whether to run a sharded async front door (see [`worker`]).
    pub async_mode: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            worker_threads: 1,
            max_batch_size: 1000,
            enable_self_trade_prevention: true,
            async_mode: false,
        }
    }
}

/// The result of submitting a single order through the engine.
#[derive(Debug, Clone)]
pub struct OrderResult {
    /// The submitted order's id.
    pub order_id: OrderId,
    /// Trades generated by matching this order, if any.
    pub trades: Vec<Trade>,
}

/// Routes orders across a dynamic set of per-symbol order books.
pub struct MatchingEngine {
    config: EngineConfig,
    books: RwLock<HashMap<u64, OrderBook>>,
    stats: EngineStats,
}

impl MatchingEngine {
    /// Creates an engine with the given configuration and no symbols.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        MatchingEngine {
            config,
            books: RwLock::new(HashMap::new()),
            stats: EngineStats::default(),
        }
    }

    /// This engine's configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Engine-wide running counters.
    #[must_use]
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Registers a new, empty book for `symbol_id`. Returns `false` if a
    /// book for this symbol already exists.
    pub fn add_symbol(&self, symbol_id: u64) -> bool {
        let mut books = self.books.write().expect("engine books lock poisoned");
        if books.contains_key(&symbol_id) {
            return false;
        }
        books.insert(symbol_id, OrderBook::new(symbol_id));
        info!(symbol_id, "added symbol to matching engine");
        true
    }

    /// Removes a symbol's book. Returns `false` if it did not exist, or if
    /// its book still holds resting orders — a book may only be removed
    /// once empty.
    pub fn remove_symbol(&self, symbol_id: u64) -> bool {
        let mut books = self.books.write().expect("engine books lock poisoned");
        let Some(book) = books.get(&symbol_id) else { return false };
        if book.total_orders() != 0 {
            return false;
        }
        books.remove(&symbol_id);
        info!(symbol_id, "removed symbol from matching engine");
        true
    }

    /// `true` if a book is registered for `symbol_id`.
    #[must_use]
    pub fn has_symbol(&self, symbol_id: u64) -> bool {
        self.books.read().expect("engine books lock poisoned").contains_key(&symbol_id)
    }

    /// All currently registered symbol ids.
    #[must_use]
    pub fn symbols(&self) -> Vec<u64> {
        self.books.read().expect("engine books lock poisoned").keys().copied().collect()
    }

    /// Places `order` into its symbol's book using a no-op listener.
    pub fn place_order(&self, order: Order) -> Result<OrderResult, ExchangeError> {
        self.place_order_with_listener(order, &NullListener)
    }

    /// Places `order`, notifying `listener` of fills/cancellations.
    pub fn place_order_with_listener(
        &self,
        order: Order,
        listener: &dyn BookListener,
    ) -> Result<OrderResult, ExchangeError> {
        let books = self.books.read().expect("engine books lock poisoned");
        let book = books.get(&order.symbol_id).ok_or(ExchangeError::SymbolNotFound)?;
        let order_id = order.id;
        match book.place(order, listener) {
            Ok(trades) => {
                self.stats.orders_placed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                self.stats.trades.fetch_add(trades.len() as u64, std::sync::atomic::Ordering::Relaxed);
                let volume: i128 = trades.iter().map(|t| t.quantity).sum();
                self.stats
                    .volume
                    .fetch_add(volume.max(0) as u64, std::sync::atomic::Ordering::Relaxed);
                Ok(OrderResult { order_id, trades })
            }
            Err(e) => {
                error!(?e, symbol_id = order_id.0, "order placement failed");
                Err(ExchangeError::from(e))
            }
        }
    }

    /// Cancels an order on `symbol_id` by id.
    pub fn cancel_order(&self, symbol_id: u64, order_id: OrderId) -> Result<Order, ExchangeError> {
        let books = self.books.read().expect("engine books lock poisoned");
        let book = books.get(&symbol_id).ok_or(ExchangeError::SymbolNotFound)?;
        let cancelled = book.cancel(order_id)?;
        self.stats.orders_cancelled.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(cancelled)
    }

    /// Cancels then resubmits an order with a new price/quantity.
    pub fn modify_order(
        &self,
        symbol_id: u64,
        order_id: OrderId,
        new_price: i128,
        new_quantity: i128,
    ) -> Result<OrderResult, ExchangeError> {
        let books = self.books.read().expect("engine books lock poisoned");
        let book = books.get(&symbol_id).ok_or(ExchangeError::SymbolNotFound)?;
        let (order, trades) = book.modify(order_id, new_price, new_quantity, &NullListener)?;
        Ok(OrderResult { order_id: order.id, trades })
    }

    /// Returns a copy of the resting order, if found.
    #[must_use]
    pub fn get_order(&self, symbol_id: u64, order_id: OrderId) -> Option<Order> {
        let books = self.books.read().expect("engine books lock poisoned");
        books.get(&symbol_id)?.get_order(order_id)
    }

    /// Market depth for `symbol_id`.
    pub fn get_depth(
        &self,
        symbol_id: u64,
        levels: usize,
        timestamp: u64,
    ) -> Result<MarketDepth, ExchangeError> {
        let books = self.books.read().expect("engine books lock poisoned");
        let book = books.get(&symbol_id).ok_or(ExchangeError::SymbolNotFound)?;
        Ok(book.depth(levels, timestamp))
    }

    /// Best bid for `symbol_id`.
    pub fn best_bid(&self, symbol_id: u64) -> Result<Option<i128>, ExchangeError> {
        let books = self.books.read().expect("engine books lock poisoned");
        Ok(books.get(&symbol_id).ok_or(ExchangeError::SymbolNotFound)?.best_bid())
    }

    /// Best ask for `symbol_id`.
    pub fn best_ask(&self, symbol_id: u64) -> Result<Option<i128>, ExchangeError> {
        let books = self.books.read().expect("engine books lock poisoned");
        Ok(books.get(&symbol_id).ok_or(ExchangeError::SymbolNotFound)?.best_ask())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{AccountId, GroupType, OrderStatus, OrderType, Side, TimeInForce};

    fn limit(id: u64, symbol_id: u64, side: Side, price: i128, qty: i128) -> Order {
        Order {
            id: OrderId(id),
            symbol_id,
            account_id: AccountId::new([id as u8; 20], 0),
            side,
            order_type: OrderType::Limit,
            tif: TimeInForce::Gtc,
            price,
            quantity: qty,
            filled: 0,
            stop_price: 0,
            stp_group: 0,
            status: OrderStatus::New,
            client_oid: None,
            group_id: 0,
            group_type: GroupType::None,
            timestamp: 0,
            expire_time: 0,
        }
    }

    #[test]
    fn routes_orders_to_the_right_symbol() {
        let engine = MatchingEngine::new(EngineConfig::default());
        engine.add_symbol(1);
        engine.add_symbol(2);

        engine.place_order(limit(1, 1, Side::Buy, 100, 10)).unwrap();
        assert!(engine.get_order(1, OrderId(1)).is_some());
        assert!(engine.get_order(2, OrderId(1)).is_none());
    }

    #[test]
    fn unknown_symbol_is_rejected() {
        let engine = MatchingEngine::new(EngineConfig::default());
        let result = engine.place_order(limit(1, 99, Side::Buy, 100, 10));
        assert_eq!(result.unwrap_err(), ExchangeError::SymbolNotFound);
    }

    #[test]
    fn stats_track_placed_orders_and_trades() {
        let engine = MatchingEngine::new(EngineConfig::default());
        engine.add_symbol(1);
        engine.place_order(limit(1, 1, Side::Sell, 100, 10)).unwrap();
        let result = engine.place_order(limit(2, 1, Side::Buy, 100, 10)).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(engine.stats().orders_placed.load(std::sync::atomic::Ordering::Relaxed), 2);
        assert_eq!(engine.stats().trades.load(std::sync::atomic::Ordering::Relaxed), 1);
    }
}
