//! Per-symbol order book: price-time priority matching, O(1) cancel, and
//! market depth queries.
//!
//! Built as a lock-free-read structure (`crossbeam_skiplist::SkipMap` for
//! ordered price levels, `dashmap::DashMap` for the O(1) order-id index):
//! each price level is independently `Mutex`-guarded so placing and
//! cancelling orders at different price points never contends, and the
//! book as a whole needs no coarse lock for these operations. The engine
//! still wraps each book in
//! an outer `RwLock` (see `crate::engine`) for the rarer structural
//! operations (adding/removing a symbol).

pub mod auction;
pub mod level;
pub mod listener;
pub mod pro_rata;
pub mod snapshot;
pub mod stop;
pub mod stp;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;

use crate::error::BookError;
use crate::order::{Order, OrderId, OrderStatus, OrderType, Side, TimeInForce, Trade};
use level::PriceLevel;
use listener::{notify, BookListener, NullListener};
use snapshot::{DepthLevel, MarketDepth};
use stp::STPMode;

/// Which matcher a `place` call should use. The continuous price-time path
/// is the default; auction and pro-rata are explicit opt-ins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Continuous price-time priority matching (this module).
    #[default]
    Continuous,
    /// Single clearing-price batch auction (see [`crate::book::auction`]).
    Auction,
    /// Pro-rata allocation at a single price (see [`crate::book::pro_rata`]).
    ProRata,
}

/// Running counters for a single book.
#[derive(Debug, Default)]
pub struct BookStats {
    /// Orders accepted (including those rejected pre-book are not counted).
    pub orders_placed: AtomicU64,
    /// Orders cancelled, by user request or IOC/FOK/STP residual cleanup.
    pub orders_cancelled: AtomicU64,
    /// Trades executed.
    pub trades: AtomicU64,
    /// Cumulative traded quantity (raw X18 units; callers divide by SCALE).
    pub volume: AtomicU64,
}

struct OrderLocation {
    side: Side,
    price: i128,
}

/// A single symbol's limit order book.
pub struct OrderBook {
    symbol_id: u64,
    /// Bid side keyed ascending by price; best bid is the last entry.
    bids: SkipMap<i128, Mutex<PriceLevel>>,
    /// Ask side keyed ascending by price; best ask is the first entry.
    asks: SkipMap<i128, Mutex<PriceLevel>>,
    order_locations: DashMap<OrderId, OrderLocation>,
    next_trade_id: AtomicU64,
    stp_mode: STPMode,
    stats: BookStats,
}

impl OrderBook {
    /// Creates an empty book for `symbol_id` with STP disabled.
    #[must_use]
    pub fn new(symbol_id: u64) -> Self {
        OrderBook::with_stp_mode(symbol_id, STPMode::None)
    }

    /// Creates an empty book for `symbol_id` with the given STP policy.
    #[must_use]
    pub fn with_stp_mode(symbol_id: u64, stp_mode: STPMode) -> Self {
        OrderBook {
            symbol_id,
            bids: SkipMap::new(),
            asks: SkipMap::new(),
            order_locations: DashMap::new(),
            next_trade_id: AtomicU64::new(1),
            stp_mode,
            stats: BookStats::default(),
        }
    }

    /// The symbol this book matches.
    #[must_use]
    pub fn symbol_id(&self) -> u64 {
        self.symbol_id
    }

    /// Running counters for this book.
    #[must_use]
    pub fn stats(&self) -> &BookStats {
        &self.stats
    }

    /// Submits `order` for matching, returning any trades it generated.
    ///
    /// Dispatches on `order.order_type` and `order.tif`. Market orders
    /// never rest; limit residuals rest unless `tif` forbids it (IOC/FOK);
    /// stop orders must be submitted to [`crate::book::stop::StopBook`]
    /// instead and resubmitted here once triggered.
    pub fn place(
        &self,
        mut order: Order,
        listener: &dyn BookListener,
    ) -> Result<Vec<Trade>, BookError> {
        if order.quantity <= 0 {
            return Err(BookError::InvalidQuantity);
        }
        if order.order_type == OrderType::Limit && order.price <= 0 {
            return Err(BookError::InvalidPrice);
        }

        self.stats.orders_placed.fetch_add(1, Ordering::Relaxed);

        if order.tif == TimeInForce::Fok && !self.fok_reachable(&order) {
            return Err(BookError::FokUnreachable);
        }

        let trades = self.match_order(&mut order, listener)?;

        if order.status == OrderStatus::Cancelled {
            // Self-trade prevention cancelled the taker mid-match (`CancelTaker`/
            // `CancelBoth`): report it as cancelled, not filled, even if its
            // remaining size happens to be zero.
            self.stats.orders_cancelled.fetch_add(1, Ordering::Relaxed);
            notify(listener, |l| l.on_order_cancelled(order.id));
            return Ok(trades);
        }

        let remaining = order.remaining();
        if remaining > 0 {
            if order.order_type == OrderType::Market {
                // Market orders never rest; unmatched residual is simply
                // dropped (equivalent to an implicit cancel).
                order.status = OrderStatus::Cancelled;
                notify(listener, |l| l.on_order_cancelled(order.id));
            } else if order.tif.allows_resting() {
                order.status = if order.filled > 0 {
                    OrderStatus::Partial
                } else {
                    OrderStatus::New
                };
                self.add_to_book(order);
            } else {
                // IOC: cancel the residual instead of resting it.
                order.status = OrderStatus::Cancelled;
                self.stats.orders_cancelled.fetch_add(1, Ordering::Relaxed);
                notify(listener, |l| l.on_order_cancelled(order.id));
            }
        } else {
            order.status = OrderStatus::Filled;
            notify(listener, |l| l.on_order_filled(&order));
        }

        Ok(trades)
    }

    /// Cancels a resting order by id, returning it if found.
    pub fn cancel(&self, order_id: OrderId) -> Result<Order, BookError> {
        let (_, location) = self
            .order_locations
            .remove(&order_id)
            .ok_or(BookError::OrderNotFound(order_id))?;
        let side_map = self.side_map(location.side);
        let removed = side_map.get(&location.price).and_then(|entry| {
            let mut level = entry.value().lock().expect("price level mutex poisoned");
            let order = level.remove(order_id);
            let empty = level.is_empty();
            drop(level);
            if empty {
                entry.remove();
            }
            order
        });
        match removed {
            Some(mut order) => {
                order.status = OrderStatus::Cancelled;
                self.stats.orders_cancelled.fetch_add(1, Ordering::Relaxed);
                Ok(order)
            }
            None => Err(BookError::OrderNotFound(order_id)),
        }
    }

    /// Cancels then re-submits an order with a new price/quantity,
    /// preserving its id but losing its time priority (cancel + replace
    /// semantics).
    pub fn modify(
        &self,
        order_id: OrderId,
        new_price: i128,
        new_quantity: i128,
        listener: &dyn BookListener,
    ) -> Result<(Order, Vec<Trade>), BookError> {
        let mut order = self.cancel(order_id)?;
        order.price = new_price;
        order.quantity = new_quantity;
        order.filled = 0;
        order.status = OrderStatus::New;
        let trades = self.place(order.clone(), listener)?;
        Ok((order, trades))
    }

    /// Returns a copy of the resting order with this id, if any.
    #[must_use]
    pub fn get_order(&self, order_id: OrderId) -> Option<Order> {
        let location = self.order_locations.get(&order_id)?;
        let side_map = self.side_map(location.side);
        side_map
            .get(&location.price)?
            .value()
            .lock()
            .expect("price level mutex poisoned")
            .iter()
            .find(|o| o.id == order_id)
            .cloned()
    }

    /// `true` if `order_id` is currently resting in the book.
    #[must_use]
    pub fn has_order(&self, order_id: OrderId) -> bool {
        self.order_locations.contains_key(&order_id)
    }

    /// Best (highest) resting bid price, if any.
    #[must_use]
    pub fn best_bid(&self) -> Option<i128> {
        self.bids.back().map(|e| *e.key())
    }

    /// Best (lowest) resting ask price, if any.
    #[must_use]
    pub fn best_ask(&self) -> Option<i128> {
        self.asks.front().map(|e| *e.key())
    }

    /// `best_ask - best_bid`, if both sides have liquidity.
    #[must_use]
    pub fn spread(&self) -> Option<i128> {
        Some(self.best_ask()? - self.best_bid()?)
    }

    /// Number of distinct bid price levels.
    #[must_use]
    pub fn bid_levels(&self) -> usize {
        self.bids.len()
    }

    /// Number of distinct ask price levels.
    #[must_use]
    pub fn ask_levels(&self) -> usize {
        self.asks.len()
    }

    /// Number of resting orders across both sides.
    #[must_use]
    pub fn total_orders(&self) -> usize {
        self.order_locations.len()
    }

    /// Sum of resting bid quantity across all levels.
    #[must_use]
    pub fn total_bid_quantity(&self) -> i128 {
        self.bids
            .iter()
            .map(|e| e.value().lock().expect("poisoned").total_quantity())
            .sum()
    }

    /// Sum of resting ask quantity across all levels.
    #[must_use]
    pub fn total_ask_quantity(&self) -> i128 {
        self.asks
            .iter()
            .map(|e| e.value().lock().expect("poisoned").total_quantity())
            .sum()
    }

    /// Snapshot of up to `levels` price points per side, best price first.
    #[must_use]
    pub fn depth(&self, levels: usize, timestamp: u64) -> MarketDepth {
        let bids = self
            .bids
            .iter()
            .rev()
            .take(levels)
            .map(|e| {
                let level = e.value().lock().expect("poisoned");
                DepthLevel {
                    price: *e.key(),
                    quantity: level.total_quantity(),
                    order_count: level.order_count(),
                }
            })
            .collect();
        let asks = self
            .asks
            .iter()
            .take(levels)
            .map(|e| {
                let level = e.value().lock().expect("poisoned");
                DepthLevel {
                    price: *e.key(),
                    quantity: level.total_quantity(),
                    order_count: level.order_count(),
                }
            })
            .collect();
        MarketDepth { bids, asks, timestamp }
    }

    fn side_map(&self, side: Side) -> &SkipMap<i128, Mutex<PriceLevel>> {
        // Resting orders are indexed by the side they rest on: a resting
        // buy order sits in `bids`.
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn opposite_side_map(&self, side: Side) -> &SkipMap<i128, Mutex<PriceLevel>> {
        self.side_map(side.opposite())
    }

    fn add_to_book(&self, order: Order) {
        let side = order.side;
        let price = order.price;
        let order_id = order.id;
        let side_map = self.side_map(side);
        let entry = side_map.get_or_insert(price, Mutex::new(PriceLevel::new(price)));
        entry
            .value()
            .lock()
            .expect("price level mutex poisoned")
            .push_back(order);
        self.order_locations
            .insert(order_id, OrderLocation { side, price });
    }

    /// `true` if enough opposing liquidity exists, within `order`'s limit
    /// (if any), to fill it completely without mutating the book.
    fn fok_reachable(&self, order: &Order) -> bool {
        let opposite = self.opposite_side_map(order.side);
        let mut available: i128 = 0;
        let iter: Box<dyn Iterator<Item = _>> = match order.side {
            Side::Buy => Box::new(opposite.iter()),
            Side::Sell => Box::new(opposite.iter().rev()),
        };
        for entry in iter {
            let price = *entry.key();
            if order.order_type == OrderType::Limit {
                match order.side {
                    Side::Buy if price > order.price => break,
                    Side::Sell if price < order.price => break,
                    _ => {}
                }
            }
            available += entry.value().lock().expect("poisoned").total_quantity();
            if available >= order.quantity {
                return true;
            }
        }
        available >= order.quantity
    }

    /// Matches `order` (the taker) against the opposite side, mutating
    /// resting levels and `order.filled` as it goes. Returns generated
    /// trades. Handles self-trade prevention per the book's configured
    /// [`STPMode`].
    fn match_order(
        &self,
        order: &mut Order,
        listener: &dyn BookListener,
    ) -> Result<Vec<Trade>, BookError> {
        let opposite = self.opposite_side_map(order.side);
        let mut trades = Vec::new();

        if opposite.is_empty() && order.order_type == OrderType::Market {
            return Err(BookError::InsufficientLiquidity { side: order.side });
        }

        'outer: loop {
            if order.remaining() == 0 {
                break;
            }
            let Some(entry) = (match order.side {
                Side::Buy => opposite.front(),
                Side::Sell => opposite.back(),
            }) else {
                break;
            };
            let price = *entry.key();
            if order.order_type == OrderType::Limit {
                match order.side {
                    Side::Buy if price > order.price => break,
                    Side::Sell if price < order.price => break,
                    _ => {}
                }
            }

            let mut level = entry.value().lock().expect("price level mutex poisoned");
            while order.remaining() > 0 {
                let Some(maker) = level.front().cloned() else {
                    break;
                };

                match stp::check(self.stp_mode, order, &maker) {
                    stp::STPAction::NoConflict => {}
                    stp::STPAction::CancelResting => {
                        level.pop_front();
                        self.order_locations.remove(&maker.id);
                        self.stats.orders_cancelled.fetch_add(1, Ordering::Relaxed);
                        notify(listener, |l| l.on_order_cancelled(maker.id));
                        continue;
                    }
                    stp::STPAction::CancelTaker => {
                        // Leaves `filled` at whatever this order already
                        // matched before the conflict; it does not fake a
                        // full fill. `place` checks `status` to report this
                        // as a cancellation rather than a fill.
                        order.status = OrderStatus::Cancelled;
                        break 'outer;
                    }
                    stp::STPAction::CancelBoth => {
                        level.pop_front();
                        self.order_locations.remove(&maker.id);
                        self.stats.orders_cancelled.fetch_add(1, Ordering::Relaxed);
                        notify(listener, |l| l.on_order_cancelled(maker.id));
                        order.status = OrderStatus::Cancelled;
                        break 'outer;
                    }
                }

                let fill_qty = order.remaining().min(maker.remaining());
                let trade_id = self.next_trade_id.fetch_add(1, Ordering::Relaxed);
                let (buy_id, sell_id, buyer, seller) = match order.side {
                    Side::Buy => (order.id, maker.id, order.account_id, maker.account_id),
                    Side::Sell => (maker.id, order.id, maker.account_id, order.account_id),
                };
                let trade = Trade {
                    id: trade_id,
                    symbol_id: self.symbol_id,
                    buy_order_id: buy_id,
                    sell_order_id: sell_id,
                    buyer_account_id: buyer,
                    seller_account_id: seller,
                    price,
                    quantity: fill_qty,
                    aggressor_side: order.side,
                    timestamp: order.timestamp,
                };

                order.filled += fill_qty;
                level.record_fill(fill_qty);
                let maker_fully_filled = maker.remaining() == fill_qty;
                if maker_fully_filled {
                    let filled_maker = level.pop_front().expect("front just peeked");
                    self.order_locations.remove(&filled_maker.id);
                    let mut filled_maker = filled_maker;
                    filled_maker.filled += fill_qty;
                    filled_maker.status = OrderStatus::Filled;
                    notify(listener, |l| l.on_order_filled(&filled_maker));
                } else if let Some(front) = level.front_mut() {
                    front.filled += fill_qty;
                    front.status = OrderStatus::Partial;
                    notify(listener, |l| l.on_order_partially_filled(front, fill_qty));
                }

                self.stats.trades.fetch_add(1, Ordering::Relaxed);
                notify(listener, |l| l.on_trade(&trade));
                trades.push(trade);
            }

            let level_empty = level.is_empty();
            drop(level);
            if level_empty {
                entry.remove();
            }
        }

        Ok(trades)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{AccountId, GroupType, OrderStatus};

    fn limit(id: u64, side: Side, price: i128, qty: i128) -> Order {
        Order {
            id: OrderId(id),
            symbol_id: 1,
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
    fn resting_order_waits_for_a_cross() {
        let book = OrderBook::new(1);
        let listener = NullListener;
        let trades = book.place(limit(1, Side::Buy, 100, 10), &listener).unwrap();
        assert!(trades.is_empty());
        assert_eq!(book.best_bid(), Some(100));
        assert!(book.has_order(OrderId(1)));
    }

    #[test]
    fn crossing_limit_orders_trade_at_maker_price() {
        let book = OrderBook::new(1);
        let listener = NullListener;
        book.place(limit(1, Side::Sell, 100, 10), &listener).unwrap();
        let trades = book.place(limit(2, Side::Buy, 105, 10), &listener).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, 100);
        assert_eq!(trades[0].quantity, 10);
        assert!(book.best_ask().is_none());
        assert!(book.best_bid().is_none());
    }

    #[test]
    fn price_time_priority_within_a_level() {
        let book = OrderBook::new(1);
        let listener = NullListener;
        book.place(limit(1, Side::Sell, 100, 5), &listener).unwrap();
        book.place(limit(2, Side::Sell, 100, 5), &listener).unwrap();
        let trades = book.place(limit(3, Side::Buy, 100, 5), &listener).unwrap();
        assert_eq!(trades[0].sell_order_id, OrderId(1));
        assert!(book.has_order(OrderId(2)));
        assert!(!book.has_order(OrderId(1)));
    }

    #[test]
    fn ioc_cancels_unmatched_residual() {
        let book = OrderBook::new(1);
        let listener = NullListener;
        let mut order = limit(1, Side::Buy, 100, 10);
        order.tif = TimeInForce::Ioc;
        let trades = book.place(order, &listener).unwrap();
        assert!(trades.is_empty());
        assert!(!book.has_order(OrderId(1)));
    }

    #[test]
    fn fok_rejects_when_liquidity_insufficient() {
        let book = OrderBook::new(1);
        let listener = NullListener;
        book.place(limit(1, Side::Sell, 100, 3), &listener).unwrap();
        let mut order = limit(2, Side::Buy, 100, 10);
        order.tif = TimeInForce::Fok;
        let result = book.place(order, &listener);
        assert_eq!(result, Err(BookError::FokUnreachable));
        assert!(book.has_order(OrderId(1)));
    }

    #[test]
    fn market_order_without_liquidity_errors() {
        let book = OrderBook::new(1);
        let listener = NullListener;
        let mut order = limit(1, Side::Buy, 0, 10);
        order.order_type = OrderType::Market;
        let result = book.place(order, &listener);
        assert_eq!(result, Err(BookError::InsufficientLiquidity { side: Side::Buy }));
    }

    #[test]
    fn cancel_removes_resting_order() {
        let book = OrderBook::new(1);
        let listener = NullListener;
        book.place(limit(1, Side::Buy, 100, 10), &listener).unwrap();
        let cancelled = book.cancel(OrderId(1)).unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(!book.has_order(OrderId(1)));
        assert_eq!(book.cancel(OrderId(1)), Err(BookError::OrderNotFound(OrderId(1))));
    }

    #[test]
    fn self_trade_prevention_cancels_resting_by_default() {
        let book = OrderBook::with_stp_mode(1, STPMode::CancelResting);
        let listener = NullListener;
        let acct = AccountId::new([9; 20], 0);
        let mut maker = limit(1, Side::Sell, 100, 10);
        maker.account_id = acct;
        maker.stp_group = 42;
        book.place(maker, &listener).unwrap();

        let mut taker = limit(2, Side::Buy, 100, 10);
        taker.account_id = acct;
        taker.stp_group = 42;
        let trades = book.place(taker, &listener).unwrap();

        assert!(trades.is_empty());
        assert!(!book.has_order(OrderId(1)));
        // Taker rests since its own liquidity was cancelled, not matched.
        assert!(book.has_order(OrderId(2)));
    }
}
