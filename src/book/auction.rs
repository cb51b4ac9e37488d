//! Single clearing-price batch auction, as used for opening/closing calls.
//!
//! Finds the price that maximizes matched volume (ties broken by minimal
//! imbalance), then matches every order priced through that level in time
//! priority, all at the single clearing price.

use std::collections::BTreeSet;

use crate::order::{Order, Side, Trade};

/// Outcome of an auction clearing-price calculation.
#[derive(Debug, Clone)]
pub struct AuctionResult {
    /// The price every matched trade executes at.
    pub clearing_price: i128,
    /// Total quantity matched at `clearing_price`.
    pub matched_volume: i128,
    /// Unmatched quantity left over on the heavier side.
    pub imbalance: i128,
    /// Which side carries the imbalance.
    pub imbalance_side: Side,
}

impl Default for AuctionResult {
    fn default() -> Self {
        AuctionResult {
            clearing_price: 0,
            matched_volume: 0,
            imbalance: 0,
            imbalance_side: Side::Buy,
        }
    }
}

/// A resting price level's aggregate quantity, as seen by the auction
/// (independent of the live `book::level::PriceLevel`/SkipMap structure so
/// this module can be unit-tested against plain vectors).
#[derive(Debug, Clone, Copy)]
pub struct LevelQuantity {
    /// The level's price.
    pub price: i128,
    /// Total remaining quantity resting at this price.
    pub quantity: i128,
}

/// Computes the clearing price over `bids`/`asks` (each given as
/// `(price, total_quantity)` pairs, no ordering assumed).
#[must_use]
pub fn calculate_clearing_price(bids: &[LevelQuantity], asks: &[LevelQuantity]) -> AuctionResult {
    if bids.is_empty() || asks.is_empty() {
        return AuctionResult::default();
    }

    let mut all_prices: BTreeSet<i128> = BTreeSet::new();
    for level in bids.iter().chain(asks.iter()) {
        all_prices.insert(level.price);
    }

    let mut best = AuctionResult::default();
    let mut best_volume = 0i128;
    let mut best_imbalance = i128::MAX;

    for price in all_prices {
        let bid_qty: i128 = bids.iter().filter(|l| l.price >= price).map(|l| l.quantity).sum();
        let ask_qty: i128 = asks.iter().filter(|l| l.price <= price).map(|l| l.quantity).sum();
        let matched = bid_qty.min(ask_qty);
        let imbalance = (bid_qty - ask_qty).abs();

        if matched > best_volume || (matched == best_volume && imbalance < best_imbalance) {
            best_volume = matched;
            best_imbalance = imbalance;
            best = AuctionResult {
                clearing_price: price,
                matched_volume: matched,
                imbalance,
                imbalance_side: if bid_qty > ask_qty { Side::Buy } else { Side::Sell },
            };
        }
    }

    best
}

/// Matches every order priced through `clearing_price`, in time priority,
/// all executing at `clearing_price`. Mutates `buy_orders`/`sell_orders` in
/// place (their `filled` fields) and returns the generated trades.
///
/// Callers are expected to have already collected the participating orders
/// (bids at or above `clearing_price`, asks at or below it) sorted by
/// `timestamp` ascending.
pub fn execute(
    buy_orders: &mut [Order],
    sell_orders: &mut [Order],
    clearing_price: i128,
    symbol_id: u64,
    next_trade_id: &mut u64,
    timestamp: u64,
) -> Vec<Trade> {
    let mut trades = Vec::new();
    let mut bi = 0;
    let mut si = 0;

    while bi < buy_orders.len() && si < sell_orders.len() {
        if buy_orders[bi].remaining() == 0 {
            bi += 1;
            continue;
        }
        if sell_orders[si].remaining() == 0 {
            si += 1;
            continue;
        }

        let fill_qty = buy_orders[bi].remaining().min(sell_orders[si].remaining());
        buy_orders[bi].filled += fill_qty;
        sell_orders[si].filled += fill_qty;

        let trade = Trade {
            id: *next_trade_id,
            symbol_id,
            buy_order_id: buy_orders[bi].id,
            sell_order_id: sell_orders[si].id,
            buyer_account_id: buy_orders[bi].account_id,
            seller_account_id: sell_orders[si].account_id,
            price: clearing_price,
            quantity: fill_qty,
            // An auction has no aggressor; Buy is the documented convention.
            aggressor_side: Side::Buy,
            timestamp,
        };
        *next_trade_id += 1;
        trades.push(trade);

        if buy_orders[bi].remaining() == 0 {
            bi += 1;
        }
        if sell_orders[si].remaining() == 0 {
            si += 1;
        }
    }

    trades
}
