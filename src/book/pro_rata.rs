//! Pro-rata allocation at a single price level, as an alternative to
//! price-time priority.
//!
//! Each resting order's share is
//! `order.remaining() * aggressor_qty / level_qty` (integer division),
//! with any remainder left by rounding distributed FIFO to the orders that
//! still have room for it.

use crate::book::level::PriceLevel;
use crate::order::{Order, Trade};

/// Matches `aggressor` against every order resting in `level`,
/// proportionally to each resting order's share of `level`'s total
/// quantity. Mutates `aggressor.filled` and removes fully-filled orders
/// from `level`. Returns the generated trades.
pub fn match_level(
    aggressor: &mut Order,
    level: &mut PriceLevel,
    symbol_id: u64,
    next_trade_id: &mut u64,
    timestamp: u64,
) -> Vec<Trade> {
    let mut trades = Vec::new();
    if level.is_empty() || aggressor.remaining() == 0 {
        return trades;
    }

    let aggressor_qty = aggressor.remaining();
    let level_qty = level.total_quantity();
    if level_qty == 0 {
        return trades;
    }

    let mut shares: Vec<(usize, i128)> = level
        .iter()
        .enumerate()
        .map(|(idx, order)| (idx, (order.remaining() * aggressor_qty) / level_qty))
        .filter(|(_, share)| *share > 0)
        .collect();

    let allocated: i128 = shares.iter().map(|(_, qty)| qty).sum();
    let mut remainder = aggressor_qty.min(level_qty) - allocated;
    if remainder > 0 {
        let remaining_by_idx: Vec<i128> = level.iter().map(Order::remaining).collect();
        for (idx, qty) in shares.iter_mut() {
            if remainder == 0 {
                break;
            }
            let cap = remaining_by_idx[*idx] - *qty;
            let extra = remainder.min(cap);
            *qty += extra;
            remainder -= extra;
        }
    }

    let price = level.price;
    for (idx, fill_qty) in shares {
        if fill_qty == 0 {
            continue;
        }
        let order = level
            .iter()
            .nth(idx)
            .expect("index computed from this level's own iterator");
        let fill_qty = fill_qty.min(aggressor.remaining()).min(order.remaining());
        if fill_qty == 0 {
            continue;
        }

        aggressor.filled += fill_qty;
        let order_id = order.id;
        let order_account = order.account_id;

        let (buy_id, sell_id, buyer, seller) = match aggressor.side {
            crate::order::Side::Buy => (aggressor.id, order_id, aggressor.account_id, order_account),
            crate::order::Side::Sell => (order_id, aggressor.id, order_account, aggressor.account_id),
        };

        trades.push(Trade {
            id: *next_trade_id,
            symbol_id,
            buy_order_id: buy_id,
            sell_order_id: sell_id,
            buyer_account_id: buyer,
            seller_account_id: seller,
            price,
            quantity: fill_qty,
            aggressor_side: aggressor.side,
            timestamp,
        });
        *next_trade_id += 1;
    }

    apply_fills_and_prune(level, &trades);

    trades
}

fn apply_fills_and_prune(level: &mut PriceLevel, trades: &[Trade]) {
    let mut filled_ids = std::collections::HashMap::new();
    for trade in trades {
        for id in [trade.buy_order_id, trade.sell_order_id] {
            *filled_ids.entry(id).or_insert(0i128) += trade.quantity;
        }
    }
    let ids: Vec<_> = filled_ids.keys().copied().collect();
    for id in ids {
        if let Some(order) = level.remove(id) {
            let delta = filled_ids[&id];
            let mut order = order;
            order.filled += delta;
            if order.remaining() > 0 {
                level.push_back(order);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{AccountId, GroupType, OrderId, OrderStatus, OrderType, Side, TimeInForce};

    fn order(id: u64, qty: i128) -> Order {
        Order {
            id: OrderId(id),
            symbol_id: 1,
            account_id: AccountId::new([id as u8; 20], 0),
            side: Side::Sell,
            order_type: OrderType::Limit,
            tif: TimeInForce::Gtc,
            price: 100,
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
    fn allocates_proportionally_to_resting_size() {
        let mut level = PriceLevel::new(100);
        level.push_back(order(1, 30));
        level.push_back(order(2, 70));

        let mut aggressor = order(3, 10);
        aggressor.side = Side::Buy;

        let mut next_id = 1;
        let trades = match_level(&mut aggressor, &mut level, 1, &mut next_id, 0);

        let total: i128 = trades.iter().map(|t| t.quantity).sum();
        assert_eq!(total, 10);
        assert_eq!(aggressor.filled, 10);
    }
}
