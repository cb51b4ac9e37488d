//! Stop and stop-limit order book: orders dormant until a trigger price is
//! crossed, then resubmitted as ordinary market/limit orders.
//!
//! Buy stops trigger on an uptick through `stop_price`; sell stops trigger
//! on a downtick through `stop_price`. `StopBook` only tracks orders and
//! decides when they fire; resubmission through
//! [`crate::book::OrderBook::place`] is the caller's responsibility.

use std::collections::BTreeMap;

use crate::order::{Order, OrderId, OrderType, Side};

/// Orders waiting for a stop trigger, indexed by `stop_price`.
#[derive(Debug, Default)]
pub struct StopBook {
    /// Buy stops: fire when the reference price rises to or through the
    /// key. Stored ascending so the lowest-triggering stops are visited
    /// first on an uptick.
    buy_stops: BTreeMap<i128, Vec<Order>>,
    /// Sell stops: fire when the reference price falls to or through the
    /// key.
    sell_stops: BTreeMap<i128, Vec<Order>>,
}

impl StopBook {
    /// Creates an empty stop book.
    #[must_use]
    pub fn new() -> Self {
        StopBook::default()
    }

    /// Adds a dormant stop or stop-limit order.
    pub fn add(&mut self, order: Order) {
        debug_assert!(order.order_type.is_conditional());
        let book = match order.side {
            Side::Buy => &mut self.buy_stops,
            Side::Sell => &mut self.sell_stops,
        };
        book.entry(order.stop_price).or_default().push(order);
    }

    /// Removes a dormant stop order by id, if present.
    pub fn cancel(&mut self, order_id: OrderId) -> Option<Order> {
        for book in [&mut self.buy_stops, &mut self.sell_stops] {
            for orders in book.values_mut() {
                if let Some(idx) = orders.iter().position(|o| o.id == order_id) {
                    return Some(orders.remove(idx));
                }
            }
        }
        None
    }

    /// Given a price move from `prev_price` to `last_price`, returns every
    /// order whose trigger fired, converted to its live order type
    /// (`Stop -> Market`, `StopLimit -> Limit`) and removed from this book.
    pub fn check_triggers(&mut self, prev_price: i128, last_price: i128) -> Vec<Order> {
        let mut triggered = Vec::new();

        if last_price > prev_price {
            let fired_prices: Vec<i128> = self
                .buy_stops
                .range(..=last_price)
                .map(|(price, _)| *price)
                .collect();
            for price in fired_prices {
                if let Some(orders) = self.buy_stops.remove(&price) {
                    triggered.extend(orders.into_iter().map(convert));
                }
            }
        }

        if last_price < prev_price {
            let fired_prices: Vec<i128> = self
                .sell_stops
                .range(last_price..)
                .map(|(price, _)| *price)
                .collect();
            for price in fired_prices {
                if let Some(orders) = self.sell_stops.remove(&price) {
                    triggered.extend(orders.into_iter().map(convert));
                }
            }
        }

        triggered
    }

    /// Total number of dormant orders across both sides.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buy_stops.values().map(Vec::len).sum::<usize>()
            + self.sell_stops.values().map(Vec::len).sum::<usize>()
    }

    /// `true` if no stop orders are resting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn convert(mut order: Order) -> Order {
    order.order_type = match order.order_type {
        OrderType::Stop => OrderType::Market,
        OrderType::StopLimit => OrderType::Limit,
        other => other,
    };
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{AccountId, GroupType, OrderStatus, TimeInForce};

    fn stop_order(id: u64, side: Side, stop_price: i128, order_type: OrderType) -> Order {
        Order {
            id: OrderId(id),
            symbol_id: 1,
            account_id: AccountId::new([0; 20], 0),
            side,
            order_type,
            tif: TimeInForce::Gtc,
            price: 0,
            quantity: 10,
            filled: 0,
            stop_price,
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
    fn buy_stop_triggers_on_uptick_through_stop_price() {
        let mut book = StopBook::new();
        book.add(stop_order(1, Side::Buy, 105, OrderType::Stop));
        let triggered = book.check_triggers(100, 106);
        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].order_type, OrderType::Market);
        assert!(book.is_empty());
    }

    #[test]
    fn sell_stop_triggers_on_downtick_through_stop_price() {
        let mut book = StopBook::new();
        book.add(stop_order(1, Side::Sell, 95, OrderType::StopLimit));
        let triggered = book.check_triggers(100, 94);
        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].order_type, OrderType::Limit);
    }

    #[test]
    fn stop_does_not_fire_on_a_move_that_does_not_cross_it() {
        let mut book = StopBook::new();
        book.add(stop_order(1, Side::Buy, 110, OrderType::Stop));
        let triggered = book.check_triggers(100, 105);
        assert!(triggered.is_empty());
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn cancel_removes_a_dormant_stop() {
        let mut book = StopBook::new();
        book.add(stop_order(1, Side::Buy, 110, OrderType::Stop));
        let cancelled = book.cancel(OrderId(1));
        assert!(cancelled.is_some());
        assert!(book.is_empty());
    }
}
