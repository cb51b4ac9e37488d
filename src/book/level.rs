//! A single price level: a FIFO queue of orders sharing one price, used for
//! price-time priority matching.
//!
//! Backed by a `VecDeque` since orders are owned by value rather than
//! referenced from an index structure.

use std::collections::VecDeque;

use crate::order::{Order, OrderId};

/// Orders resting at a single price, in time priority (oldest first).
#[derive(Debug, Default, Clone)]
pub struct PriceLevel {
    /// The price shared by every order in this level, in X18.
    pub price: i128,
    orders: VecDeque<Order>,
    /// Sum of `remaining()` across all orders at this level, kept in sync
    /// incrementally so depth queries are O(1).
    total_quantity: i128,
}

impl PriceLevel {
    /// Creates an empty level at `price`.
    #[must_use]
    pub fn new(price: i128) -> Self {
        PriceLevel {
            price,
            orders: VecDeque::new(),
            total_quantity: 0,
        }
    }

    /// Number of orders resting at this level.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Total remaining quantity resting at this level.
    #[must_use]
    pub fn total_quantity(&self) -> i128 {
        self.total_quantity
    }

    /// `true` if no orders remain at this level.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Appends `order` to the back of the queue (newest time priority).
    pub fn push_back(&mut self, order: Order) {
        self.total_quantity += order.remaining();
        self.orders.push_back(order);
    }

    /// The order with the best time priority (front of queue), if any.
    #[must_use]
    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    /// Mutable access to the front order.
    pub fn front_mut(&mut self) -> Option<&mut Order> {
        self.orders.front_mut()
    }

    /// Removes and returns the front order.
    pub fn pop_front(&mut self) -> Option<Order> {
        let order = self.orders.pop_front()?;
        self.total_quantity -= order.remaining();
        Some(order)
    }

    /// Removes the order with the given id from anywhere in the queue.
    /// Returns it if found. O(n) in level depth, a linear scan of the
    /// queue.
    pub fn remove(&mut self, order_id: OrderId) -> Option<Order> {
        let idx = self.orders.iter().position(|o| o.id == order_id)?;
        let order = self.orders.remove(idx)?;
        self.total_quantity -= order.remaining();
        Some(order)
    }

    /// Records that the front order's remaining quantity dropped by
    /// `filled_delta`; keeps `total_quantity` in sync without rescanning.
    pub fn record_fill(&mut self, filled_delta: i128) {
        self.total_quantity -= filled_delta;
    }

    /// Iterates orders in time priority.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }
}
