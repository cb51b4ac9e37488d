//! Bulk order submission.
//!
//! Each operation in a batch is applied atomically with respect to the
//! book it targets, but the batch as a whole is not a single transaction:
//! a later operation's failure does not roll back earlier ones, and
//! results accumulate per-entry as `OrderResult`/`CancelResult`.

use crate::engine::MatchingEngine;
use crate::error::ExchangeError;
use crate::order::{Order, OrderId, Trade};

/// One entry in a batch submission.
#[derive(Debug, Clone)]
pub enum BatchOperation {
    /// Place a new order.
    Place(Order),
    /// Cancel a resting order.
    Cancel {
        /// Symbol the order rests on.
        symbol_id: u64,
        /// Order to cancel.
        order_id: OrderId,
    },
    /// Cancel and resubmit a resting order with a new price/quantity.
    Modify {
        /// Symbol the order rests on.
        symbol_id: u64,
        /// Order to modify.
        order_id: OrderId,
        /// New limit price.
        new_price: i128,
        /// New order quantity.
        new_quantity: i128,
    },
}

/// Outcome of a single batch entry.
#[derive(Debug, Clone)]
pub struct BatchEntryResult {
    /// `Ok` trades generated, or the error this entry failed with.
    pub result: Result<Vec<Trade>, ExchangeError>,
}

/// Outcome of an entire batch.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    /// Per-entry outcomes, in submission order.
    pub entries: Vec<BatchEntryResult>,
    /// Every trade generated across the whole batch, in execution order.
    pub all_trades: Vec<Trade>,
}

/// Applies `operations` to `engine` in order, grouping nothing across
/// symbols: each entry still incurs its own per-book lock acquisition, but
/// entries for the same symbol benefit from cache locality by being
/// processed back-to-back when the caller has pre-sorted the batch by
/// `symbol_id`.
pub fn process_batch(engine: &MatchingEngine, operations: Vec<BatchOperation>) -> BatchResult {
    let mut result = BatchResult::default();
    for op in operations {
        let outcome = match op {
            BatchOperation::Place(order) => engine.place_order(order).map(|r| r.trades),
            BatchOperation::Cancel { symbol_id, order_id } => {
                engine.cancel_order(symbol_id, order_id).map(|_| Vec::new())
            }
            BatchOperation::Modify { symbol_id, order_id, new_price, new_quantity } => engine
                .modify_order(symbol_id, order_id, new_price, new_quantity)
                .map(|r| r.trades),
        };
        if let Ok(trades) = &outcome {
            result.all_trades.extend(trades.iter().copied());
        }
        result.entries.push(BatchEntryResult { result: outcome });
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::order::{AccountId, GroupType, OrderStatus, OrderType, Side, TimeInForce};

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
    fn batch_processes_all_entries_even_after_a_failure() {
        let engine = MatchingEngine::new(EngineConfig::default());
        engine.add_symbol(1);
        let ops = vec![
            BatchOperation::Cancel { symbol_id: 1, order_id: OrderId(99) },
            BatchOperation::Place(limit(1, Side::Buy, 100, 10)),
        ];
        let result = process_batch(&engine, ops);
        assert_eq!(result.entries.len(), 2);
        assert!(result.entries[0].result.is_err());
        assert!(result.entries[1].result.is_ok());
    }
}
