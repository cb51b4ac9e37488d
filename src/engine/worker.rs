//! Sharded asynchronous front door.
//!
//! One OS thread per shard pulls [`BatchOperation`]s off a `crossbeam`
//! channel and applies them to the shared [`MatchingEngine`]. Symbols are
//! assigned to shards by `symbol_id % shard_count`, so every operation for
//! a given symbol is always processed by the same thread and, combined with
//! `crossbeam`'s FIFO channel ordering, per-symbol order is preserved even
//! though shards run concurrently. Sharding by symbol removes the
//! cross-shard contention a single shared queue would suffer under
//! multi-symbol load.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{self, Sender};
use tracing::info;

use crate::engine::batch::{process_batch, BatchOperation, BatchResult};
use crate::engine::MatchingEngine;

/// A pool of shard worker threads, each bound to a disjoint subset of
/// symbols by `symbol_id % shard_count`.
pub struct ShardedWorkers {
    senders: Vec<Sender<ShardJob>>,
    handles: Vec<JoinHandle<()>>,
}

struct ShardJob {
    operations: Vec<BatchOperation>,
    reply: std::sync::mpsc::Sender<BatchResult>,
}

impl ShardedWorkers {
    /// Spawns `shard_count` worker threads against `engine`.
    #[must_use]
    pub fn spawn(engine: Arc<MatchingEngine>, shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        let mut senders = Vec::with_capacity(shard_count);
        let mut handles = Vec::with_capacity(shard_count);

        for shard_id in 0..shard_count {
            let (tx, rx) = channel::unbounded::<ShardJob>();
            let engine = Arc::clone(&engine);
            let handle = std::thread::Builder::new()
                .name(format!("exchange-core-shard-{shard_id}"))
                .spawn(move || {
                    info!(shard_id, "matching engine shard worker started");
                    while let Ok(job) = rx.recv() {
                        let result = process_batch(&engine, job.operations);
                        let _ = job.reply.send(result);
                    }
                    info!(shard_id, "matching engine shard worker stopped");
                })
                .expect("failed to spawn shard worker thread");
            senders.push(tx);
            handles.push(handle);
        }

        ShardedWorkers { senders, handles }
    }

    /// Number of live shards.
    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.senders.len()
    }

    /// Routes `operations` to the shard owning `symbol_id` and blocks for
    /// the result.
    pub fn submit(&self, symbol_id: u64, operations: Vec<BatchOperation>) -> BatchResult {
        let shard = (symbol_id as usize) % self.senders.len();
        let (reply_tx, reply_rx) = std::sync::mpsc::channel();
        self.senders[shard]
            .send(ShardJob { operations, reply: reply_tx })
            .expect("shard worker thread has exited");
        reply_rx.recv().expect("shard worker dropped without replying")
    }

    /// Closes every shard's channel and joins its thread. Blocks until all
    /// in-flight jobs drain.
    pub fn shutdown(self) {
        drop(self.senders);
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::order::{AccountId, GroupType, Order, OrderId, OrderStatus, OrderType, Side, TimeInForce};

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
    fn routes_symbol_work_to_a_consistent_shard() {
        let engine = Arc::new(MatchingEngine::new(EngineConfig::default()));
        engine.add_symbol(7);
        let workers = ShardedWorkers::spawn(Arc::clone(&engine), 4);

        let result = workers.submit(7, vec![BatchOperation::Place(limit(1, 7, Side::Buy, 100, 10))]);
        assert_eq!(result.entries.len(), 1);
        assert!(result.entries[0].result.is_ok());

        workers.shutdown();
        assert!(engine.get_order(7, OrderId(1)).is_some());
    }
}
