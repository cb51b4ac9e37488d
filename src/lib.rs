//! # Exchange Core
//!
//! A matching engine, clearinghouse vault, and mark-price feed for a
//! perpetual-futures exchange.
//!
//! ## Components
//!
//! - [`fixed`] — signed 128-bit fixed-point arithmetic at an implicit
//!   `10^18` scale ("X18"), used for every price, size, and balance.
//! - [`order`] — shared domain types: orders, trades, accounts, and the
//!   enums carried across the external interface.
//! - [`book`] — the per-symbol order book: price-time priority matching,
//!   self-trade prevention, optional auction and pro-rata matchers, and
//!   the stop-order book.
//! - [`engine`] — multi-symbol dispatch over a map of books, batching, and
//!   optional sharded async workers.
//! - [`oracle`] — the narrow collaborator interface the feed consumes for
//!   an aggregated external index price.
//! - [`feed`] — premium tracking, mark-price construction, funding-rate
//!   derivation, and conditional-order trigger evaluation.
//! - [`vault`] — collateral, perpetual positions, margin, funding accrual,
//!   and liquidation with an insurance-fund backstop.
//! - [`risk`] — pre-trade margin checks and bankruptcy detection, wired
//!   against the vault and feed by reference.
//! - [`error`] — the crate's error taxonomy and canonical error codes.
//!
//! ## Design
//!
//! The engine, vault, and feed are independent top-level objects with no
//! ownership between them; the order flow from placing an order to
//! settling a trade to recomputing mark and funding is wired by the
//! caller, not by any one component reaching into another. See
//! `DESIGN.md` for the grounding behind each module.

pub mod book;
pub mod engine;
pub mod error;
pub mod feed;
pub mod fixed;
pub mod oracle;
pub mod order;
pub mod risk;
pub mod vault;

pub mod prelude;

pub use error::{BookError, ExchangeError, VaultError};
pub use fixed::X18;
pub use order::{AccountId, Order, OrderId, OrderStatus, OrderType, Side, TimeInForce, Trade};
