//! Convenience re-exports for the common path: place an order, read back
//! trades, settle them into the vault, and refresh the feed.
//!
//! ```
//! use exchange_core::prelude::*;
//! ```

pub use crate::book::{MatchMode, OrderBook};
pub use crate::book::listener::{BookListener, NullListener};
pub use crate::book::snapshot::{DepthLevel, MarketDepth};
pub use crate::engine::{EngineConfig, MatchingEngine, OrderResult};
pub use crate::error::{BookError, ExchangeError, VaultError};
pub use crate::feed::{MarkPriceConfig, MarkPriceFeed, MarkSnapshot};
pub use crate::feed::funding::FundingParams;
pub use crate::fixed::X18;
pub use crate::oracle::{AggregationMethod, AssetConfig, InMemoryOracle, Oracle};
pub use crate::order::{
    AccountId, GroupType, Order, OrderId, OrderStatus, OrderType, Side, TimeInForce, Trade,
};
pub use crate::risk;
pub use crate::vault::market::{Currency, MarketConfig, MarketFlags};
pub use crate::vault::{MarkPriceSource, Settlement, SettlementOutcome, Vault};
