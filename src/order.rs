//! Order, trade, and account domain types shared by the book, engine, and
//! vault.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Process-unique monotonic order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing generator for [`OrderId`] and trade ids.
///
/// An explicit value the engine owns rather than a process-wide static,
/// so tests can run with independent counters.
#[derive(Debug)]
pub struct IdGenerator(AtomicU64);

impl IdGenerator {
    /// Creates a generator whose first `next()` call returns `start`.
    #[must_use]
    pub fn starting_at(start: u64) -> Self {
        IdGenerator(AtomicU64::new(start))
    }

    /// Returns the next id in the sequence.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        IdGenerator::starting_at(1)
    }
}

/// A trading account: the main address that owns it plus a sub-account
/// index. Each `(main_address, subaccount_id)` pair is an independent risk
/// unit even though the main address owns every sub-account under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId {
    /// 20-byte address of the owning wallet/entity.
    pub main_address: [u8; 20],
    /// Sub-account index under `main_address`.
    pub subaccount_id: u32,
}

impl AccountId {
    /// Constructs an account id for sub-account `subaccount_id` of
    /// `main_address`.
    #[must_use]
    pub fn new(main_address: [u8; 20], subaccount_id: u32) -> Self {
        AccountId {
            main_address,
            subaccount_id,
        }
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.main_address {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "/{}", self.subaccount_id)
    }
}

/// Side of an order or trade.
///
/// Stable integer codes per the external-interfaces contract:
/// `0 = Buy`, `1 = Sell`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Buyer / long side.
    Buy = 0,
    /// Seller / short side.
    Sell = 1,
}

impl Side {
    /// The opposite side.
    #[must_use]
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Order type. Stable integer codes per the external-interfaces contract:
/// `0 = Limit`, `1 = Market`, `2 = Stop`, `3 = StopLimit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderType {
    /// Rests at `price` if not immediately matched (subject to TIF).
    Limit = 0,
    /// Crosses every price on the opposite side until filled or liquidity
    /// is exhausted; never rests.
    Market = 1,
    /// Dormant until `stop_price` triggers, then becomes a `Market` order.
    Stop = 2,
    /// Dormant until `stop_price` triggers, then becomes a `Limit` order.
    StopLimit = 3,
}

impl OrderType {
    /// `true` for `Stop` and `StopLimit`.
    #[must_use]
    pub fn is_conditional(self) -> bool {
        matches!(self, OrderType::Stop | OrderType::StopLimit)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderType::Limit => "limit",
            OrderType::Market => "market",
            OrderType::Stop => "stop",
            OrderType::StopLimit => "stop-limit",
        };
        write!(f, "{s}")
    }
}

/// Time-in-force policy. Stable integer codes per the external-interfaces
/// contract: `0 = GTC`, `1 = IOC`, `2 = FOK`, `3 = GTD`, `4 = DAY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TimeInForce {
    /// Good till cancel: residual rests indefinitely.
    Gtc = 0,
    /// Immediate or cancel: residual is cancelled, never rests.
    Ioc = 1,
    /// Fill or kill: filled completely or rejected with zero trades.
    Fok = 2,
    /// Good till date: residual rests until `expire_time`.
    Gtd = 3,
    /// Day order: residual rests until the configured market close.
    Day = 4,
}

impl TimeInForce {
    /// `true` if a partial/full residual is allowed to rest in the book.
    #[must_use]
    pub fn allows_resting(self) -> bool {
        matches!(self, TimeInForce::Gtc | TimeInForce::Gtd | TimeInForce::Day)
    }
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeInForce::Gtc => "GTC",
            TimeInForce::Ioc => "IOC",
            TimeInForce::Fok => "FOK",
            TimeInForce::Gtd => "GTD",
            TimeInForce::Day => "DAY",
        };
        write!(f, "{s}")
    }
}

/// Order lifecycle status. Stable integer codes per the external-interfaces
/// contract: `0 = New`, `1 = Partial`, `2 = Filled`, `3 = Cancelled`,
/// `4 = Rejected`, `5 = Expired`, `6 = Triggered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderStatus {
    /// Accepted, no fills yet.
    New = 0,
    /// `0 < filled < quantity`.
    Partial = 1,
    /// `filled == quantity`.
    Filled = 2,
    /// Cancelled by the user or by IOC/STP residual cleanup.
    Cancelled = 3,
    /// Rejected at the boundary; no state change occurred.
    Rejected = 4,
    /// Expired by an external scheduler honouring `expire_time`.
    Expired = 5,
    /// A stop/stop-limit order whose trigger fired and was resubmitted.
    Triggered = 6,
}

impl OrderStatus {
    /// `true` for `New` and `Partial` — order is still live in the book.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, OrderStatus::New | OrderStatus::Partial)
    }
}

/// Grouping semantics for linked orders (OCO / bracket orders).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum GroupType {
    /// No grouping.
    None = 0,
    /// One-cancels-other: filling/cancelling one cancels its siblings.
    Oco = 1,
    /// Bracket: an entry order plus take-profit/stop-loss children.
    Bracket = 2,
}

/// A resting or incoming order.
///
/// Invariants: `0 <= filled <= quantity`; `status == Filled` iff
/// `filled == quantity`; `price > 0` for limit orders; stop orders carry a
/// positive `stop_price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Process-unique monotonic identifier.
    pub id: OrderId,
    /// Market this order routes to.
    pub symbol_id: u64,
    /// Owning account.
    pub account_id: AccountId,
    /// Buy or sell.
    pub side: Side,
    /// Limit, market, stop, or stop-limit.
    pub order_type: OrderType,
    /// Time-in-force policy.
    pub tif: TimeInForce,
    /// Limit price in X18. Ignored for pure market orders.
    pub price: i128,
    /// Original order quantity in X18.
    pub quantity: i128,
    /// Cumulative filled quantity in X18. `0 <= filled <= quantity`.
    pub filled: i128,
    /// Trigger price for stop / stop-limit orders.
    pub stop_price: i128,
    /// Self-trade-prevention tag. `0` disables STP for this order.
    pub stp_group: u64,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Optional 16-byte client-supplied identifier, echoed back verbatim.
    pub client_oid: Option<uuid::Uuid>,
    /// OCO/bracket group identifier. `0` means ungrouped.
    pub group_id: u64,
    /// Semantics of `group_id`.
    pub group_type: GroupType,
    /// Nanosecond acceptance timestamp.
    pub timestamp: u64,
    /// Expiry for GTD orders, nanoseconds. `0` means no expiry.
    pub expire_time: u64,
}

impl Order {
    /// Remaining (unfilled) quantity: `quantity - filled`.
    #[must_use]
    pub fn remaining(&self) -> i128 {
        self.quantity - self.filled
    }

    /// `true` if `side == Buy`.
    #[must_use]
    pub fn is_buy(&self) -> bool {
        self.side == Side::Buy
    }

    /// `true` if fully filled.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.remaining() == 0
    }

    /// `true` if the order is still live (new or partially filled).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// An immutable, append-only record of a single match between two orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Monotonically increasing within a symbol; not ordered across symbols.
    pub id: u64,
    /// Market this trade occurred on.
    pub symbol_id: u64,
    /// The buy-side order's id.
    pub buy_order_id: OrderId,
    /// The sell-side order's id.
    pub sell_order_id: OrderId,
    /// The buy-side order's account.
    pub buyer_account_id: AccountId,
    /// The sell-side order's account.
    pub seller_account_id: AccountId,
    /// Execution price in X18: always the resting order's price.
    pub price: i128,
    /// Execution quantity in X18. Always positive.
    pub quantity: i128,
    /// Which side was the aggressor (taker) in this match.
    pub aggressor_side: Side,
    /// Nanosecond timestamp.
    pub timestamp: u64,
}
