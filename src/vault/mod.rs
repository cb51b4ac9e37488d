//! The vault (clearinghouse): accounts, collateral, perpetual positions,
//! margin, funding, and liquidation.
//!
//! The vault is an independent top-level object — it is handed a
//! mark-price source by reference on each call that needs one rather than
//! owning a [`crate::feed::MarkPriceFeed`] directly, so the two components
//! stay decoupled.

pub mod account;
pub mod funding;
pub mod insurance;
pub mod liquidation;
pub mod margin;
pub mod market;
pub mod position;

use std::sync::Mutex;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::error::VaultError;
use crate::fixed::X18;
use crate::order::AccountId;

use account::BalanceSheet;
use insurance::InsuranceFund;
use liquidation::LiquidationOutcome;
use margin::{compute_margin_info, MarginInfo, PositionExposure};
use market::{Currency, MarketConfig};
use position::Position;

/// A source of current mark prices, injected into vault calls that need
/// one. Implemented for [`crate::feed::MarkPriceFeed`] below so the two
/// components stay decoupled (neither owns the other).
pub trait MarkPriceSource {
    /// The current mark price for `market_id`, if known.
    fn mark_price(&self, market_id: u64) -> Option<X18>;
}

impl MarkPriceSource for crate::feed::MarkPriceFeed {
    fn mark_price(&self, market_id: u64) -> Option<X18> {
        self.last_mark(market_id).map(|snapshot| snapshot.mark)
    }
}

/// One matched fill handed to the vault by the engine via `apply_fills`.
#[derive(Debug, Clone, Copy)]
pub struct Settlement {
    /// The resting (passive) side's account.
    pub maker: AccountId,
    /// The aggressing (active) side's account.
    pub taker: AccountId,
    /// Market the fill occurred on.
    pub market_id: u64,
    /// `true` if the taker was buying.
    pub taker_is_buy: bool,
    /// Fill size (unsigned).
    pub size: X18,
    /// Fill price.
    pub price: X18,
    /// Maker fee fraction (may be negative: a rebate).
    pub maker_fee: X18,
    /// Taker fee fraction.
    pub taker_fee: X18,
}

/// Outcome of applying a single [`Settlement`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettlementOutcome {
    /// P&L realised by the maker, if their position shrank or flipped.
    pub maker_realized_pnl: X18,
    /// P&L realised by the taker, if their position shrank or flipped.
    pub taker_realized_pnl: X18,
}

/// The clearinghouse: collateral, positions, market configuration, and the
/// insurance fund.
#[derive(Default)]
pub struct Vault {
    markets: DashMap<u64, MarketConfig>,
    balances: BalanceSheet,
    positions: DashMap<(AccountId, u64), Position>,
    account_locks: DashMap<AccountId, Mutex<()>>,
    insurance: InsuranceFund,
}

impl Vault {
    /// A vault with no markets, accounts, or positions.
    #[must_use]
    pub fn new() -> Self {
        Vault::default()
    }

    /// Registers a new market. Rejected if `market_id` is already taken or
    /// the margin fractions are invalid.
    pub fn create_market(&self, config: MarketConfig) -> Result<(), VaultError> {
        config.validate()?;
        if self.markets.contains_key(&config.market_id) {
            return Err(VaultError::MarketAlreadyExists);
        }
        info!(market_id = config.market_id, "market created");
        self.markets.insert(config.market_id, config);
        Ok(())
    }

    /// Replaces an existing market's config. Rejected if the market is
    /// unknown or the new margin fractions are invalid.
    pub fn update_market(&self, config: MarketConfig) -> Result<(), VaultError> {
        config.validate()?;
        let mut entry = self.markets.get_mut(&config.market_id).ok_or(VaultError::MarketNotFound)?;
        *entry = config;
        Ok(())
    }

    /// The current config for `market_id`.
    #[must_use]
    pub fn market(&self, market_id: u64) -> Option<MarketConfig> {
        self.markets.get(&market_id).map(|m| *m)
    }

    /// Credits collateral to `(account, currency)`.
    pub fn deposit(&self, account: AccountId, currency: Currency, amount: X18) {
        self.balances.deposit(account, currency, amount);
    }

    /// Debits collateral from `(account, currency)`. Rejected if it would
    /// reduce free margin below zero given the account's open positions in
    /// `currency`, or if it would leave the raw balance negative (the
    /// final guard, reached only when the account holds no positions).
    pub fn withdraw(&self, account: AccountId, currency: Currency, amount: X18, marks: &dyn MarkPriceSource) -> Result<(), VaultError> {
        let info = self.get_margin_info(account, currency, marks);
        if info.free_margin < amount {
            return Err(VaultError::InsufficientMargin);
        }
        self.balances.withdraw(account, currency, amount)
    }

    /// Moves collateral between accounts in the same currency.
    pub fn transfer(&self, from: AccountId, to: AccountId, currency: Currency, amount: X18) -> Result<(), VaultError> {
        self.balances.transfer(from, to, currency, amount)
    }

    /// The current `(account, currency)` balance.
    #[must_use]
    pub fn balance(&self, account: AccountId, currency: Currency) -> X18 {
        self.balances.balance(account, currency)
    }

    /// The current position for `(account, market_id)`, or a flat one.
    #[must_use]
    pub fn position(&self, account: AccountId, market_id: u64) -> Position {
        self.positions.get(&(account, market_id)).map(|p| *p).unwrap_or_else(Position::flat)
    }

    fn account_lock(&self, account: AccountId) -> dashmap::mapref::one::Ref<'_, AccountId, Mutex<()>> {
        self.account_locks.entry(account).or_insert_with(|| Mutex::new(()));
        self.account_locks.get(&account).expect("just inserted")
    }

    /// Applies each settlement in order. Atomicity is per-settlement, not
    /// batch-wide: a single bad settlement is skipped (its error returned
    /// in place) rather than rolling back prior ones.
    pub fn apply_fills(&self, settlements: &[Settlement], marks: &dyn MarkPriceSource) -> Vec<Result<SettlementOutcome, VaultError>> {
        settlements.iter().map(|s| self.apply_one_settlement(s, marks)).collect()
    }

    fn apply_one_settlement(&self, settlement: &Settlement, marks: &dyn MarkPriceSource) -> Result<SettlementOutcome, VaultError> {
        let config = self.market(settlement.market_id).ok_or(VaultError::MarketNotFound)?;
        if !config.is_active() {
            return Err(VaultError::MarketNotFound);
        }
        let mark = marks.mark_price(settlement.market_id).unwrap_or(settlement.price);

        let taker_delta = if settlement.taker_is_buy { settlement.size } else { -settlement.size };
        let maker_delta = -taker_delta;

        // Lock accounts in a fixed order (lower account id first) to avoid
        // deadlocking against a concurrent settlement touching the same
        // pair in the opposite order.
        let (first, second) = if settlement.taker <= settlement.maker {
            (settlement.taker, settlement.maker)
        } else {
            (settlement.maker, settlement.taker)
        };
        let first_lock = self.account_lock(first);
        let _first_guard = first_lock.lock().expect("account lock poisoned");
        let second_lock = self.account_lock(second);
        let _second_guard = second_lock.lock().expect("account lock poisoned");

        self.check_opening_margin(settlement.taker, &config, taker_delta, mark)?;
        if config.is_reduce_only() && grows_exposure(self.position(settlement.taker, settlement.market_id).size, taker_delta) {
            return Err(VaultError::InsufficientMargin);
        }
        self.check_opening_margin(settlement.maker, &config, maker_delta, mark)?;
        if config.is_reduce_only() && grows_exposure(self.position(settlement.maker, settlement.market_id).size, maker_delta) {
            return Err(VaultError::InsufficientMargin);
        }

        let taker_realized = self.apply_position_delta(settlement.taker, settlement.market_id, taker_delta, settlement.price);
        let maker_realized = self.apply_position_delta(settlement.maker, settlement.market_id, maker_delta, settlement.price);

        let notional = settlement.size.mul(settlement.price);
        self.balances.adjust(settlement.taker, config.quote_currency, taker_realized - notional.mul(settlement.taker_fee));
        self.balances.adjust(settlement.maker, config.quote_currency, maker_realized - notional.mul(settlement.maker_fee));

        debug!(
            market_id = settlement.market_id,
            taker = %settlement.taker,
            maker = %settlement.maker,
            size = %settlement.size,
            price = %settlement.price,
            "settlement applied"
        );

        Ok(SettlementOutcome { maker_realized_pnl: maker_realized, taker_realized_pnl: taker_realized })
    }

    fn check_opening_margin(&self, account: AccountId, config: &MarketConfig, delta: X18, mark: X18) -> Result<(), VaultError> {
        let position = self.position(account, config.market_id);
        let new_size = position.size + delta;
        let flipped_sign = !position.is_flat() && !new_size.is_zero()
            && position.size.is_positive() != new_size.is_positive();
        let opening = if flipped_sign {
            new_size.abs()
        } else {
            (new_size.abs() - position.size.abs()).clamp(X18::ZERO, new_size.abs())
        };
        if opening.is_zero() {
            return Ok(());
        }
        let required = opening.mul(mark).mul(config.initial_margin);
        let info = self.get_margin_info(account, config.quote_currency, &SingleMark { market_id: config.market_id, mark });
        if info.free_margin < required {
            return Err(VaultError::InsufficientMargin);
        }
        Ok(())
    }

    fn apply_position_delta(&self, account: AccountId, market_id: u64, delta: X18, price: X18) -> X18 {
        let mut entry = self.positions.entry((account, market_id)).or_insert_with(Position::flat);
        entry.apply_delta(delta, price)
    }

    /// Aggregates margin state for `account` across every position priced
    /// in `quote_currency` (positions in other markets are ignored — the
    /// vault assumes each market settles into a single margin currency per
    /// account, matching the common single-quote-currency perp venue).
    #[must_use]
    pub fn get_margin_info(&self, account: AccountId, quote_currency: Currency, marks: &dyn MarkPriceSource) -> MarginInfo {
        let collateral = self.balances.balance(account, quote_currency);
        let exposures: Vec<PositionExposure> = self
            .positions
            .iter()
            .filter(|entry| entry.key().0 == account)
            .filter_map(|entry| {
                let market_id = entry.key().1;
                let config = self.markets.get(&market_id)?;
                if config.quote_currency != quote_currency || entry.value().is_flat() {
                    return None;
                }
                let mark = marks.mark_price(market_id)?;
                Some(PositionExposure {
                    size: entry.value().size,
                    entry_price: entry.value().entry_price,
                    mark_price: mark,
                    initial_margin_fraction: config.initial_margin,
                    maintenance_margin_fraction: config.maintenance_margin,
                })
            })
            .collect();
        compute_margin_info(collateral, &exposures)
    }

    /// `true` if `account`'s margin state (in `quote_currency`) is below
    /// maintenance.
    #[must_use]
    pub fn is_liquidatable(&self, account: AccountId, quote_currency: Currency, marks: &dyn MarkPriceSource) -> bool {
        self.get_margin_info(account, quote_currency, marks).liquidatable
    }

    /// Liquidates up to `size` of `account`'s position in `market_id`,
    /// crediting the liquidator and insurance fund their penalty shares.
    /// Any shortfall beyond the penalty (bankrupt account) is drawn from
    /// the insurance fund directly; a remaining uncovered shortfall is the
    /// caller's signal to invoke ADL via [`liquidation::socialize_shortfall`].
    pub fn liquidate(
        &self,
        liquidator: AccountId,
        account: AccountId,
        market_id: u64,
        size: X18,
        marks: &dyn MarkPriceSource,
    ) -> Result<LiquidationOutcome, VaultError> {
        let config = self.market(market_id).ok_or(VaultError::MarketNotFound)?;
        if !self.is_liquidatable(account, config.quote_currency, marks) {
            return Err(VaultError::NotLiquidatable);
        }
        let mark = marks.mark_price(market_id).ok_or(VaultError::PriceStale)?;
        let position = self.position(account, market_id);
        if position.is_flat() {
            return Err(VaultError::PositionNotFound);
        }

        let outcome = liquidation::compute_liquidation(
            position.size,
            position.entry_price,
            mark,
            size,
            config.liquidation_penalty_rate,
            config.liquidator_penalty_share,
        );

        self.apply_position_delta(account, market_id, outcome.closed_size, mark);
        self.balances.adjust(account, config.quote_currency, -outcome.penalty_total);
        self.balances.adjust(liquidator, config.quote_currency, outcome.to_liquidator);
        self.insurance.contribute(outcome.to_insurance);

        if outcome.bankrupt {
            let shortfall = (outcome.penalty_total - outcome.realized_pnl).max(X18::ZERO);
            let drawn = self.insurance.withdraw(shortfall);
            warn!(
                account = %account,
                market_id,
                shortfall = %shortfall,
                drawn_from_insurance = %drawn,
                "liquidation left account bankrupt"
            );
        }

        Ok(outcome)
    }

    /// Accrues funding for every open position in `market_id` against the
    /// current `funding_rate` and `mark` price, for `elapsed_secs` since
    /// the last tick. Accrual is event-driven: callers invoke this
    /// explicitly (e.g. on a scheduler tick); it does not run on every
    /// fill.
    pub fn accrue_funding(&self, market_id: u64, funding_rate: X18, mark: X18, elapsed_secs: u64, funding_interval_secs: u64, now_secs: u64) {
        let Some(config) = self.market(market_id) else { return };
        for mut entry in self.positions.iter_mut() {
            if entry.key().1 != market_id || entry.value().is_flat() {
                continue;
            }
            let payment = funding::compute_funding_payment(entry.value().size, mark, funding_rate, elapsed_secs, funding_interval_secs);
            self.balances.adjust(entry.key().0, config.quote_currency, payment);
            entry.value_mut().accumulated_funding = entry.value().accumulated_funding + payment;
            entry.value_mut().last_funding_time = now_secs;
        }
    }

    /// The insurance fund's current balance.
    #[must_use]
    pub fn insurance_balance(&self) -> X18 {
        self.insurance.balance()
    }
}

fn grows_exposure(current_size: X18, delta: X18) -> bool {
    if current_size.is_zero() {
        return !delta.is_zero();
    }
    let same_direction = current_size.is_positive() == delta.is_positive();
    same_direction && (current_size + delta).abs() > current_size.abs()
}

/// A trivial [`MarkPriceSource`] pinned to a single market, used internally
/// to re-enter `get_margin_info` while only one mark price is in scope
/// (the opening-margin pre-check).
struct SingleMark {
    market_id: u64,
    mark: X18,
}

impl MarkPriceSource for SingleMark {
    fn mark_price(&self, market_id: u64) -> Option<X18> {
        if market_id == self.market_id {
            Some(self.mark)
        } else {
            None
        }
    }
}
