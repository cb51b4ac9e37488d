//! Price feed / mark-price engine.
//!
//! Per-market state sits behind a `RwLock`, matching the reader/writer
//! discipline used elsewhere in this crate for shared per-market state.

pub mod funding;
pub mod premium;
pub mod trigger;

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use crate::fixed::X18;
use funding::FundingParams;
use premium::PremiumTracker;

/// Tunable mark-price construction parameters for one market.
#[derive(Debug, Clone, Copy)]
pub struct MarkPriceConfig {
    /// EWMA decay window, seconds.
    pub premium_ewma_window_secs: u64,
    /// Notional used to estimate market impact (reserved for future use by
    /// callers sizing the impact-adjusted index; not consumed internally).
    pub impact_notional: X18,
    /// Upper clamp on the premium fraction applied to the index.
    pub max_premium: X18,
    /// Lower clamp on the premium fraction applied to the index.
    pub min_premium: X18,
    /// Use the book mid-price (rather than last trade) as the premium
    /// reference when sampling.
    pub use_mid_price: bool,
    /// Also bound the mark within ±`max_premium` of the index directly.
    pub cap_to_oracle: bool,
}

/// A computed mark snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkSnapshot {
    /// The oracle index price this mark was derived from.
    pub index: X18,
    /// The constructed mark price.
    pub mark: X18,
    /// The premium fraction used to derive `mark` from `index`.
    pub premium: X18,
    /// When this snapshot was computed, in seconds.
    pub timestamp_secs: u64,
}

struct MarketFeedState {
    config: MarkPriceConfig,
    funding_params: FundingParams,
    premium: PremiumTracker,
    last_trade_price: Option<X18>,
    best_bid: Option<X18>,
    best_ask: Option<X18>,
    last_mark: Option<MarkSnapshot>,
    funding_rate: X18,
    next_funding_time_secs: u64,
}

/// Tracks mark price, premium, and funding for every registered market.
#[derive(Default)]
pub struct MarkPriceFeed {
    markets: RwLock<HashMap<u64, MarketFeedState>>,
}

impl MarkPriceFeed {
    /// Creates a feed tracking no markets.
    #[must_use]
    pub fn new() -> Self {
        MarkPriceFeed::default()
    }

    /// Registers `market_id`, replacing any existing state for it.
    pub fn register_market(&self, market_id: u64, config: MarkPriceConfig, funding_params: FundingParams) {
        let mut markets = self.markets.write().expect("feed lock poisoned");
        markets.insert(
            market_id,
            MarketFeedState {
                config,
                funding_params,
                premium: PremiumTracker::new(config.premium_ewma_window_secs),
                last_trade_price: None,
                best_bid: None,
                best_ask: None,
                last_mark: None,
                funding_rate: X18::ZERO,
                next_funding_time_secs: 0,
            },
        );
    }

    /// Updates the book's BBO and, if `use_mid_price` and both sides
    /// exist, records a premium sample against `index`.
    pub fn on_bbo_update(
        &self,
        market_id: u64,
        best_bid: Option<X18>,
        best_ask: Option<X18>,
        index: X18,
        now_secs: u64,
    ) {
        let mut markets = self.markets.write().expect("feed lock poisoned");
        let Some(state) = markets.get_mut(&market_id) else { return };
        state.best_bid = best_bid;
        state.best_ask = best_ask;
        if state.config.use_mid_price {
            if let (Some(bid), Some(ask)) = (best_bid, best_ask) {
                let mid = (bid + ask).div(X18::from_int(2));
                record_premium(state, mid, index, now_secs);
            }
        }
    }

    /// Records a trade print and, unless `use_mid_price` is set, samples
    /// the premium from it.
    pub fn on_trade(&self, market_id: u64, price: X18, index: X18, now_secs: u64) {
        let mut markets = self.markets.write().expect("feed lock poisoned");
        let Some(state) = markets.get_mut(&market_id) else { return };
        state.last_trade_price = Some(price);
        if !state.config.use_mid_price {
            record_premium(state, price, index, now_secs);
        }
    }

    /// Constructs and caches a mark snapshot from the current index and
    /// premium estimate.
    pub fn compute_mark(&self, market_id: u64, index: X18, now_secs: u64) -> Option<MarkSnapshot> {
        let mut markets = self.markets.write().expect("feed lock poisoned");
        let state = markets.get_mut(&market_id)?;

        let premium_estimate = if state.funding_params.use_twap_premium {
            state.premium.twap(now_secs)
        } else {
            state.premium.ewma()
        };
        let clamped = premium_estimate.clamp(state.config.min_premium, state.config.max_premium);
        let mut mark = index.mul(X18::ONE + clamped);

        if state.config.cap_to_oracle {
            let floor = index.mul(X18::ONE - state.config.max_premium);
            let ceil = index.mul(X18::ONE + state.config.max_premium);
            mark = mark.clamp(floor, ceil);
        }

        let snapshot = MarkSnapshot { index, mark, premium: clamped, timestamp_secs: now_secs };
        state.last_mark = Some(snapshot);
        debug!(market_id, mark = %mark, premium = %clamped, "mark price recomputed");
        Some(snapshot)
    }

    /// The most recently computed mark snapshot, if any.
    #[must_use]
    pub fn last_mark(&self, market_id: u64) -> Option<MarkSnapshot> {
        self.markets.read().expect("feed lock poisoned").get(&market_id)?.last_mark
    }

    /// Computes and caches the funding rate if `funding_interval` has
    /// elapsed since the last computation. Returns the (possibly
    /// unchanged) current rate.
    pub fn maybe_update_funding(&self, market_id: u64, now_secs: u64) -> Option<X18> {
        let mut markets = self.markets.write().expect("feed lock poisoned");
        let state = markets.get_mut(&market_id)?;
        if now_secs < state.next_funding_time_secs {
            return Some(state.funding_rate);
        }
        let avg_premium = state.premium.ewma();
        let rate = funding::compute_rate(&state.funding_params, avg_premium);
        state.funding_rate = rate;
        state.next_funding_time_secs = now_secs + state.funding_params.funding_interval_secs;
        Some(rate)
    }

    /// The current cached funding rate (`0` until first computed).
    #[must_use]
    pub fn funding_rate(&self, market_id: u64) -> Option<X18> {
        Some(self.markets.read().expect("feed lock poisoned").get(&market_id)?.funding_rate)
    }

    /// The reference price trigger evaluation should use: last trade price
    /// by default, or mark if `use_mark` is set by the caller.
    #[must_use]
    pub fn trigger_reference(&self, market_id: u64, use_mark: bool) -> Option<X18> {
        let markets = self.markets.read().expect("feed lock poisoned");
        let state = markets.get(&market_id)?;
        if use_mark {
            state.last_mark.map(|m| m.mark)
        } else {
            state.last_trade_price
        }
    }
}

fn record_premium(state: &mut MarketFeedState, reference: X18, index: X18, now_secs: u64) {
    if index.is_zero() {
        return;
    }
    let premium = (reference - index).div(index);
    state.premium.record(premium, now_secs);
}
