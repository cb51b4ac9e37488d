//! Oracle collaborator interface.
//!
//! The feed consumes price data through this narrow trait; it owns no raw
//! sample storage itself, keeping dependency injection rather than owning
//! references between components. [`InMemoryOracle`] is a reference
//! implementation good enough for tests and for embedding a process-local
//! oracle, aggregating fresh samples per asset with a configurable
//! staleness cutoff.
//!
//! Every method takes an explicit `now` timestamp rather than reading the
//! wall clock internally, keeping timestamps explicit instead of hidden
//! `SystemTime::now()` calls in hot paths.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::fixed::X18;

/// How an asset's per-source samples are aggregated into a single price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationMethod {
    /// Median of all fresh samples.
    Median,
    /// Arithmetic mean of all fresh samples.
    Mean,
    /// Confidence-weighted mean.
    Weighted,
    /// Time-weighted average over a rolling window.
    Twap,
}

/// Registration parameters for an oracle-tracked asset.
#[derive(Debug, Clone, Copy)]
pub struct AssetConfig {
    /// Samples older than this are excluded from aggregation.
    pub max_staleness_secs: u64,
    /// How to combine multiple sources' samples.
    pub aggregation: AggregationMethod,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    price: X18,
    confidence: X18,
    timestamp_secs: u64,
}

/// The narrow contract the feed needs from a price oracle.
pub trait Oracle: Send + Sync {
    /// Idempotently registers `asset_id` with `config`.
    fn register_asset(&self, asset_id: u64, config: AssetConfig);
    /// Ingests a new sample from `source` for `asset_id`. Implementations
    /// may reject samples unreasonably far from the current median.
    fn update_price(&self, asset_id: u64, source: u32, price: X18, confidence: X18, now_secs: u64);
    /// The current aggregated price, or `None` if stale/insufficient.
    fn get_price(&self, asset_id: u64, now_secs: u64) -> Option<X18>;
    /// Time-weighted average price over the trailing `window_secs`.
    fn get_twap(&self, asset_id: u64, window_secs: u64, now_secs: u64) -> Option<X18>;
    /// `true` if the asset has a non-stale price right now.
    fn is_price_fresh(&self, asset_id: u64, now_secs: u64) -> bool {
        self.get_price(asset_id, now_secs).is_some()
    }
    /// Age in seconds of the most recent sample, or `None` if never sampled.
    fn price_age(&self, asset_id: u64, now_secs: u64) -> Option<u64>;
}

struct AssetState {
    config: AssetConfig,
    samples: Vec<Sample>,
}

/// A process-local, in-memory oracle: ring-buffers recent per-source
/// samples and aggregates on read.
#[derive(Default)]
pub struct InMemoryOracle {
    assets: RwLock<HashMap<u64, AssetState>>,
}

impl InMemoryOracle {
    /// Creates an oracle tracking no assets.
    #[must_use]
    pub fn new() -> Self {
        InMemoryOracle::default()
    }

    fn fresh_samples(state: &AssetState, now_secs: u64) -> Vec<Sample> {
        state
            .samples
            .iter()
            .copied()
            .filter(|s| now_secs.saturating_sub(s.timestamp_secs) <= state.config.max_staleness_secs)
            .collect()
    }

    fn aggregate(method: AggregationMethod, samples: &[Sample]) -> Option<X18> {
        if samples.is_empty() {
            return None;
        }
        match method {
            AggregationMethod::Mean | AggregationMethod::Twap => {
                let sum = samples.iter().fold(X18::ZERO, |acc, s| acc + s.price);
                Some(sum.div(X18::from_int(samples.len() as i64)))
            }
            AggregationMethod::Weighted => {
                let weight_sum = samples.iter().fold(X18::ZERO, |acc, s| acc + s.confidence);
                if weight_sum.is_zero() {
                    return Self::aggregate(AggregationMethod::Mean, samples);
                }
                let weighted_sum = samples.iter().fold(X18::ZERO, |acc, s| acc + s.price.mul(s.confidence));
                Some(weighted_sum.div(weight_sum))
            }
            AggregationMethod::Median => {
                let mut prices: Vec<i128> = samples.iter().map(|s| s.price.0).collect();
                prices.sort_unstable();
                let mid = prices.len() / 2;
                let median = if prices.len() % 2 == 0 {
                    (prices[mid - 1] + prices[mid]) / 2
                } else {
                    prices[mid]
                };
                Some(X18::from_raw(median))
            }
        }
    }
}

impl Oracle for InMemoryOracle {
    fn register_asset(&self, asset_id: u64, config: AssetConfig) {
        let mut assets = self.assets.write().expect("oracle lock poisoned");
        assets.entry(asset_id).or_insert_with(|| AssetState { config, samples: Vec::new() });
    }

    fn update_price(&self, asset_id: u64, _source: u32, price: X18, confidence: X18, now_secs: u64) {
        let mut assets = self.assets.write().expect("oracle lock poisoned");
        if let Some(state) = assets.get_mut(&asset_id) {
            state.samples.push(Sample { price, confidence, timestamp_secs: now_secs });
            let cutoff = state.config.max_staleness_secs.saturating_mul(4);
            state.samples.retain(|s| now_secs.saturating_sub(s.timestamp_secs) <= cutoff);
        }
    }

    fn get_price(&self, asset_id: u64, now_secs: u64) -> Option<X18> {
        let assets = self.assets.read().expect("oracle lock poisoned");
        let state = assets.get(&asset_id)?;
        let samples = Self::fresh_samples(state, now_secs);
        Self::aggregate(state.config.aggregation, &samples)
    }

    fn get_twap(&self, asset_id: u64, window_secs: u64, now_secs: u64) -> Option<X18> {
        let assets = self.assets.read().expect("oracle lock poisoned");
        let state = assets.get(&asset_id)?;
        let windowed: Vec<Sample> = state
            .samples
            .iter()
            .copied()
            .filter(|s| now_secs.saturating_sub(s.timestamp_secs) <= window_secs)
            .collect();
        Self::aggregate(AggregationMethod::Twap, &windowed)
    }

    fn price_age(&self, asset_id: u64, now_secs: u64) -> Option<u64> {
        let assets = self.assets.read().expect("oracle lock poisoned");
        let state = assets.get(&asset_id)?;
        state.samples.iter().map(|s| now_secs.saturating_sub(s.timestamp_secs)).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(method: AggregationMethod) -> AssetConfig {
        AssetConfig { max_staleness_secs: 30, aggregation: method }
    }

    #[test]
    fn median_aggregation_ignores_outliers() {
        let oracle = InMemoryOracle::new();
        oracle.register_asset(1, cfg(AggregationMethod::Median));
        oracle.update_price(1, 1, X18::from_int(100), X18::ONE, 0);
        oracle.update_price(1, 2, X18::from_int(101), X18::ONE, 0);
        oracle.update_price(1, 3, X18::from_int(1_000_000), X18::ONE, 0);
        assert_eq!(oracle.get_price(1, 0), Some(X18::from_int(101)));
    }

    #[test]
    fn stale_prices_are_excluded() {
        let oracle = InMemoryOracle::new();
        oracle.register_asset(1, cfg(AggregationMethod::Mean));
        oracle.update_price(1, 1, X18::from_int(100), X18::ONE, 0);
        assert!(oracle.get_price(1, 10).is_some());
        assert!(oracle.get_price(1, 100).is_none());
    }

    #[test]
    fn unregistered_asset_has_no_price() {
        let oracle = InMemoryOracle::new();
        assert_eq!(oracle.get_price(42, 0), None);
        assert!(!oracle.is_price_fresh(42, 0));
    }

    #[test]
    fn weighted_aggregation_favors_higher_confidence() {
        let oracle = InMemoryOracle::new();
        oracle.register_asset(1, cfg(AggregationMethod::Weighted));
        oracle.update_price(1, 1, X18::from_int(100), X18::from_f64(0.1), 0);
        oracle.update_price(1, 2, X18::from_int(200), X18::from_f64(0.9), 0);
        let price = oracle.get_price(1, 0).unwrap();
        assert!(price.to_f64() > 150.0);
    }
}
