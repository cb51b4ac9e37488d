//! Funding rate derivation from accumulated premium samples.

use crate::fixed::X18;

/// Parameters governing funding-rate computation for a market.
#[derive(Debug, Clone, Copy)]
pub struct FundingParams {
    /// How often the funding rate is recomputed, in seconds.
    pub funding_interval_secs: u64,
    /// Absolute clamp applied to the computed rate.
    pub max_funding_rate: X18,
    /// Baseline interest-rate component.
    pub interest_rate: X18,
    /// Scales the average premium's contribution to the rate.
    pub premium_fraction: X18,
    /// Use the TWAP premium (rather than EWMA) as the averaging input.
    pub use_twap_premium: bool,
}

/// `rate = clamp(premium_fraction * avg_premium + interest_rate, -max, +max)`.
#[must_use]
pub fn compute_rate(params: &FundingParams, avg_premium: X18) -> X18 {
    let raw = params.premium_fraction.mul(avg_premium) + params.interest_rate;
    raw.clamp(-params.max_funding_rate, params.max_funding_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> FundingParams {
        FundingParams {
            funding_interval_secs: 3600,
            max_funding_rate: X18::from_f64(0.01),
            interest_rate: X18::ZERO,
            premium_fraction: X18::ONE,
            use_twap_premium: false,
        }
    }

    #[test]
    fn rate_is_clamped_to_max() {
        let rate = compute_rate(&params(), X18::from_f64(0.5));
        assert_eq!(rate, X18::from_f64(0.01));
    }

    #[test]
    fn rate_is_clamped_to_negative_max() {
        let rate = compute_rate(&params(), X18::from_f64(-0.5));
        assert_eq!(rate, X18::from_f64(-0.01));
    }

    #[test]
    fn rate_tracks_premium_within_bounds() {
        let rate = compute_rate(&params(), X18::from_f64(0.001));
        assert_eq!(rate, X18::from_f64(0.001));
    }
}
