//! Premium tracking: an exponentially-weighted moving average plus a
//! rolling time-weighted average.

use std::collections::VecDeque;

use crate::fixed::X18;

/// Tracks a premium series via both an EWMA and a TWAP window.
#[derive(Debug, Clone)]
pub struct PremiumTracker {
    window_secs: u64,
    ewma: X18,
    last_sample_secs: Option<u64>,
    samples: VecDeque<(u64, X18)>,
}

impl PremiumTracker {
    /// Creates a tracker with EWMA decay window `window_secs`.
    #[must_use]
    pub fn new(window_secs: u64) -> Self {
        PremiumTracker {
            window_secs: window_secs.max(1),
            ewma: X18::ZERO,
            last_sample_secs: None,
            samples: VecDeque::new(),
        }
    }

    /// Records a new premium sample at `now_secs`.
    ///
    /// The EWMA decay is `alpha = 1 - exp(-dt / window)` applied to the gap
    /// since the previous sample; the first sample initializes the EWMA
    /// directly. The TWAP buffer appends `(timestamp, value)` and evicts
    /// entries older than `window_secs`.
    pub fn record(&mut self, value: X18, now_secs: u64) {
        match self.last_sample_secs {
            None => self.ewma = value,
            Some(prev) => {
                let dt = now_secs.saturating_sub(prev) as f64;
                let alpha = 1.0 - (-dt / self.window_secs as f64).exp();
                let alpha = X18::from_f64(alpha.clamp(0.0, 1.0));
                self.ewma = self.ewma + alpha.mul(value - self.ewma);
            }
        }
        self.last_sample_secs = Some(now_secs);

        self.samples.push_back((now_secs, value));
        while let Some(&(ts, _)) = self.samples.front() {
            if now_secs.saturating_sub(ts) > self.window_secs {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// The current EWMA estimate.
    #[must_use]
    pub fn ewma(&self) -> X18 {
        self.ewma
    }

    /// The current TWAP over the retained window: each sample is weighted
    /// by how long it held (the gap to the next sample, or to `now_secs`
    /// for the most recent one) rather than averaged uniformly. `0` if
    /// empty.
    #[must_use]
    pub fn twap(&self, now_secs: u64) -> X18 {
        if self.samples.is_empty() {
            return X18::ZERO;
        }
        if self.samples.len() == 1 {
            return self.samples[0].1;
        }

        let mut weighted_sum = X18::ZERO;
        let mut total_weight: u64 = 0;
        let mut iter = self.samples.iter().peekable();
        while let Some(&(ts, value)) = iter.next() {
            let end = iter.peek().map_or(now_secs.max(ts), |&&(next_ts, _)| next_ts);
            let dt = end.saturating_sub(ts);
            weighted_sum = weighted_sum + value.mul(X18::from_int(dt as i64));
            total_weight += dt;
        }

        if total_weight == 0 {
            return self.samples.back().map_or(X18::ZERO, |&(_, v)| v);
        }
        weighted_sum.div(X18::from_int(total_weight as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_initializes_ewma_exactly() {
        let mut tracker = PremiumTracker::new(60);
        tracker.record(X18::from_f64(0.02), 0);
        assert_eq!(tracker.ewma(), X18::from_f64(0.02));
    }

    #[test]
    fn ewma_decays_toward_new_samples() {
        let mut tracker = PremiumTracker::new(60);
        tracker.record(X18::from_int(0), 0);
        tracker.record(X18::from_int(100), 60);
        assert!(tracker.ewma().to_f64() > 0.0);
        assert!(tracker.ewma().to_f64() < 100.0);
    }

    #[test]
    fn twap_drops_samples_outside_the_window() {
        let mut tracker = PremiumTracker::new(10);
        tracker.record(X18::from_int(1), 0);
        tracker.record(X18::from_int(5), 20);
        assert_eq!(tracker.twap(20), X18::from_int(5));
    }

    #[test]
    fn twap_weights_samples_by_dwell_time() {
        let mut tracker = PremiumTracker::new(100);
        tracker.record(X18::from_int(0), 0);
        tracker.record(X18::from_int(100), 5);
        // 0 held for [0, 5), 100 held for [5, 10): (0*5 + 100*5) / 10 = 50.
        assert_eq!(tracker.twap(10), X18::from_int(50));
    }

    #[test]
    fn twap_weights_unevenly_held_samples() {
        let mut tracker = PremiumTracker::new(100);
        tracker.record(X18::from_int(0), 0);
        tracker.record(X18::from_int(100), 1);
        // 0 held for [0, 1), 100 held for [1, 10): (0*1 + 100*9) / 10 = 90.
        assert_eq!(tracker.twap(10), X18::from_int(90));
    }
}
