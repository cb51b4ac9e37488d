//! Funding accrual against open positions, applied via `Vault::accrue_funding`.

use crate::fixed::X18;

/// The quote-currency amount credited (positive) or debited (negative) to
/// a position's owner for one accrual tick.
///
/// `payment = -size * mark * funding_rate * (elapsed / funding_interval)`:
/// a positive funding rate is paid by longs to shorts, matching the usual
/// perpetual-swap convention (positive rate means perp trades above index).
#[must_use]
pub fn compute_funding_payment(
    size: X18,
    mark: X18,
    funding_rate: X18,
    elapsed_secs: u64,
    funding_interval_secs: u64,
) -> X18 {
    if funding_interval_secs == 0 {
        return X18::ZERO;
    }
    let fraction = X18::from_int(elapsed_secs as i64).div(X18::from_int(funding_interval_secs as i64));
    -size.mul(mark).mul(funding_rate).mul(fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_pays_on_positive_funding_rate() {
        let payment = compute_funding_payment(
            X18::from_int(10),
            X18::from_int(100),
            X18::from_f64(0.0001),
            3600,
            3600,
        );
        assert_eq!(payment, X18::from_f64(-0.1));
    }

    #[test]
    fn short_receives_on_positive_funding_rate() {
        let payment = compute_funding_payment(
            X18::from_int(-10),
            X18::from_int(100),
            X18::from_f64(0.0001),
            3600,
            3600,
        );
        assert_eq!(payment, X18::from_f64(0.1));
    }

    #[test]
    fn partial_interval_scales_payment_linearly() {
        let full = compute_funding_payment(
            X18::from_int(10),
            X18::from_int(100),
            X18::from_f64(0.0001),
            3600,
            3600,
        );
        let half = compute_funding_payment(
            X18::from_int(10),
            X18::from_int(100),
            X18::from_f64(0.0001),
            1800,
            3600,
        );
        assert_eq!(half, full.div(X18::from_int(2)));
    }
}
