//! The insurance fund: a singleton backstop for liquidation shortfalls.

use std::sync::Mutex;

use crate::fixed::X18;

/// A pooled reserve that absorbs liquidation shortfalls before
/// auto-deleverage engages.
#[derive(Debug, Default)]
pub struct InsuranceFund {
    balance: Mutex<X18>,
}

impl InsuranceFund {
    /// Creates an empty insurance fund.
    #[must_use]
    pub fn new() -> Self {
        InsuranceFund { balance: Mutex::new(X18::ZERO) }
    }

    /// Adds `amount` to the fund (e.g. the insurance-fund share of a
    /// liquidation penalty).
    pub fn contribute(&self, amount: X18) {
        let mut balance = self.balance.lock().expect("insurance fund lock poisoned");
        *balance = *balance + amount;
    }

    /// Withdraws up to `amount` from the fund, returning the amount
    /// actually withdrawn (bounded by the available balance; never drives
    /// the fund negative).
    pub fn withdraw(&self, amount: X18) -> X18 {
        let mut balance = self.balance.lock().expect("insurance fund lock poisoned");
        let drawn = if amount > *balance { *balance } else { amount };
        *balance = *balance - drawn;
        drawn
    }

    /// The fund's current balance.
    #[must_use]
    pub fn balance(&self) -> X18 {
        *self.balance.lock().expect("insurance fund lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contribute_and_balance_round_trip() {
        let fund = InsuranceFund::new();
        fund.contribute(X18::from_int(100));
        assert_eq!(fund.balance(), X18::from_int(100));
    }

    #[test]
    fn withdraw_is_capped_at_available_balance() {
        let fund = InsuranceFund::new();
        fund.contribute(X18::from_int(50));
        let drawn = fund.withdraw(X18::from_int(100));
        assert_eq!(drawn, X18::from_int(50));
        assert_eq!(fund.balance(), X18::ZERO);
    }
}
