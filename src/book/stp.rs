//! Self-trade prevention.
//!
//! The default behaviour is [`STPMode::CancelResting`]: when a taker would
//! trade against a resting order tagged with the same `stp_group`, the
//! resting order is cancelled and skipped rather than matched. The richer
//! variants below are kept as explicit, never-defaulted opt-ins for
//! callers with different self-trade policies.

use crate::order::Order;

/// Self-trade prevention policy, keyed by an order's `stp_group` tag.
/// `stp_group == 0` disables STP for that order regardless of mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum STPMode {
    /// No self-trade checking.
    None,
    /// Cancel the resting order and continue matching against the book.
    /// The default when STP is enabled.
    #[default]
    CancelResting,
    /// Cancel the taker's remaining quantity outright, stopping the match.
    CancelTaker,
    /// Cancel both the resting and taker orders, stopping the match.
    CancelBoth,
}

/// Outcome of an STP check against a single resting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum STPAction {
    /// Different accounts (or STP disabled); match normally.
    NoConflict,
    /// Cancel the resting order, then continue matching the taker against
    /// the rest of the book.
    CancelResting,
    /// Cancel the taker's remaining quantity; the match loop must stop.
    CancelTaker,
    /// Cancel both sides; the match loop must stop.
    CancelBoth,
}

/// Decides what to do about a potential self-trade between `taker` and a
/// resting `maker` order, given `mode`.
#[must_use]
pub fn check(mode: STPMode, taker: &Order, maker: &Order) -> STPAction {
    let conflict = mode != STPMode::None
        && taker.stp_group != 0
        && taker.stp_group == maker.stp_group
        && taker.account_id == maker.account_id;
    if !conflict {
        return STPAction::NoConflict;
    }
    match mode {
        STPMode::None => STPAction::NoConflict,
        STPMode::CancelResting => STPAction::CancelResting,
        STPMode::CancelTaker => STPAction::CancelTaker,
        STPMode::CancelBoth => STPAction::CancelBoth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{AccountId, GroupType, OrderId, OrderStatus, OrderType, Side, TimeInForce};

    fn order(id: u64, account: u8, stp_group: u64) -> Order {
        Order {
            id: OrderId(id),
            symbol_id: 1,
            account_id: AccountId::new([account; 20], 0),
            side: Side::Buy,
            order_type: OrderType::Limit,
            tif: TimeInForce::Gtc,
            price: 100,
            quantity: 10,
            filled: 0,
            stop_price: 0,
            stp_group,
            status: OrderStatus::New,
            client_oid: None,
            group_id: 0,
            group_type: GroupType::None,
            timestamp: 0,
            expire_time: 0,
        }
    }

    #[test]
    fn no_conflict_when_groups_differ() {
        let taker = order(1, 1, 7);
        let maker = order(2, 1, 8);
        assert_eq!(check(STPMode::CancelResting, &taker, &maker), STPAction::NoConflict);
    }

    #[test]
    fn no_conflict_when_group_is_zero() {
        let taker = order(1, 1, 0);
        let maker = order(2, 1, 0);
        assert_eq!(check(STPMode::CancelResting, &taker, &maker), STPAction::NoConflict);
    }

    #[test]
    fn cancel_resting_is_default() {
        assert_eq!(STPMode::default(), STPMode::CancelResting);
        let taker = order(1, 1, 7);
        let maker = order(2, 1, 7);
        assert_eq!(check(STPMode::default(), &taker, &maker), STPAction::CancelResting);
    }

    #[test]
    fn cancel_taker_and_both_variants_are_explicit_opt_in() {
        let taker = order(1, 1, 7);
        let maker = order(2, 1, 7);
        assert_eq!(check(STPMode::CancelTaker, &taker, &maker), STPAction::CancelTaker);
        assert_eq!(check(STPMode::CancelBoth, &taker, &maker), STPAction::CancelBoth);
    }
}
