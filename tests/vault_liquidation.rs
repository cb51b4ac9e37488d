//! Vault/feed interaction and the margin-liquidation end-to-end scenario.

use exchange_core::feed::funding::FundingParams;
use exchange_core::feed::{MarkPriceConfig, MarkPriceFeed};
use exchange_core::fixed::X18;
use exchange_core::order::AccountId;
use exchange_core::vault::market::{Currency, MarketConfig, MarketFlags};
use exchange_core::vault::{Settlement, Vault};

fn acct(n: u8) -> AccountId {
    AccountId::new([n; 20], 0)
}

fn market(quote: Currency) -> MarketConfig {
    MarketConfig {
        market_id: 1,
        base_currency: 1,
        quote_currency: quote,
        initial_margin: X18::from_f64(0.5),
        maintenance_margin: X18::from_f64(0.25),
        max_leverage: X18::from_int(2),
        maker_fee: X18::ZERO,
        taker_fee: X18::ZERO,
        min_order_size: X18::from_f64(0.001),
        max_position_size: X18::from_int(1_000_000),
        liquidator_penalty_share: X18::from_f64(0.5),
        liquidation_penalty_rate: X18::from_f64(0.01),
        flags: MarketFlags::ACTIVE,
    }
}

fn feed_with_mark(market_id: u64, mark: X18) -> MarkPriceFeed {
    let feed = MarkPriceFeed::new();
    let config = MarkPriceConfig {
        premium_ewma_window_secs: 60,
        impact_notional: X18::from_int(1000),
        max_premium: X18::from_f64(0.05),
        min_premium: X18::from_f64(-0.05),
        use_mid_price: false,
        cap_to_oracle: false,
    };
    let funding_params = FundingParams {
        funding_interval_secs: 3600,
        clamp: X18::from_f64(0.01),
        use_twap_premium: false,
    };
    feed.register_market(market_id, config, funding_params);
    feed.on_trade(market_id, mark, mark, 0);
    feed.compute_mark(market_id, mark, 0);
    feed
}

/// A long of 10 @ 1 whose mark later drops to 0.5 carries enough
/// unrealised loss to push equity below maintenance margin, making it
/// liquidatable; liquidation pays the liquidator and/or insurance fund out
/// of the closed position's penalty.
#[test]
fn margin_liquidation_scenario() {
    let vault = Vault::new();
    vault.create_market(market(0)).unwrap();

    // 5.5 clears the 5.0 initial-margin requirement (0.5 fraction * 10
    // notional) with only 0.5 of headroom to spare.
    vault.deposit(acct(1), 0, X18::from_f64(5.5));
    vault.deposit(acct(2), 0, X18::from_int(100));

    let feed = feed_with_mark(1, X18::from_int(1));
    let settlement = Settlement {
        maker: acct(2),
        taker: acct(1),
        market_id: 1,
        taker_is_buy: true,
        size: X18::from_int(10),
        price: X18::from_int(1),
        maker_fee: X18::ZERO,
        taker_fee: X18::ZERO,
    };
    let results = vault.apply_fills(&[settlement], &feed);
    assert!(results[0].is_ok());
    assert_eq!(vault.position(acct(1), 1).size, X18::from_int(10));

    // The mark halves: the long's unrealised loss (-5.0) erodes equity to
    // 0.5 while maintenance margin (1.25 at the new, lower notional) now
    // exceeds it.
    feed.on_trade(1, X18::from_f64(0.5), X18::from_f64(0.5), 10);
    feed.compute_mark(1, X18::from_f64(0.5), 10);

    let info = vault.get_margin_info(acct(1), 0, &feed);
    assert_eq!(info.total_collateral, X18::from_f64(0.5));
    assert_eq!(info.maintenance_margin, X18::from_f64(1.25));
    assert!(info.liquidatable);
    assert!(vault.is_liquidatable(acct(1), 0, &feed));

    let outcome = vault.liquidate(acct(99), acct(1), 1, X18::from_int(10), &feed).unwrap();
    assert_eq!(outcome.closed_size, X18::from_int(-10));
    assert!(vault.position(acct(1), 1).is_flat());
    assert!(outcome.to_liquidator > X18::ZERO || outcome.to_insurance > X18::ZERO);
}

/// A withdrawal that would push free margin negative given an open
/// position is rejected; one that leaves free margin at or above zero
/// succeeds.
#[test]
fn withdraw_is_rejected_once_it_would_breach_free_margin() {
    let vault = Vault::new();
    vault.create_market(market(0)).unwrap();
    vault.deposit(acct(1), 0, X18::from_int(10));
    vault.deposit(acct(2), 0, X18::from_int(100));

    let feed = feed_with_mark(1, X18::from_int(1));
    let settlement = Settlement {
        maker: acct(2),
        taker: acct(1),
        market_id: 1,
        taker_is_buy: true,
        size: X18::from_int(10),
        price: X18::from_int(1),
        maker_fee: X18::ZERO,
        taker_fee: X18::ZERO,
    };
    vault.apply_fills(&[settlement], &feed)[0].as_ref().unwrap();

    // 10 collateral, 5 used margin (0.5 fraction * 10 notional): 5 of free
    // margin to spare.
    assert!(vault.withdraw(acct(1), 0, X18::from_int(6), &feed).is_err());
    assert!(vault.withdraw(acct(1), 0, X18::from_int(5), &feed).is_ok());
    assert_eq!(vault.balance(acct(1), 0), X18::from_int(5));
}

/// The vault reads mark prices from a live [`MarkPriceFeed`] rather than a
/// test stub, exercising the `MarkPriceSource` impl wired in `vault::mod`.
#[test]
fn vault_reads_mark_price_from_live_feed() {
    let vault = Vault::new();
    vault.create_market(market(0)).unwrap();
    vault.deposit(acct(1), 0, X18::from_int(100));
    vault.deposit(acct(2), 0, X18::from_int(100));

    let feed = feed_with_mark(1, X18::from_int(1));
    let settlement = Settlement {
        maker: acct(2),
        taker: acct(1),
        market_id: 1,
        taker_is_buy: true,
        size: X18::from_int(10),
        price: X18::from_int(1),
        maker_fee: X18::ZERO,
        taker_fee: X18::ZERO,
    };
    vault.apply_fills(&[settlement], &feed)[0].as_ref().unwrap();

    // Move the mark up: the long's unrealised P&L should grow with it.
    feed.on_trade(1, X18::from_int(2), X18::from_int(2), 10);
    feed.compute_mark(1, X18::from_int(2), 10);

    let info = vault.get_margin_info(acct(1), 0, &feed);
    assert!(info.total_collateral > X18::from_int(100));
}
