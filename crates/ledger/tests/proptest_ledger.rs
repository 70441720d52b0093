use chrono::Utc;
use proptest::prelude::*;
use sqlx::sqlite::SqlitePoolOptions;

use common::{ExitReason, Side, Signal, StrategyKind, TradeStatus};
use ledger::{pnl_pct, TradeLedger};

fn signal(side: Side, price: f64) -> Signal {
    Signal {
        asset: "TEST".into(),
        strategy: StrategyKind::Range,
        pattern: None,
        side,
        price,
        stop_loss: match side {
            Side::Buy => price * 0.5,
            Side::Sell => price * 1.5,
        },
        take_profit: match side {
            Side::Buy => price * 1.5,
            Side::Sell => price * 0.5,
        },
        confidence: 80.0,
        risk: 0.03,
        created_at: Utc::now(),
        reason: "proptest".into(),
    }
}

proptest! {
    /// BUY P/L is (exit−entry)/entry×100, SELL is the negated ratio, and
    /// `success` holds exactly when the P/L is positive.
    #[test]
    fn close_pl_matches_the_formula(
        entry_price in 0.01f64..1_000_000.0f64,
        exit_ratio in 0.5f64..1.5f64,
        is_buy in any::<bool>(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await
                .unwrap();
            let ledger = TradeLedger::new(pool);
            ledger.load().await.unwrap();

            let side = if is_buy { Side::Buy } else { Side::Sell };
            let exit_price = entry_price * exit_ratio;

            let trade = ledger.open(&signal(side, entry_price)).await.unwrap();
            let closed = ledger.close(&trade.id, exit_price, ExitReason::Manual).await.unwrap();

            let expected = match side {
                Side::Buy => (exit_price - entry_price) / entry_price * 100.0,
                Side::Sell => (entry_price - exit_price) / entry_price * 100.0,
            };
            let got = closed.profit_loss_pct.unwrap();
            assert!((got - expected).abs() < 1e-9, "pl {got} != expected {expected}");
            assert_eq!(closed.success, Some(expected > 0.0));
            assert_eq!(closed.status, TradeStatus::Closed);
            assert_eq!(got, pnl_pct(side, entry_price, exit_price));
        });
    }

    /// Re-opening while an equivalent trade is OPEN never creates a second
    /// position, regardless of prices.
    #[test]
    fn single_open_trade_per_asset_strategy_side(
        first_price in 0.01f64..1_000_000.0f64,
        second_price in 0.01f64..1_000_000.0f64,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect("sqlite::memory:")
                .await
                .unwrap();
            let ledger = TradeLedger::new(pool);
            ledger.load().await.unwrap();

            let first = ledger.open(&signal(Side::Buy, first_price)).await;
            assert!(first.is_some());

            let mut duplicate = signal(Side::Buy, second_price);
            duplicate.created_at = Utc::now() + chrono::Duration::seconds(1);
            assert!(ledger.open(&duplicate).await.is_none());
            assert_eq!(ledger.open_trade_count().await, 1);
        });
    }
}
