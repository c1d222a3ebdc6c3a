//! Holdings and trade rules, derived from the append-only ledger.
//!
//! Share counts are never stored as a running balance: every read
//! re-aggregates the `purchases` and `sells` tables, and the functions
//! here are the only gate keeping net quantity and cash non-negative.

use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Holding, PortfolioView};
use crate::quotes::QuoteLookup;

/// Net shares held for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub symbol: String,
    pub shares: i64,
}

/// Missing aggregate sums (no rows for that side of the ledger) count as zero.
pub fn net_quantity(bought: Option<i64>, sold: Option<i64>) -> i64 {
    bought.unwrap_or(0) - sold.unwrap_or(0)
}

/// Trimmed, uppercased ticker; empty input is a validation error.
pub fn normalize_symbol(raw: &str) -> Result<String, AppError> {
    let symbol = raw.trim();
    if symbol.is_empty() {
        return Err(AppError::Validation("symbol needed".into()));
    }
    Ok(symbol.to_uppercase())
}

pub fn validate_shares(shares: i64) -> Result<i64, AppError> {
    if shares <= 0 {
        return Err(AppError::Validation(
            "shares must be a positive whole number".into(),
        ));
    }
    Ok(shares)
}

/// Cost of a buy, rejected when it exceeds the available cash.
pub fn buy_cost(price: Decimal, shares: i64, cash: Decimal) -> Result<Decimal, AppError> {
    let cost = price * Decimal::from(shares);
    if cost > cash {
        return Err(AppError::InsufficientFunds);
    }
    Ok(cost)
}

/// Proceeds of a sale, rejected when more shares are offered than held.
pub fn sell_proceeds(price: Decimal, shares: i64, held: i64) -> Result<Decimal, AppError> {
    if shares > held {
        return Err(AppError::InsufficientShares);
    }
    Ok(price * Decimal::from(shares))
}

/// Net position per symbol ever purchased by the user.
pub async fn positions<'e, E>(exec: E, user_id: Uuid) -> Result<Vec<Position>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT b.symbol, b.bought - COALESCE(s.sold, 0)
        FROM (SELECT symbol, SUM(quantity)::BIGINT AS bought
              FROM purchases WHERE user_id = $1 GROUP BY symbol) b
        LEFT JOIN (SELECT symbol, SUM(quantity)::BIGINT AS sold
                   FROM sells WHERE user_id = $1 GROUP BY symbol) s
          ON s.symbol = b.symbol
        ORDER BY b.symbol
        "#,
    )
    .bind(user_id)
    .fetch_all(exec)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(symbol, shares)| Position { symbol, shares })
        .collect())
}

/// Net quantity held for a single symbol.
pub async fn shares_held<'e, E>(exec: E, user_id: Uuid, symbol: &str) -> Result<i64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let (bought, sold): (Option<i64>, Option<i64>) = sqlx::query_as(
        r#"
        SELECT
            (SELECT SUM(quantity)::BIGINT FROM purchases WHERE user_id = $1 AND symbol = $2),
            (SELECT SUM(quantity)::BIGINT FROM sells WHERE user_id = $1 AND symbol = $2)
        "#,
    )
    .bind(user_id)
    .bind(symbol)
    .fetch_one(exec)
    .await?;

    Ok(net_quantity(bought, sold))
}

/// Prices every open position and totals it with the cash balance.
/// A failed lookup for any held symbol fails the whole computation.
pub async fn value_positions(
    quotes: &dyn QuoteLookup,
    cash: Decimal,
    positions: Vec<Position>,
) -> Result<PortfolioView, AppError> {
    let mut holdings = Vec::new();
    let mut grand_total = cash;

    for position in positions {
        // Fully sold-out symbols stay in the ledger but carry no value.
        if position.shares == 0 {
            continue;
        }
        let quote = quotes.lookup(&position.symbol).await?;
        let value = quote.price * Decimal::from(position.shares);
        grand_total += value;
        holdings.push(Holding {
            symbol: position.symbol,
            name: quote.name,
            shares: position.shares,
            price: quote.price,
            value,
        });
    }

    Ok(PortfolioView {
        cash,
        holdings,
        grand_total,
    })
}

/// The portfolio view: cash, valued holdings, grand total.
pub async fn portfolio(
    pool: &PgPool,
    quotes: &dyn QuoteLookup,
    user_id: Uuid,
) -> Result<PortfolioView, AppError> {
    let cash: Decimal = sqlx::query_scalar("SELECT cash FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    let positions = positions(pool, user_id).await?;
    value_positions(quotes, cash, positions).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quotes::Quote;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    struct CannedQuotes(HashMap<&'static str, Decimal>);

    #[async_trait]
    impl QuoteLookup for CannedQuotes {
        async fn lookup(&self, symbol: &str) -> Result<Quote, AppError> {
            match self.0.get(symbol) {
                Some(price) => Ok(Quote {
                    symbol: symbol.to_string(),
                    name: format!("{symbol} Corp"),
                    price: *price,
                }),
                None => Err(AppError::UnknownSymbol(symbol.to_string())),
            }
        }
    }

    #[test]
    fn missing_ledger_sums_count_as_zero() {
        assert_eq!(net_quantity(Some(10), None), 10);
        assert_eq!(net_quantity(Some(10), Some(4)), 6);
        assert_eq!(net_quantity(None, None), 0);
    }

    #[test]
    fn symbols_are_trimmed_and_uppercased() {
        assert_eq!(normalize_symbol(" aapl ").unwrap(), "AAPL");
        assert!(matches!(normalize_symbol("   "), Err(AppError::Validation(_))));
    }

    #[test]
    fn non_positive_share_counts_are_rejected() {
        assert!(matches!(validate_shares(0), Err(AppError::Validation(_))));
        assert!(matches!(validate_shares(-3), Err(AppError::Validation(_))));
        assert_eq!(validate_shares(7).unwrap(), 7);
    }

    #[test]
    fn buy_within_cash_charges_the_full_cost() {
        // cash 10000.00, 10 shares at 50.00
        let cost = buy_cost(dec!(50.00), 10, dec!(10000.00)).unwrap();
        assert_eq!(cost, dec!(500.00));
        assert_eq!(dec!(10000.00) - cost, dec!(9500.00));
    }

    #[test]
    fn buy_beyond_cash_is_rejected() {
        // cash 100.00 cannot cover 10 shares at 50.00
        let result = buy_cost(dec!(50.00), 10, dec!(100.00));
        assert!(matches!(result, Err(AppError::InsufficientFunds)));
    }

    #[test]
    fn buy_of_exactly_the_cash_balance_is_allowed() {
        assert_eq!(buy_cost(dec!(50.00), 2, dec!(100.00)).unwrap(), dec!(100.00));
    }

    #[test]
    fn sell_within_holdings_pays_the_sale_price() {
        // 4 of 10 held shares at 60.00
        let proceeds = sell_proceeds(dec!(60.00), 4, 10).unwrap();
        assert_eq!(proceeds, dec!(240.00));
        assert_eq!(dec!(9500.00) + proceeds, dec!(9740.00));
    }

    #[test]
    fn sell_beyond_holdings_is_rejected() {
        let result = sell_proceeds(dec!(60.00), 6, 5);
        assert!(matches!(result, Err(AppError::InsufficientShares)));
    }

    #[tokio::test]
    async fn portfolio_totals_cash_and_position_values() {
        let quotes = CannedQuotes(HashMap::from([("AAA", dec!(60.00))]));
        let view = value_positions(
            &quotes,
            dec!(9740.00),
            vec![Position {
                symbol: "AAA".into(),
                shares: 6,
            }],
        )
        .await
        .unwrap();

        assert_eq!(view.cash, dec!(9740.00));
        assert_eq!(view.holdings.len(), 1);
        assert_eq!(view.holdings[0].shares, 6);
        assert_eq!(view.holdings[0].value, dec!(360.00));
        assert_eq!(view.grand_total, dec!(10100.00));
    }

    #[tokio::test]
    async fn sold_out_symbols_are_left_out_of_the_portfolio() {
        let quotes = CannedQuotes(HashMap::from([("AAA", dec!(60.00)), ("BBB", dec!(10.00))]));
        let view = value_positions(
            &quotes,
            dec!(1000.00),
            vec![
                Position {
                    symbol: "AAA".into(),
                    shares: 0,
                },
                Position {
                    symbol: "BBB".into(),
                    shares: 2,
                },
            ],
        )
        .await
        .unwrap();

        assert_eq!(view.holdings.len(), 1);
        assert_eq!(view.holdings[0].symbol, "BBB");
        assert_eq!(view.grand_total, dec!(1020.00));
    }

    #[tokio::test]
    async fn one_failed_lookup_fails_the_whole_portfolio() {
        let quotes = CannedQuotes(HashMap::from([("AAA", dec!(60.00))]));
        let result = value_positions(
            &quotes,
            dec!(1000.00),
            vec![
                Position {
                    symbol: "AAA".into(),
                    shares: 1,
                },
                Position {
                    symbol: "GONE".into(),
                    shares: 1,
                },
            ],
        )
        .await;

        assert!(matches!(result, Err(AppError::UnknownSymbol(_))));
    }

    #[tokio::test]
    async fn empty_ledger_yields_cash_only_portfolio() {
        let quotes = CannedQuotes(HashMap::new());
        let view = value_positions(&quotes, dec!(10000.00), vec![]).await.unwrap();
        assert!(view.holdings.is_empty());
        assert_eq!(view.grand_total, dec!(10000.00));
    }
}
