use axum::{
    extract::{Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::AppError,
    ledger,
    middleware::auth::AuthUser,
    models::{HistoryEntry, PortfolioView, Purchase, Sell, TradeRequest},
    quotes::Quote,
    state::AppState,
};

/// GET / — the portfolio view, recomputed from the full ledger.
pub async fn index(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PortfolioView>, AppError> {
    let view = ledger::portfolio(&state.pool, state.quotes.as_ref(), auth.0).await?;
    Ok(Json(view))
}

/// GET /buy — what the buy form needs: current buying power.
pub async fn buy_form(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let cash: Decimal = sqlx::query_scalar("SELECT cash FROM users WHERE id = $1")
        .bind(auth.0)
        .fetch_one(&state.pool)
        .await?;

    Ok(Json(json!({ "cash": cash })))
}

pub async fn buy(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<TradeRequest>,
) -> Result<Json<Purchase>, AppError> {
    let symbol = ledger::normalize_symbol(&req.symbol)?;
    let shares = ledger::validate_shares(req.shares)?;

    // price is captured here and written to the ledger row below
    let quote = state.quotes.lookup(&symbol).await?;

    let mut tx = state.pool.begin().await?;

    // row lock serializes concurrent trades for the same user
    let cash: Decimal = sqlx::query_scalar("SELECT cash FROM users WHERE id = $1 FOR UPDATE")
        .bind(auth.0)
        .fetch_one(&mut *tx)
        .await?;

    let cost = ledger::buy_cost(quote.price, shares, cash)?;

    sqlx::query("UPDATE users SET cash = cash - $1 WHERE id = $2")
        .bind(cost)
        .bind(auth.0)
        .execute(&mut *tx)
        .await?;

    let purchase: Purchase = sqlx::query_as(
        r#"
        INSERT INTO purchases (user_id, symbol, quantity, price)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, symbol, quantity, price, created_at
        "#,
    )
    .bind(auth.0)
    .bind(&symbol)
    .bind(shares)
    .bind(quote.price)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    log::info!("user {} bought {} {} at {}", auth.0, shares, symbol, quote.price);

    Ok(Json(purchase))
}

/// GET /sell — what the sell form needs: the symbols currently held.
pub async fn sell_form(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let symbols: Vec<String> = ledger::positions(&state.pool, auth.0)
        .await?
        .into_iter()
        .filter(|p| p.shares > 0)
        .map(|p| p.symbol)
        .collect();

    Ok(Json(json!({ "symbols": symbols })))
}

pub async fn sell(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<TradeRequest>,
) -> Result<Json<Sell>, AppError> {
    let symbol = ledger::normalize_symbol(&req.symbol)?;
    let shares = ledger::validate_shares(req.shares)?;

    // sale-time price, independent of what the shares were bought for
    let quote = state.quotes.lookup(&symbol).await?;

    let mut tx = state.pool.begin().await?;

    // lock the user row before the held-shares check so a concurrent
    // sell cannot pass the same check against the same ledger state
    sqlx::query("SELECT cash FROM users WHERE id = $1 FOR UPDATE")
        .bind(auth.0)
        .execute(&mut *tx)
        .await?;

    let held = ledger::shares_held(&mut *tx, auth.0, &symbol).await?;
    let proceeds = ledger::sell_proceeds(quote.price, shares, held)?;

    sqlx::query("UPDATE users SET cash = cash + $1 WHERE id = $2")
        .bind(proceeds)
        .bind(auth.0)
        .execute(&mut *tx)
        .await?;

    let sale: Sell = sqlx::query_as(
        r#"
        INSERT INTO sells (user_id, symbol, quantity, price)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, symbol, quantity, price, created_at
        "#,
    )
    .bind(auth.0)
    .bind(&symbol)
    .bind(shares)
    .bind(quote.price)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    log::info!("user {} sold {} {} at {}", auth.0, shares, symbol, quote.price);

    Ok(Json(sale))
}

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub symbol: Option<String>,
}

/// GET /quote — an empty form object, or the quote when ?symbol= is given.
pub async fn quote_form(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    match query.symbol {
        Some(raw) => {
            let symbol = ledger::normalize_symbol(&raw)?;
            let quote = state.quotes.lookup(&symbol).await?;
            Ok(Json(json!({
                "symbol": quote.symbol,
                "name": quote.name,
                "price": quote.price,
            })))
        }
        None => Ok(Json(json!({}))),
    }
}

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub symbol: String,
}

/// POST /quote — look up one ticker.
pub async fn quote(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(req): Json<QuoteRequest>,
) -> Result<Json<Quote>, AppError> {
    let symbol = ledger::normalize_symbol(&req.symbol)?;
    let quote = state.quotes.lookup(&symbol).await?;
    Ok(Json(quote))
}

/// GET /history — every buy and sell, merged newest first.
pub async fn history(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    let entries: Vec<HistoryEntry> = sqlx::query_as(
        r#"
        SELECT 'buy' AS kind, symbol, quantity, price, created_at
        FROM purchases WHERE user_id = $1
        UNION ALL
        SELECT 'sell' AS kind, symbol, quantity, price, created_at
        FROM sells WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(auth.0)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(entries))
}
