use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// One append-only buy row; price is the quote at purchase time.
#[derive(Debug, FromRow, Serialize, ToSchema)]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub symbol: String,
    pub quantity: i64,
    pub price: Decimal,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// One append-only sell row; price is the quote at sale time.
#[derive(Debug, FromRow, Serialize, ToSchema)]
pub struct Sell {
    pub id: Uuid,
    pub user_id: Uuid,
    pub symbol: String,
    pub quantity: i64,
    pub price: Decimal,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TradeRequest {
    pub symbol: String,
    pub shares: i64,
}

/// A buy or sell row as shown on the history page, newest first.
#[derive(Debug, FromRow, Serialize, ToSchema)]
pub struct HistoryEntry {
    pub kind: String,
    pub symbol: String,
    pub quantity: i64,
    pub price: Decimal,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
