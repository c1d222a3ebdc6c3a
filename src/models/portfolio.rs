use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct Holding {
    pub symbol: String,
    pub name: String,
    pub shares: i64,
    pub price: Decimal,
    pub value: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PortfolioView {
    pub cash: Decimal,
    pub holdings: Vec<Holding>,
    pub grand_total: Decimal,
}
