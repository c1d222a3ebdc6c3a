use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub price: Decimal,
}

/// External price source. Behind a trait so handlers and the holdings
/// computation can be exercised against a canned implementation.
#[async_trait]
pub trait QuoteLookup: Send + Sync {
    /// Current quote for `symbol`, or `UnknownSymbol` when the ticker
    /// does not resolve at the provider.
    async fn lookup(&self, symbol: &str) -> Result<Quote, AppError>;
}

pub struct HttpQuoteClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpQuoteClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuotePayload {
    symbol: String,
    #[serde(rename = "companyName")]
    company_name: String,
    #[serde(rename = "latestPrice")]
    latest_price: Decimal,
}

#[async_trait]
impl QuoteLookup for HttpQuoteClient {
    async fn lookup(&self, symbol: &str) -> Result<Quote, AppError> {
        let url = format!("{}/stock/{}/quote", self.base_url, symbol);
        let resp = self
            .client
            .get(&url)
            .query(&[("token", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| AppError::Quote(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::UnknownSymbol(symbol.to_string()));
        }

        let payload: QuotePayload = resp
            .error_for_status()
            .map_err(|e| AppError::Quote(e.to_string()))?
            .json()
            .await
            .map_err(|e| AppError::Quote(e.to_string()))?;

        Ok(Quote {
            symbol: payload.symbol.to_uppercase(),
            name: payload.company_name,
            price: payload.latest_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn provider_payload_maps_onto_quote_fields() {
        let payload: QuotePayload = serde_json::from_str(
            r#"{"symbol": "nflx", "companyName": "Netflix, Inc.", "latestPrice": 482.95, "volume": 3370900}"#,
        )
        .unwrap();

        assert_eq!(payload.symbol, "nflx");
        assert_eq!(payload.company_name, "Netflix, Inc.");
        assert_eq!(payload.latest_price, dec!(482.95));
    }

    #[test]
    fn payload_without_price_is_rejected() {
        let result: Result<QuotePayload, _> =
            serde_json::from_str(r#"{"symbol": "NFLX", "companyName": "Netflix, Inc."}"#);
        assert!(result.is_err());
    }
}
