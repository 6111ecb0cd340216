/*
[INPUT]:  Product identifiers and query parameters
[OUTPUT]: Market data (server time, products, order book, candles)
[POS]:    HTTP layer - public market data endpoints (no auth required)
[UPDATE]: When adding new public endpoints or changing response format
*/

use crate::http::{CoinbaseClient, Result};
use crate::types::{CandlesResponse, Candle, Granularity, PriceBook, PriceBookResponse, Product, ServerTime};
use reqwest::Method;

impl CoinbaseClient {
    /// Query the venue clock
    ///
    /// GET /api/v3/brokerage/time
    pub async fn get_server_time(&self) -> Result<ServerTime> {
        let builder = self.public_request(Method::GET, "/api/v3/brokerage/time")?;
        self.send_json(builder).await
    }

    /// Query a single product
    ///
    /// GET /api/v3/brokerage/market/products/{product_id}
    pub async fn get_public_product(&self, product_id: &str) -> Result<Product> {
        let endpoint = format!("/api/v3/brokerage/market/products/{product_id}");
        let builder = self.public_request(Method::GET, &endpoint)?;
        self.send_json(builder).await
    }

    /// Query aggregated order book levels
    ///
    /// GET /api/v3/brokerage/market/product_book?product_id={product_id}&limit={limit}
    pub async fn get_public_product_book(
        &self,
        product_id: &str,
        limit: Option<u32>,
    ) -> Result<PriceBook> {
        let mut builder = self
            .public_request(Method::GET, "/api/v3/brokerage/market/product_book")?
            .query(&[("product_id", product_id)]);
        if let Some(limit) = limit {
            builder = builder.query(&[("limit", limit)]);
        }

        let response: PriceBookResponse = self.send_json(builder).await?;
        Ok(response.pricebook)
    }

    /// Get candles between two unix timestamps
    ///
    /// GET /api/v3/brokerage/market/products/{product_id}/candles?start={start}&end={end}&granularity={granularity}
    pub async fn get_public_candles(
        &self,
        product_id: &str,
        start: i64,
        end: i64,
        granularity: Granularity,
    ) -> Result<Vec<Candle>> {
        let endpoint = format!("/api/v3/brokerage/market/products/{product_id}/candles");
        let builder = self.public_request(Method::GET, &endpoint)?.query(&[
            ("start", start.to_string()),
            ("end", end.to_string()),
            ("granularity", granularity.as_str().to_string()),
        ]);

        let response: CandlesResponse = self.send_json(builder).await?;
        response
            .candles
            .into_iter()
            .map(|wire| {
                let mut candle = Candle::try_from(wire)?;
                candle.product_id = product_id.to_string();
                Ok(candle)
            })
            .collect()
    }
}
