/*
[INPUT]:  Order identifiers
[OUTPUT]: Order details and batch cancel results
[POS]:    HTTP layer - order endpoints (requires JWT)
[UPDATE]: When adding new order endpoints or changing request format
*/

use crate::http::{CoinbaseClient, CoinbaseError, Result};
use crate::types::{CancelOrdersRequest, CancelOrdersResponse, Order, OrderResponse};
use reqwest::Method;

impl CoinbaseClient {
    /// Get a single order, open or historical
    ///
    /// GET /api/v3/brokerage/orders/historical/{order_id}
    pub async fn get_order(&self, order_id: &str) -> Result<Order> {
        let endpoint = format!("/api/v3/brokerage/orders/historical/{order_id}");
        let builder = self.authed_request(Method::GET, &endpoint).await?;
        let response: OrderResponse = self.send_json(builder).await?;
        Ok(response.order)
    }

    /// Cancel orders by id
    ///
    /// POST /api/v3/brokerage/orders/batch_cancel
    pub async fn cancel_orders(&self, order_ids: &[String]) -> Result<CancelOrdersResponse> {
        if order_ids.is_empty() {
            return Err(CoinbaseError::InvalidRequest(
                "cancel_orders requires at least one order id".to_string(),
            ));
        }

        let request = CancelOrdersRequest {
            order_ids: order_ids.to_vec(),
        };
        let builder = self
            .authed_request(Method::POST, "/api/v3/brokerage/orders/batch_cancel")
            .await?
            .json(&request);
        self.send_json(builder).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::auth::MockTokenProvider;
    use crate::http::{ClientConfig, CoinbaseClient, CoinbaseError};
    use crate::types::{OrderSide, OrderStatus, OrderType};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn authed_client(server: &MockServer) -> CoinbaseClient {
        CoinbaseClient::with_config(ClientConfig {
            base_url: server.uri(),
            ..ClientConfig::default()
        })
        .expect("client init")
        .with_token_provider(Arc::new(MockTokenProvider::new("key", "test.jwt")))
    }

    #[tokio::test]
    async fn test_get_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/brokerage/orders/historical/o-1"))
            .and(header("authorization", "Bearer test.jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "order": {
                    "order_id": "o-1",
                    "product_id": "BTC-USD",
                    "client_order_id": "c-1",
                    "side": "SELL",
                    "status": "FILLED",
                    "order_type": "MARKET",
                    "created_time": "2024-03-01T12:00:00.5Z",
                    "filled_size": "0.01",
                    "average_filled_price": "64000",
                    "total_fees": "1.28",
                    "completion_percentage": "100"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let order = authed_client(&server)
            .get_order("o-1")
            .await
            .expect("get_order failed");

        assert_eq!(order.side, OrderSide::Sell);
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.order_type, OrderType::Market);
        assert_eq!(
            order.average_filled_price,
            "64000".parse::<rust_decimal::Decimal>().unwrap()
        );
        assert_eq!(order.completion_percentage.as_deref(), Some("100"));
    }

    #[tokio::test]
    async fn test_cancel_orders() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v3/brokerage/orders/batch_cancel"))
            .and(body_json(serde_json::json!({"order_ids": ["o-1", "o-2"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"success": true, "failure_reason": "UNKNOWN_CANCEL_FAILURE_REASON", "order_id": "o-1"},
                    {"success": false, "failure_reason": "UNKNOWN_CANCEL_ORDER", "order_id": "o-2"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = authed_client(&server)
            .cancel_orders(&["o-1".to_string(), "o-2".to_string()])
            .await
            .expect("cancel_orders failed");

        assert_eq!(response.results.len(), 2);
        assert!(response.results[0].success);
        assert!(!response.results[1].success);
        assert_eq!(response.results[1].failure_reason, "UNKNOWN_CANCEL_ORDER");
    }

    #[tokio::test]
    async fn test_cancel_orders_requires_ids() {
        let server = MockServer::start().await;
        let err = authed_client(&server).cancel_orders(&[]).await.unwrap_err();
        assert!(matches!(err, CoinbaseError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/brokerage/orders/historical/o-9"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let err = authed_client(&server).get_order("o-9").await.unwrap_err();
        assert!(matches!(err, CoinbaseError::RateLimit { retry_after: 7 }));
        assert_eq!(err.retry_delay(), Some(7));
    }
}
