//! # Brokerage Gateway Client
//!
//! HTTP client for the trading gateway that fronts the broker's API. Every
//! command opens a fresh session with the user's credentials, performs its
//! calls against that session and closes it again; nothing is cached across
//! commands.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::domain::config::BrokerageConfig;
use crate::domain::errors::BrokerageError;
use crate::domain::traits::{Brokerage, BrokerageSession};
use crate::domain::types::{Contract, OrderAction, OrderLot, OrderUpdate, Position, Trade, User};

/// HTTP client reused across requests
fn http_client() -> &'static Client {
    use std::sync::OnceLock;
    static CLIENT: OnceLock<Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client")
    })
}

#[derive(Debug, Serialize)]
struct OpenSessionRequest {
    api_key: String,
    secret_key: String,
    ca_path: String,
    ca_passwd: String,
    person_id: String,
}

#[derive(Debug, Deserialize)]
struct OpenSessionResponse {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: i64,
}

#[derive(Debug, Serialize)]
struct PlaceOrderRequest {
    code: String,
    price: f64,
    quantity: u32,
    action: OrderAction,
    order_lot: OrderLot,
}

/// The gateway accepts exactly one change per call, so the unused field is
/// omitted entirely.
#[derive(Debug, Serialize)]
struct UpdateOrderRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quantity: Option<u32>,
}

async fn check(response: Response) -> Result<Response, BrokerageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());
    Err(BrokerageError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Like `check`, but a 404 means the resource does not exist rather than a
/// failure.
async fn check_optional(response: Response) -> Result<Option<Response>, BrokerageError> {
    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    Ok(Some(check(response).await?))
}

pub struct HttpBrokerage {
    base_url: String,
    timeout: Duration,
}

impl HttpBrokerage {
    pub fn new(config: &BrokerageConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl Brokerage for HttpBrokerage {
    async fn open_session(&self, user: &User) -> Result<Box<dyn BrokerageSession>, BrokerageError> {
        let request = OpenSessionRequest {
            api_key: user.api_key.clone(),
            secret_key: user.secret_key.clone(),
            ca_path: user.ca_path.clone(),
            ca_passwd: user.ca_passwd.clone(),
            person_id: user.person_id.clone(),
        };
        let response = http_client()
            .post(format!("{}/sessions", self.base_url))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?;
        let opened: OpenSessionResponse = check(response).await?.json().await?;
        tracing::debug!("Opened brokerage session for user='{}'", user.id);
        Ok(Box::new(HttpSession {
            base_url: self.base_url.clone(),
            timeout: self.timeout,
            session_id: opened.session_id,
        }))
    }
}

struct HttpSession {
    base_url: String,
    timeout: Duration,
    session_id: String,
}

impl HttpSession {
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/sessions/{}{}", self.base_url, self.session_id, path);
        http_client().request(method, url).timeout(self.timeout)
    }
}

#[async_trait]
impl BrokerageSession for HttpSession {
    async fn account_balance(&self) -> Result<i64, BrokerageError> {
        let response = self.request(Method::GET, "/balance").send().await?;
        let balance: BalanceResponse = check(response).await?.json().await?;
        Ok(balance.balance)
    }

    async fn contract(&self, stock_id: &str) -> Result<Option<Contract>, BrokerageError> {
        let response = self
            .request(Method::GET, &format!("/contracts/{}", stock_id))
            .send()
            .await?;
        match check_optional(response).await? {
            Some(response) => Ok(Some(response.json().await?)),
            None => Ok(None),
        }
    }

    async fn place_order(
        &self,
        contract: &Contract,
        price: f64,
        quantity: u32,
        action: OrderAction,
        order_lot: OrderLot,
    ) -> Result<Trade, BrokerageError> {
        let request = PlaceOrderRequest {
            code: contract.code.clone(),
            price,
            quantity,
            action,
            order_lot,
        };
        let response = self
            .request(Method::POST, "/orders")
            .json(&request)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    async fn list_positions(&self) -> Result<Vec<Position>, BrokerageError> {
        let response = self.request(Method::GET, "/positions").send().await?;
        Ok(check(response).await?.json().await?)
    }

    async fn list_trades(&self) -> Result<Vec<Trade>, BrokerageError> {
        let response = self.request(Method::GET, "/trades").send().await?;
        Ok(check(response).await?.json().await?)
    }

    async fn trade(&self, order_id: &str) -> Result<Option<Trade>, BrokerageError> {
        let response = self
            .request(Method::GET, &format!("/trades/{}", order_id))
            .send()
            .await?;
        match check_optional(response).await? {
            Some(response) => Ok(Some(response.json().await?)),
            None => Ok(None),
        }
    }

    async fn update_order(
        &self,
        trade: &Trade,
        update: OrderUpdate,
    ) -> Result<(), BrokerageError> {
        let request = match update {
            OrderUpdate::Price(price) => UpdateOrderRequest {
                price: Some(price),
                quantity: None,
            },
            OrderUpdate::Quantity(quantity) => UpdateOrderRequest {
                price: None,
                quantity: Some(quantity),
            },
        };
        let response = self
            .request(Method::PATCH, &format!("/orders/{}", trade.order.id))
            .json(&request)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn cancel_order(&self, trade: &Trade) -> Result<(), BrokerageError> {
        let response = self
            .request(Method::DELETE, &format!("/orders/{}", trade.order.id))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerageError> {
        let response = self.request(Method::DELETE, "").send().await?;
        check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_order_request_wire_shape() {
        let request = PlaceOrderRequest {
            code: "2330".to_string(),
            price: 600.0,
            quantity: 2,
            action: OrderAction::Buy,
            order_lot: OrderLot::Common,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "code": "2330",
                "price": 600.0,
                "quantity": 2,
                "action": "Buy",
                "order_lot": "Common"
            })
        );
    }

    #[test]
    fn test_update_request_carries_exactly_one_field() {
        let reprice = UpdateOrderRequest {
            price: Some(598.0),
            quantity: None,
        };
        assert_eq!(
            serde_json::to_value(&reprice).unwrap(),
            serde_json::json!({"price": 598.0})
        );

        let reduce = UpdateOrderRequest {
            price: None,
            quantity: Some(1),
        };
        assert_eq!(
            serde_json::to_value(&reduce).unwrap(),
            serde_json::json!({"quantity": 1})
        );
    }

    #[test]
    fn test_open_session_response_parses() {
        let response: OpenSessionResponse =
            serde_json::from_str(r#"{"session_id": "s-123"}"#).unwrap();
        assert_eq!(response.session_id, "s-123");
    }

    #[test]
    fn test_contract_parses_with_default_unit() {
        let contract: Contract = serde_json::from_str(
            r#"{"code": "2330", "name": "台積電", "reference": 600.0, "limit_up": 660.0, "limit_down": 540.0}"#,
        )
        .unwrap();
        assert_eq!(contract.unit, 1000);
        assert_eq!(contract.name, "台積電");
    }

    #[test]
    fn test_trade_parses() {
        let trade: Trade = serde_json::from_str(
            r#"{
                "order": {
                    "id": "O1",
                    "action": "Sell",
                    "price": 600.0,
                    "quantity": 3,
                    "order_lot": "Common",
                    "security_type": "STK"
                },
                "status": {
                    "status": "PartFilled",
                    "cancel_quantity": 2,
                    "modified_price": 0.0,
                    "order_time": "2024-01-15T09:30:00+08:00"
                },
                "contract_code": "2330"
            }"#,
        )
        .unwrap();
        assert_eq!(trade.order.id, "O1");
        assert_eq!(trade.order.action, OrderAction::Sell);
        assert_eq!(trade.effective_quantity(), 2);
        assert_eq!(trade.status.status.label(), "部分成交");
    }
}
