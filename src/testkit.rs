//! # Test Kit
//!
//! Shared fakes for handler and router tests: an in-memory user store, a
//! chat provider that records replies, and a scripted brokerage whose
//! sessions read canned data and log every mutating call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};

use crate::domain::errors::{BrokerageError, StoreError};
use crate::domain::traits::{
    Brokerage, BrokerageSession, CarouselColumn, ChatProvider, PostbackChoice, UserStore,
};
use crate::domain::types::{
    Contract, Order, OrderAction, OrderLot, OrderStatus, OrderUpdate, Position, SecurityType,
    Trade, TradeStatus, User,
};

/// One recorded reply, shaped like the `ChatProvider` call that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Confirm {
        alt_text: String,
        text: String,
        actions: [PostbackChoice; 2],
    },
    Buttons {
        alt_text: String,
        text: String,
        actions: Vec<PostbackChoice>,
    },
    Carousel {
        alt_text: String,
        columns: Vec<CarouselColumn>,
    },
}

#[derive(Default)]
pub struct MockChat {
    replies: Mutex<Vec<Reply>>,
}

impl MockChat {
    pub fn replies(&self) -> Vec<Reply> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for MockChat {
    async fn reply_text(&self, text: &str) -> Result<(), String> {
        self.replies.lock().unwrap().push(Reply::Text(text.to_string()));
        Ok(())
    }

    async fn reply_confirm(
        &self,
        alt_text: &str,
        text: &str,
        actions: [PostbackChoice; 2],
    ) -> Result<(), String> {
        self.replies.lock().unwrap().push(Reply::Confirm {
            alt_text: alt_text.to_string(),
            text: text.to_string(),
            actions,
        });
        Ok(())
    }

    async fn reply_buttons(
        &self,
        alt_text: &str,
        text: &str,
        actions: Vec<PostbackChoice>,
    ) -> Result<(), String> {
        self.replies.lock().unwrap().push(Reply::Buttons {
            alt_text: alt_text.to_string(),
            text: text.to_string(),
            actions,
        });
        Ok(())
    }

    async fn reply_carousel(
        &self,
        alt_text: &str,
        columns: Vec<CarouselColumn>,
    ) -> Result<(), String> {
        self.replies.lock().unwrap().push(Reply::Carousel {
            alt_text: alt_text.to_string(),
            columns,
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, User>>,
}

impl MemoryUserStore {
    /// Store with one registered user, credentials from `test_user`.
    pub fn with_user(id: &str) -> Self {
        let store = Self::default();
        store.users.lock().unwrap().insert(id.to_string(), test_user(id));
        store
    }
}

impl UserStore for MemoryUserStore {
    fn user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.lock().unwrap().get(id).cloned())
    }

    fn upsert_user(&self, user: &User) -> Result<(), StoreError> {
        self.users
            .lock()
            .unwrap()
            .insert(user.id.clone(), user.clone());
        Ok(())
    }

    fn pending_template(&self, id: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .get(id)
            .and_then(|user| user.pending_template.clone()))
    }

    fn set_pending_template(&self, id: &str, template: Option<&str>) -> Result<(), StoreError> {
        if let Some(user) = self.users.lock().unwrap().get_mut(id) {
            user.pending_template = template.map(str::to_string);
        }
        Ok(())
    }

    fn take_pending_template(&self, id: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .get_mut(id)
            .and_then(|user| user.pending_template.take()))
    }
}

pub fn test_user(id: &str) -> User {
    User {
        id: id.to_string(),
        api_key: "key".to_string(),
        secret_key: "secret".to_string(),
        ca_path: "/tmp/ca.pfx".to_string(),
        ca_passwd: "capass".to_string(),
        person_id: "A123456789".to_string(),
        pending_template: None,
    }
}

/// Canned brokerage data and a log of everything the handlers did with it.
#[derive(Default)]
pub struct BrokerageScript {
    pub balance: i64,
    pub contracts: HashMap<String, Contract>,
    pub positions: Vec<Position>,
    pub trades: Vec<Trade>,
    pub fail_open: bool,
    pub fail_place_order: bool,
    pub placed: Mutex<Vec<PlacedOrder>>,
    pub updates: Mutex<Vec<(String, OrderUpdate)>>,
    pub cancelled: Mutex<Vec<String>>,
    pub closes: Mutex<u32>,
}

/// Arguments of one recorded `place_order` call.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedOrder {
    pub code: String,
    pub price: f64,
    pub quantity: u32,
    pub action: OrderAction,
    pub order_lot: OrderLot,
}

pub struct MockBrokerage {
    script: Arc<BrokerageScript>,
}

impl MockBrokerage {
    pub fn new(script: Arc<BrokerageScript>) -> Self {
        Self { script }
    }
}

#[async_trait]
impl Brokerage for MockBrokerage {
    async fn open_session(&self, _user: &User) -> Result<Box<dyn BrokerageSession>, BrokerageError> {
        if self.script.fail_open {
            return Err(BrokerageError::Api {
                status: 503,
                message: "scripted login failure".to_string(),
            });
        }
        Ok(Box::new(MockSession {
            script: self.script.clone(),
        }))
    }
}

struct MockSession {
    script: Arc<BrokerageScript>,
}

#[async_trait]
impl BrokerageSession for MockSession {
    async fn account_balance(&self) -> Result<i64, BrokerageError> {
        Ok(self.script.balance)
    }

    async fn contract(&self, stock_id: &str) -> Result<Option<Contract>, BrokerageError> {
        Ok(self.script.contracts.get(stock_id).cloned())
    }

    async fn place_order(
        &self,
        contract: &Contract,
        price: f64,
        quantity: u32,
        action: OrderAction,
        order_lot: OrderLot,
    ) -> Result<Trade, BrokerageError> {
        if self.script.fail_place_order {
            return Err(BrokerageError::Api {
                status: 500,
                message: "scripted order failure".to_string(),
            });
        }
        self.script.placed.lock().unwrap().push(PlacedOrder {
            code: contract.code.clone(),
            price,
            quantity,
            action,
            order_lot,
        });
        Ok(Trade {
            order: Order {
                id: "O1234".to_string(),
                action,
                price,
                quantity,
                order_lot,
                security_type: SecurityType::Stock,
            },
            status: TradeStatus {
                status: OrderStatus::Submitted,
                cancel_quantity: 0,
                modified_price: 0.0,
                order_time: fixed_time(),
            },
            contract_code: contract.code.clone(),
        })
    }

    async fn list_positions(&self) -> Result<Vec<Position>, BrokerageError> {
        Ok(self.script.positions.clone())
    }

    async fn list_trades(&self) -> Result<Vec<Trade>, BrokerageError> {
        Ok(self.script.trades.clone())
    }

    async fn trade(&self, order_id: &str) -> Result<Option<Trade>, BrokerageError> {
        Ok(self
            .script
            .trades
            .iter()
            .find(|trade| trade.order.id == order_id)
            .cloned())
    }

    async fn update_order(
        &self,
        trade: &Trade,
        update: OrderUpdate,
    ) -> Result<(), BrokerageError> {
        self.script
            .updates
            .lock()
            .unwrap()
            .push((trade.order.id.clone(), update));
        Ok(())
    }

    async fn cancel_order(&self, trade: &Trade) -> Result<(), BrokerageError> {
        self.script
            .cancelled
            .lock()
            .unwrap()
            .push(trade.order.id.clone());
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerageError> {
        *self.script.closes.lock().unwrap() += 1;
        Ok(())
    }
}

pub fn test_contract(code: &str, name: &str, reference: f64) -> Contract {
    Contract {
        code: code.to_string(),
        name: name.to_string(),
        reference,
        limit_up: reference + reference / 10.0,
        limit_down: reference - reference / 10.0,
        unit: 1000,
    }
}

pub fn test_trade(
    id: &str,
    code: &str,
    status: OrderStatus,
    order_lot: OrderLot,
    quantity: u32,
    price: f64,
) -> Trade {
    Trade {
        order: Order {
            id: id.to_string(),
            action: OrderAction::Buy,
            price,
            quantity,
            order_lot,
            security_type: SecurityType::Stock,
        },
        status: TradeStatus {
            status,
            cancel_quantity: 0,
            modified_price: 0.0,
            order_time: fixed_time(),
        },
        contract_code: code.to_string(),
    }
}

pub fn fixed_time() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap()
}
