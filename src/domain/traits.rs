//! # Domain Traits
//!
//! Abstract interfaces for the chat transport, user persistence and the
//! brokerage gateway. Allows for pluggable implementations in the
//! Infrastructure layer and mocks in tests.

use async_trait::async_trait;

use crate::domain::errors::{BrokerageError, StoreError};
use crate::domain::types::{Contract, OrderAction, OrderLot, OrderUpdate, Position, Trade, User};

/// A labelled button whose payload is an encoded command invocation. Tapping
/// it delivers the payload back verbatim as a postback event.
#[derive(Debug, Clone, PartialEq)]
pub struct PostbackChoice {
    pub label: String,
    pub data: String,
}

/// One card of a carousel reply.
#[derive(Debug, Clone, PartialEq)]
pub struct CarouselColumn {
    pub text: String,
    pub actions: Vec<PostbackChoice>,
}

/// Abstract interface for the chat transport (e.g. LINE, console).
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a plain text reply.
    async fn reply_text(&self, text: &str) -> Result<(), String>;

    /// Send a question with exactly two choice buttons.
    async fn reply_confirm(
        &self,
        alt_text: &str,
        text: &str,
        actions: [PostbackChoice; 2],
    ) -> Result<(), String>;

    /// Send a question with up to four choice buttons.
    async fn reply_buttons(
        &self,
        alt_text: &str,
        text: &str,
        actions: Vec<PostbackChoice>,
    ) -> Result<(), String>;

    /// Send a carousel of cards, each with its own buttons.
    async fn reply_carousel(
        &self,
        alt_text: &str,
        columns: Vec<CarouselColumn>,
    ) -> Result<(), String>;
}

/// Persistence for users and their pending continuation templates.
pub trait UserStore: Send + Sync {
    fn user(&self, id: &str) -> Result<Option<User>, StoreError>;

    fn upsert_user(&self, user: &User) -> Result<(), StoreError>;

    fn pending_template(&self, id: &str) -> Result<Option<String>, StoreError>;

    fn set_pending_template(&self, id: &str, template: Option<&str>) -> Result<(), StoreError>;

    /// Read and clear in one step, so two rapid messages can never resolve
    /// against the same template.
    fn take_pending_template(&self, id: &str) -> Result<Option<String>, StoreError>;
}

/// Factory for brokerage sessions. One session per command dispatch; nothing
/// is cached across commands.
#[async_trait]
pub trait Brokerage: Send + Sync {
    /// Log in with the user's credentials and activate their certificate.
    async fn open_session(&self, user: &User) -> Result<Box<dyn BrokerageSession>, BrokerageError>;
}

/// An authenticated brokerage session scoped to a single command.
#[async_trait]
pub trait BrokerageSession: Send + Sync {
    async fn account_balance(&self) -> Result<i64, BrokerageError>;

    async fn contract(&self, stock_id: &str) -> Result<Option<Contract>, BrokerageError>;

    async fn place_order(
        &self,
        contract: &Contract,
        price: f64,
        quantity: u32,
        action: OrderAction,
        order_lot: OrderLot,
    ) -> Result<Trade, BrokerageError>;

    async fn list_positions(&self) -> Result<Vec<Position>, BrokerageError>;

    async fn list_trades(&self) -> Result<Vec<Trade>, BrokerageError>;

    async fn trade(&self, order_id: &str) -> Result<Option<Trade>, BrokerageError>;

    async fn update_order(&self, trade: &Trade, update: OrderUpdate)
        -> Result<(), BrokerageError>;

    async fn cancel_order(&self, trade: &Trade) -> Result<(), BrokerageError>;

    /// Log out. Best-effort; callers only log a failure here.
    async fn close(&self) -> Result<(), BrokerageError>;
}
