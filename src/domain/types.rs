//! # Brokerage Types
//!
//! Contracts, positions, orders and trades as returned by the trading
//! gateway, plus the enumerations shared across the command flows. Labels are
//! Traditional Chinese, matching the brokerage's market.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Buy/sell side of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderAction {
    Buy,
    Sell,
}

impl OrderAction {
    pub fn as_str(&self) -> &str {
        match self {
            OrderAction::Buy => "Buy",
            OrderAction::Sell => "Sell",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Buy" => Some(OrderAction::Buy),
            "Sell" => Some(OrderAction::Sell),
            _ => None,
        }
    }

    /// Label shown to the user.
    pub fn label(&self) -> &str {
        match self {
            OrderAction::Buy => "買",
            OrderAction::Sell => "賣",
        }
    }
}

/// Stock order lot category. Only a subset can be placed through the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderLot {
    Common,
    BlockTrade,
    Fixing,
    Odd,
    IntradayOdd,
}

impl OrderLot {
    pub fn as_str(&self) -> &str {
        match self {
            OrderLot::Common => "Common",
            OrderLot::BlockTrade => "BlockTrade",
            OrderLot::Fixing => "Fixing",
            OrderLot::Odd => "Odd",
            OrderLot::IntradayOdd => "IntradayOdd",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Common" => Some(OrderLot::Common),
            "BlockTrade" => Some(OrderLot::BlockTrade),
            "Fixing" => Some(OrderLot::Fixing),
            "Odd" => Some(OrderLot::Odd),
            "IntradayOdd" => Some(OrderLot::IntradayOdd),
            _ => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            OrderLot::Common => "整股",
            OrderLot::BlockTrade => "鉅額",
            OrderLot::Fixing => "盤後定價",
            OrderLot::Odd => "盤後零股",
            OrderLot::IntradayOdd => "盤中零股",
        }
    }

    /// Block trades and fixing orders cannot be placed or modified here.
    pub fn is_placeable(&self) -> bool {
        matches!(self, OrderLot::Common | OrderLot::Odd | OrderLot::IntradayOdd)
    }

    /// Quantity unit word: board lots for round-lot orders, shares otherwise.
    pub fn unit_label(&self) -> &str {
        match self {
            OrderLot::Common => "張",
            _ => "股",
        }
    }
}

/// Lifecycle state of an order at the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    PendingSubmit,
    PreSubmitted,
    Submitted,
    Failed,
    Cancelled,
    Filled,
    PartFilled,
}

impl OrderStatus {
    /// Status message shown to the user.
    pub fn label(&self) -> &str {
        match self {
            OrderStatus::PendingSubmit => "傳送中",
            OrderStatus::PreSubmitted => "預約單",
            OrderStatus::Submitted => "傳送成功",
            OrderStatus::Failed => "失敗",
            OrderStatus::Cancelled => "已刪除",
            OrderStatus::Filled => "完全成交",
            OrderStatus::PartFilled => "部分成交",
        }
    }
}

/// Instrument kind of an order. The bot only models stock orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityType {
    #[serde(rename = "STK")]
    Stock,
    #[serde(rename = "FUT")]
    Future,
    #[serde(rename = "OPT")]
    Option,
    #[serde(rename = "IND")]
    Index,
}

/// Listed instrument metadata.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Contract {
    pub code: String,
    pub name: String,
    pub reference: f64,
    pub limit_up: f64,
    pub limit_down: f64,
    /// Shares per board lot.
    #[serde(default = "default_unit")]
    pub unit: u32,
}

fn default_unit() -> u32 {
    1000
}

/// An open position in the user's account.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Position {
    pub code: String,
    pub quantity: u32,
    pub price: f64,
    pub last_price: f64,
    pub pnl: f64,
}

/// The immutable half of a trade: what was asked of the exchange.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Order {
    pub id: String,
    pub action: OrderAction,
    pub price: f64,
    pub quantity: u32,
    pub order_lot: OrderLot,
    pub security_type: SecurityType,
}

/// The mutable half: how the exchange has treated the order so far.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TradeStatus {
    pub status: OrderStatus,
    /// Quantity after a partial cancel; zero when untouched.
    pub cancel_quantity: u32,
    /// Price after a reprice; zero when untouched.
    pub modified_price: f64,
    pub order_time: DateTime<Local>,
}

/// A brokerage order together with its current execution status.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Trade {
    pub order: Order,
    pub status: TradeStatus,
    pub contract_code: String,
}

impl Trade {
    /// Current quantity, accounting for partial cancellation.
    pub fn effective_quantity(&self) -> u32 {
        if self.status.cancel_quantity == 0 {
            self.order.quantity
        } else {
            self.status.cancel_quantity
        }
    }

    /// Current price, accounting for a reprice.
    pub fn effective_price(&self) -> f64 {
        if self.status.modified_price == 0.0 {
            self.order.price
        } else {
            self.status.modified_price
        }
    }
}

/// A registered user and their brokerage credentials. `pending_template`
/// holds the serialized half-finished command awaiting the next reply.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub api_key: String,
    pub secret_key: String,
    pub ca_path: String,
    pub ca_passwd: String,
    pub person_id: String,
    pub pending_template: Option<String>,
}

/// A single change to a working order. The gateway accepts one field per
/// call, so the two cases are mutually exclusive by construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderUpdate {
    Price(f64),
    Quantity(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_lot_round_trip() {
        for lot in [
            OrderLot::Common,
            OrderLot::BlockTrade,
            OrderLot::Fixing,
            OrderLot::Odd,
            OrderLot::IntradayOdd,
        ] {
            assert_eq!(OrderLot::from_str(lot.as_str()), Some(lot));
        }
        assert_eq!(OrderLot::from_str("Margin"), None);
    }

    #[test]
    fn test_placeable_lots() {
        assert!(OrderLot::Common.is_placeable());
        assert!(OrderLot::Odd.is_placeable());
        assert!(OrderLot::IntradayOdd.is_placeable());
        assert!(!OrderLot::BlockTrade.is_placeable());
        assert!(!OrderLot::Fixing.is_placeable());
    }

    #[test]
    fn test_effective_quantity_and_price() {
        let mut trade = Trade {
            order: Order {
                id: "O1".to_string(),
                action: OrderAction::Buy,
                price: 600.0,
                quantity: 5,
                order_lot: OrderLot::Common,
                security_type: SecurityType::Stock,
            },
            status: TradeStatus {
                status: OrderStatus::Submitted,
                cancel_quantity: 0,
                modified_price: 0.0,
                order_time: Local::now(),
            },
            contract_code: "2330".to_string(),
        };
        assert_eq!(trade.effective_quantity(), 5);
        assert_eq!(trade.effective_price(), 600.0);

        trade.status.cancel_quantity = 3;
        trade.status.modified_price = 598.0;
        assert_eq!(trade.effective_quantity(), 3);
        assert_eq!(trade.effective_price(), 598.0);
    }

    #[test]
    fn test_security_type_wire_names() {
        let stock: SecurityType = serde_json::from_str("\"STK\"").unwrap();
        assert_eq!(stock, SecurityType::Stock);
        let future: SecurityType = serde_json::from_str("\"FUT\"").unwrap();
        assert_eq!(future, SecurityType::Future);
    }
}
