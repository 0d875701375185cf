//! # Command Model
//!
//! Typed invocations for every bot command. Each multi-step command declares
//! its parameters in a fixed order and knows which one is next-missing, so
//! the dispatcher can walk the order strictly forward, one prompt per
//! parameter, until the command is complete.

use crate::domain::types::{OrderAction, OrderLot};

/// One argument slot of a multi-step command.
///
/// `Unset` means the user has not supplied the value yet; `Pending` marks the
/// single slot the next free-text reply will fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arg<T> {
    Unset,
    Pending,
    Value(T),
}

impl<T> Arg<T> {
    /// Unset and pending slots both still need a value.
    pub fn is_missing(&self) -> bool {
        !matches!(self, Arg::Value(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Arg::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl<T> Default for Arg<T> {
    fn default() -> Self {
        Arg::Unset
    }
}

/// Every command the bot understands, with its typed arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    PlaceOrder(PlaceOrderArgs),
    UpdateOrder(UpdateOrderArgs),
    ListTrades(ListTradesArgs),
    Stock,
    Balance,
    Cancel,
}

impl Invocation {
    /// Command name on the wire.
    pub fn name(&self) -> &str {
        match self {
            Invocation::PlaceOrder(_) => "place_order",
            Invocation::UpdateOrder(_) => "update_order",
            Invocation::ListTrades(_) => "list_trades",
            Invocation::Stock => "stock",
            Invocation::Balance => "balance",
            Invocation::Cancel => "cancel",
        }
    }
}

/// Arguments of `place_order`, in prompt order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceOrderArgs {
    pub order_lot: Arg<OrderLot>,
    pub stock_id: Arg<String>,
    pub price: Arg<f64>,
    pub quantity: Arg<u32>,
    pub action: Arg<OrderAction>,
    pub confirm: bool,
}

/// Parameters of `place_order`, in the order they are asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOrderParam {
    OrderLot,
    StockId,
    Price,
    Quantity,
    Action,
}

impl PlaceOrderArgs {
    /// First parameter still missing, in declared order.
    pub fn next_missing(&self) -> Option<PlaceOrderParam> {
        if self.order_lot.is_missing() {
            return Some(PlaceOrderParam::OrderLot);
        }
        if self.stock_id.is_missing() {
            return Some(PlaceOrderParam::StockId);
        }
        if self.price.is_missing() {
            return Some(PlaceOrderParam::Price);
        }
        if self.quantity.is_missing() {
            return Some(PlaceOrderParam::Quantity);
        }
        if self.action.is_missing() {
            return Some(PlaceOrderParam::Action);
        }
        None
    }

    /// Copy with one slot marked as the free-text placeholder.
    pub fn with_pending(&self, param: PlaceOrderParam) -> Self {
        let mut args = self.clone();
        match param {
            PlaceOrderParam::OrderLot => args.order_lot = Arg::Pending,
            PlaceOrderParam::StockId => args.stock_id = Arg::Pending,
            PlaceOrderParam::Price => args.price = Arg::Pending,
            PlaceOrderParam::Quantity => args.quantity = Arg::Pending,
            PlaceOrderParam::Action => args.action = Arg::Pending,
        }
        args
    }
}

/// Arguments of `update_order`. `update_quantity` selects which of the two
/// remaining parameters the flow asks for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOrderArgs {
    pub trade_id: Arg<String>,
    pub update_quantity: bool,
    pub quantity: Arg<u32>,
    pub price: Arg<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOrderParam {
    TradeId,
    Quantity,
    Price,
}

impl UpdateOrderArgs {
    pub fn next_missing(&self) -> Option<UpdateOrderParam> {
        if self.trade_id.is_missing() {
            return Some(UpdateOrderParam::TradeId);
        }
        if self.update_quantity {
            if self.quantity.is_missing() {
                return Some(UpdateOrderParam::Quantity);
            }
        } else if self.price.is_missing() {
            return Some(UpdateOrderParam::Price);
        }
        None
    }

    pub fn with_pending(&self, param: UpdateOrderParam) -> Self {
        let mut args = self.clone();
        match param {
            UpdateOrderParam::TradeId => args.trade_id = Arg::Pending,
            UpdateOrderParam::Quantity => args.quantity = Arg::Pending,
            UpdateOrderParam::Price => args.price = Arg::Pending,
        }
        args
    }
}

/// Arguments of `list_trades`: one filter, no multi-step flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListTradesArgs {
    pub filled_only: bool,
}
