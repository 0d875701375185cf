//! # Command Handlers
//!
//! Contains one handler function per supported command (place_order,
//! update_order, list_trades, stock, balance, cancel). These handlers are
//! invoked by the Router.

pub mod balance;
pub mod cancel;
pub mod list_trades;
pub mod place_order;
pub mod stock;
pub mod update_order;
