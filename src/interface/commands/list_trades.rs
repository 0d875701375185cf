//! # List Trades Command
//!
//! Handles `cmd=list_trades`: shows today's orders as a carousel, optionally
//! narrowed to filled ones. Working orders get modify/delete buttons that
//! feed the update-order flow; filled orders get buy-again/sell buttons that
//! feed the place-order walk.

use anyhow::Result;

use crate::application::codec;
use crate::domain::commands::{Arg, Invocation, ListTradesArgs, PlaceOrderArgs, UpdateOrderArgs};
use crate::domain::traits::{
    Brokerage, BrokerageSession, CarouselColumn, ChatProvider, PostbackChoice, UserStore,
};
use crate::domain::types::{OrderAction, OrderStatus, SecurityType, Trade};
use crate::strings::messages;

pub async fn handle(
    chat: &dyn ChatProvider,
    store: &dyn UserStore,
    brokerage: &dyn Brokerage,
    user_id: &str,
    args: ListTradesArgs,
) -> Result<()> {
    let Some(user) = store.user(user_id)? else {
        chat.reply_text(messages::NOT_CONFIGURED)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    };

    let session = brokerage.open_session(&user).await?;
    let result = list_trades(session.as_ref(), chat, args).await;
    if let Err(err) = session.close().await {
        tracing::warn!("Failed to close brokerage session: {}", err);
    }
    result
}

async fn list_trades(
    session: &dyn BrokerageSession,
    chat: &dyn ChatProvider,
    args: ListTradesArgs,
) -> Result<()> {
    let trades = session.list_trades().await?;

    let mut columns = Vec::new();
    for trade in trades {
        if trade.order.security_type != SecurityType::Stock {
            tracing::warn!(
                "Skipping trade '{}' with unsupported security type {:?}",
                trade.order.id,
                trade.order.security_type
            );
            continue;
        }
        if !trade.order.order_lot.is_placeable() {
            tracing::warn!(
                "Skipping trade '{}' with unsupported order lot {:?}",
                trade.order.id,
                trade.order.order_lot
            );
            continue;
        }
        if args.filled_only && trade.status.status != OrderStatus::Filled {
            continue;
        }

        let Some(contract) = session.contract(&trade.contract_code).await? else {
            anyhow::bail!("no contract for listed trade '{}'", trade.order.id);
        };
        columns.push(trade_column(&trade, &contract.name));
    }

    if columns.is_empty() {
        let text = if args.filled_only {
            messages::NO_FILLED_TRADES
        } else {
            messages::NO_TRADES
        };
        chat.reply_text(text).await.map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    }

    chat.reply_carousel(messages::TRADES_TITLE, columns)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

fn trade_column(trade: &Trade, name: &str) -> CarouselColumn {
    let time = trade.status.order_time.format("%Y-%m-%d %H:%M").to_string();
    CarouselColumn {
        text: messages::trade_column(
            &trade.order.id,
            &trade.contract_code,
            name,
            trade.status.status.label(),
            trade.effective_quantity(),
            trade.effective_price(),
            trade.order.action.label(),
            trade.order.order_lot.label(),
            &time,
        ),
        actions: trade_actions(trade),
    }
}

/// Filled orders can only be traded again; working orders can still be
/// reduced, deleted or repriced.
fn trade_actions(trade: &Trade) -> Vec<PostbackChoice> {
    if trade.status.status == OrderStatus::Filled {
        return [
            (messages::BUY_MORE_LABEL, OrderAction::Buy),
            (OrderAction::Sell.label(), OrderAction::Sell),
        ]
        .into_iter()
        .map(|(label, action)| {
            let args = PlaceOrderArgs {
                stock_id: Arg::Value(trade.contract_code.clone()),
                action: Arg::Value(action),
                ..Default::default()
            };
            PostbackChoice {
                label: label.to_string(),
                data: codec::encode(&Invocation::PlaceOrder(args)),
            }
        })
        .collect();
    }

    let reduce = UpdateOrderArgs {
        trade_id: Arg::Value(trade.order.id.clone()),
        update_quantity: true,
        ..Default::default()
    };
    let delete = UpdateOrderArgs {
        quantity: Arg::Value(0),
        ..reduce.clone()
    };
    let reprice = UpdateOrderArgs {
        trade_id: Arg::Value(trade.order.id.clone()),
        update_quantity: false,
        ..Default::default()
    };
    vec![
        PostbackChoice {
            label: messages::REDUCE_LABEL.to_string(),
            data: codec::encode(&Invocation::UpdateOrder(reduce)),
        },
        PostbackChoice {
            label: messages::DELETE_LABEL.to_string(),
            data: codec::encode(&Invocation::UpdateOrder(delete)),
        },
        PostbackChoice {
            label: messages::REPRICE_LABEL.to_string(),
            data: codec::encode(&Invocation::UpdateOrder(reprice)),
        },
    ]
}
