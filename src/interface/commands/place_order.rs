//! # Place Order Command
//!
//! Handles `cmd=place_order`: the multi-step walk through lot, stock, price,
//! quantity and action, then a confirmation step and the final submission.
//! Each prompt stores a continuation template before replying, so the next
//! free-text message resolves into the same invocation with one more
//! parameter filled. Button prompts additionally carry fully encoded
//! payloads, letting taps skip the free-text round trip.

use anyhow::Result;

use crate::application::codec;
use crate::domain::commands::{Arg, Invocation, PlaceOrderArgs, PlaceOrderParam};
use crate::domain::traits::{
    Brokerage, BrokerageSession, ChatProvider, PostbackChoice, UserStore,
};
use crate::domain::types::{Contract, OrderAction, OrderLot};
use crate::strings::messages;

pub async fn handle(
    chat: &dyn ChatProvider,
    store: &dyn UserStore,
    brokerage: &dyn Brokerage,
    user_id: &str,
    args: PlaceOrderArgs,
) -> Result<()> {
    let Some(user) = store.user(user_id)? else {
        chat.reply_text(messages::NOT_CONFIGURED)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    };

    // The lot buttons only offer placeable kinds, but the payload is client
    // data and could name any of them.
    if let Some(lot) = args.order_lot.value() {
        if !lot.is_placeable() {
            chat.reply_text(messages::UNSUPPORTED_ORDER)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            return Ok(());
        }
    }

    // Steps that need nothing from the brokerage are answered without
    // opening a session.
    match args.next_missing() {
        Some(PlaceOrderParam::OrderLot) => {
            return prompt_order_lot(chat, store, user_id, &args).await
        }
        Some(PlaceOrderParam::StockId) => {
            return prompt_stock_id(chat, store, user_id, &args).await
        }
        Some(PlaceOrderParam::Action) => return prompt_action(chat, store, user_id, &args).await,
        None if !args.confirm => return prompt_confirm(chat, &args).await,
        _ => {}
    }

    let session = brokerage.open_session(&user).await?;
    let result = match args.next_missing() {
        Some(PlaceOrderParam::Price) => {
            prompt_price(session.as_ref(), chat, store, user_id, &args).await
        }
        Some(PlaceOrderParam::Quantity) => {
            prompt_quantity(session.as_ref(), chat, store, user_id, &args).await
        }
        _ => place(session.as_ref(), chat, &args).await,
    };
    if let Err(err) = session.close().await {
        tracing::warn!("Failed to close brokerage session: {}", err);
    }
    result
}

fn pending_payload(args: &PlaceOrderArgs, param: PlaceOrderParam) -> String {
    codec::encode(&Invocation::PlaceOrder(args.with_pending(param)))
}

async fn prompt_order_lot(
    chat: &dyn ChatProvider,
    store: &dyn UserStore,
    user_id: &str,
    args: &PlaceOrderArgs,
) -> Result<()> {
    store.set_pending_template(
        user_id,
        Some(&pending_payload(args, PlaceOrderParam::OrderLot)),
    )?;

    let actions = [OrderLot::Common, OrderLot::Odd, OrderLot::IntradayOdd]
        .into_iter()
        .map(|lot| {
            let mut choice = args.clone();
            choice.order_lot = Arg::Value(lot);
            PostbackChoice {
                label: lot.label().to_string(),
                data: codec::encode(&Invocation::PlaceOrder(choice)),
            }
        })
        .collect();
    chat.reply_buttons(messages::ASK_ORDER_LOT, messages::ASK_ORDER_LOT, actions)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

async fn prompt_stock_id(
    chat: &dyn ChatProvider,
    store: &dyn UserStore,
    user_id: &str,
    args: &PlaceOrderArgs,
) -> Result<()> {
    store.set_pending_template(
        user_id,
        Some(&pending_payload(args, PlaceOrderParam::StockId)),
    )?;
    chat.reply_text(messages::ASK_STOCK_ID)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

async fn prompt_price(
    session: &dyn BrokerageSession,
    chat: &dyn ChatProvider,
    store: &dyn UserStore,
    user_id: &str,
    args: &PlaceOrderArgs,
) -> Result<()> {
    let Some(contract) = fetch_contract(session, chat, args).await? else {
        return Ok(());
    };

    store.set_pending_template(user_id, Some(&pending_payload(args, PlaceOrderParam::Price)))?;
    chat.reply_text(&messages::ask_price(
        contract.reference,
        contract.limit_up,
        contract.limit_down,
    ))
    .await
    .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

async fn prompt_quantity(
    session: &dyn BrokerageSession,
    chat: &dyn ChatProvider,
    store: &dyn UserStore,
    user_id: &str,
    args: &PlaceOrderArgs,
) -> Result<()> {
    let Some(contract) = fetch_contract(session, chat, args).await? else {
        return Ok(());
    };
    let Some(lot) = args.order_lot.value() else {
        anyhow::bail!("order lot must precede the quantity step");
    };
    let Some(price) = args.price.value() else {
        anyhow::bail!("price must precede the quantity step");
    };

    let balance = session.account_balance().await?;
    let unit_shares = match lot {
        OrderLot::Common => contract.unit,
        _ => 1,
    };

    store.set_pending_template(
        user_id,
        Some(&pending_payload(args, PlaceOrderParam::Quantity)),
    )?;
    chat.reply_text(&messages::ask_quantity(
        lot.unit_label(),
        balance,
        max_affordable(balance, *price, unit_shares),
    ))
    .await
    .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

async fn prompt_action(
    chat: &dyn ChatProvider,
    store: &dyn UserStore,
    user_id: &str,
    args: &PlaceOrderArgs,
) -> Result<()> {
    store.set_pending_template(
        user_id,
        Some(&pending_payload(args, PlaceOrderParam::Action)),
    )?;

    let actions = [OrderAction::Buy, OrderAction::Sell].map(|action| {
        let mut choice = args.clone();
        choice.action = Arg::Value(action);
        PostbackChoice {
            label: action.label().to_string(),
            data: codec::encode(&Invocation::PlaceOrder(choice)),
        }
    });
    chat.reply_confirm(messages::ASK_ACTION, messages::ASK_ACTION, actions)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

/// Show the order summary with confirm/cancel buttons. No template is
/// stored: both outcomes arrive as postbacks, and a free-text reply here
/// simply goes unanswered.
async fn prompt_confirm(chat: &dyn ChatProvider, args: &PlaceOrderArgs) -> Result<()> {
    let (Some(stock_id), Some(price), Some(quantity), Some(action), Some(lot)) = (
        args.stock_id.value(),
        args.price.value(),
        args.quantity.value(),
        args.action.value(),
        args.order_lot.value(),
    ) else {
        anyhow::bail!("confirmation requires a completed walk");
    };

    let mut confirmed = args.clone();
    confirmed.confirm = true;

    chat.reply_confirm(
        messages::CONFIRM_ORDER,
        &messages::confirm_order(
            stock_id,
            *quantity,
            lot.unit_label(),
            *price,
            action.label(),
            lot.label(),
        ),
        [
            PostbackChoice {
                label: messages::CONFIRM_LABEL.to_string(),
                data: codec::encode(&Invocation::PlaceOrder(confirmed)),
            },
            PostbackChoice {
                label: messages::CANCEL_LABEL.to_string(),
                data: codec::encode(&Invocation::Cancel),
            },
        ],
    )
    .await
    .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

async fn place(
    session: &dyn BrokerageSession,
    chat: &dyn ChatProvider,
    args: &PlaceOrderArgs,
) -> Result<()> {
    let Some(contract) = fetch_contract(session, chat, args).await? else {
        return Ok(());
    };
    let (Some(price), Some(quantity), Some(action), Some(lot)) = (
        args.price.value(),
        args.quantity.value(),
        args.action.value(),
        args.order_lot.value(),
    ) else {
        anyhow::bail!("submission requires a completed walk");
    };

    let trade = session
        .place_order(&contract, *price, *quantity, *action, *lot)
        .await?;

    chat.reply_text(&messages::order_placed(
        &contract.code,
        *quantity,
        lot.unit_label(),
        *price,
        action.label(),
        lot.label(),
        &trade.order.id,
        trade.status.status.label(),
    ))
    .await
    .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

/// Look up the contract for the walk's stock id, replying directly when the
/// code is unknown. The walk ends there; no template is stored for a failed
/// lookup.
async fn fetch_contract(
    session: &dyn BrokerageSession,
    chat: &dyn ChatProvider,
    args: &PlaceOrderArgs,
) -> Result<Option<Contract>> {
    let Some(stock_id) = args.stock_id.value() else {
        anyhow::bail!("stock id must precede the price step");
    };
    match session.contract(stock_id).await? {
        Some(contract) => Ok(Some(contract)),
        None => {
            chat.reply_text(&messages::stock_not_found(stock_id))
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            Ok(None)
        }
    }
}

/// Whole units the balance can pay for at the given price. Board lots cost
/// `unit` shares each; odd lots are priced per share.
fn max_affordable(balance: i64, price: f64, unit_shares: u32) -> u64 {
    let cost = price * f64::from(unit_shares);
    if cost <= 0.0 {
        return 0;
    }
    let units = balance as f64 / cost;
    if units <= 0.0 {
        0
    } else {
        units.floor() as u64
    }
}
