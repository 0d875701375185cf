//! # Update Order Command
//!
//! Handles `cmd=update_order`: reduce a working order's quantity (zero
//! deletes it outright) or change its price. The `update_quantity` flag in
//! the payload picks which of the two the flow asks for, so the carousel's
//! 減量, 刪單 and 改價 buttons all funnel through here.

use anyhow::Result;

use crate::application::codec;
use crate::domain::commands::{Invocation, UpdateOrderArgs, UpdateOrderParam};
use crate::domain::traits::{Brokerage, BrokerageSession, ChatProvider, UserStore};
use crate::domain::types::{OrderLot, OrderUpdate, SecurityType, Trade};
use crate::strings::messages;

pub async fn handle(
    chat: &dyn ChatProvider,
    store: &dyn UserStore,
    brokerage: &dyn Brokerage,
    user_id: &str,
    args: UpdateOrderArgs,
) -> Result<()> {
    let Some(user) = store.user(user_id)? else {
        chat.reply_text(messages::NOT_CONFIGURED)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    };

    // The trade id prompt needs nothing from the brokerage.
    if args.next_missing() == Some(UpdateOrderParam::TradeId) {
        store.set_pending_template(
            user_id,
            Some(&pending_payload(&args, UpdateOrderParam::TradeId)),
        )?;
        chat.reply_text(messages::ASK_TRADE_ID)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    }

    let session = brokerage.open_session(&user).await?;
    let result = update(session.as_ref(), chat, store, user_id, &args).await;
    if let Err(err) = session.close().await {
        tracing::warn!("Failed to close brokerage session: {}", err);
    }
    result
}

fn pending_payload(args: &UpdateOrderArgs, param: UpdateOrderParam) -> String {
    codec::encode(&Invocation::UpdateOrder(args.with_pending(param)))
}

async fn update(
    session: &dyn BrokerageSession,
    chat: &dyn ChatProvider,
    store: &dyn UserStore,
    user_id: &str,
    args: &UpdateOrderArgs,
) -> Result<()> {
    let Some(trade_id) = args.trade_id.value() else {
        anyhow::bail!("trade id must precede the update steps");
    };
    let Some(trade) = session.trade(trade_id).await? else {
        chat.reply_text(&messages::trade_not_found(trade_id))
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    };

    if trade.order.security_type != SecurityType::Stock || !trade.order.order_lot.is_placeable() {
        chat.reply_text(messages::UNSUPPORTED_ORDER)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    }
    // Odd-lot orders trade at fixed windows; only round-lot orders can be
    // repriced.
    if !args.update_quantity && trade.order.order_lot != OrderLot::Common {
        chat.reply_text(messages::PRICE_CHANGE_NOT_ALLOWED)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    }

    match args.next_missing() {
        Some(UpdateOrderParam::Quantity) => {
            store.set_pending_template(
                user_id,
                Some(&pending_payload(args, UpdateOrderParam::Quantity)),
            )?;
            chat.reply_text(&messages::ask_new_quantity(
                trade.effective_quantity(),
                trade.order.order_lot.unit_label(),
            ))
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
            Ok(())
        }
        Some(UpdateOrderParam::Price) => {
            store.set_pending_template(
                user_id,
                Some(&pending_payload(args, UpdateOrderParam::Price)),
            )?;
            chat.reply_text(&messages::ask_new_price(trade.effective_price()))
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            Ok(())
        }
        _ => apply(session, chat, args, &trade).await,
    }
}

async fn apply(
    session: &dyn BrokerageSession,
    chat: &dyn ChatProvider,
    args: &UpdateOrderArgs,
    trade: &Trade,
) -> Result<()> {
    if args.update_quantity {
        let Some(quantity) = args.quantity.value().copied() else {
            anyhow::bail!("quantity must be present before applying an update");
        };

        if quantity == 0 {
            session.cancel_order(trade).await?;
            chat.reply_text(&messages::order_cancelled(&trade.order.id))
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            return Ok(());
        }

        // The gateway only shrinks orders; growing one means placing a new
        // order.
        let current = trade.effective_quantity();
        if quantity >= current {
            chat.reply_text(&messages::quantity_not_decreasing(current))
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            return Ok(());
        }

        session
            .update_order(trade, OrderUpdate::Quantity(quantity))
            .await?;
        chat.reply_text(&messages::order_quantity_updated(
            &trade.order.id,
            quantity,
            trade.order.order_lot.unit_label(),
        ))
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    } else {
        let Some(price) = args.price.value().copied() else {
            anyhow::bail!("price must be present before applying an update");
        };

        session.update_order(trade, OrderUpdate::Price(price)).await?;
        chat.reply_text(&messages::order_price_updated(&trade.order.id, price))
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::commands::Arg;
    use crate::domain::types::OrderStatus;
    use crate::testkit::{
        test_trade, BrokerageScript, MemoryUserStore, MockBrokerage, MockChat, Reply,
    };

    fn working_order(lot: OrderLot) -> Arc<BrokerageScript> {
        let mut script = BrokerageScript::default();
        script.trades = vec![test_trade("T1", "2330", OrderStatus::Submitted, lot, 3, 600.0)];
        Arc::new(script)
    }

    #[tokio::test]
    async fn test_trade_id_prompt_stores_template() {
        let store = MemoryUserStore::with_user("U1");
        let brokerage = MockBrokerage::new(working_order(OrderLot::Common));
        let chat = MockChat::default();

        let args = UpdateOrderArgs {
            update_quantity: true,
            ..Default::default()
        };
        handle(&chat, &store, &brokerage, "U1", args).await.unwrap();

        assert_eq!(
            store.pending_template("U1").unwrap().as_deref(),
            Some("cmd=update_order&trade_id={text}&update_quantity=True&quantity=None&price=None")
        );
        assert_eq!(
            chat.replies(),
            vec![Reply::Text("請輸入要修改的委託單編號".to_string())]
        );
    }

    #[tokio::test]
    async fn test_quantity_prompt_shows_current_quantity() {
        let store = MemoryUserStore::with_user("U1");
        let brokerage = MockBrokerage::new(working_order(OrderLot::Common));
        let chat = MockChat::default();

        let args = UpdateOrderArgs {
            trade_id: Arg::Value("T1".to_string()),
            update_quantity: true,
            ..Default::default()
        };
        handle(&chat, &store, &brokerage, "U1", args).await.unwrap();

        assert_eq!(
            chat.replies(),
            vec![Reply::Text(
                "請輸入新的數量\n\n目前數量: 3 張".to_string()
            )]
        );
        assert_eq!(
            store.pending_template("U1").unwrap().as_deref(),
            Some("cmd=update_order&trade_id=T1&update_quantity=True&quantity={text}&price=None")
        );
    }

    #[tokio::test]
    async fn test_zero_quantity_deletes_the_order() {
        let store = MemoryUserStore::with_user("U1");
        let script = working_order(OrderLot::Common);
        let brokerage = MockBrokerage::new(script.clone());
        let chat = MockChat::default();

        let args = UpdateOrderArgs {
            trade_id: Arg::Value("T1".to_string()),
            update_quantity: true,
            quantity: Arg::Value(0),
            ..Default::default()
        };
        handle(&chat, &store, &brokerage, "U1", args).await.unwrap();

        assert_eq!(*script.cancelled.lock().unwrap(), vec!["T1".to_string()]);
        assert_eq!(
            chat.replies(),
            vec![Reply::Text("✅ 已刪除委託單 T1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_quantity_must_strictly_decrease() {
        let store = MemoryUserStore::with_user("U1");
        let script = working_order(OrderLot::Common);
        let brokerage = MockBrokerage::new(script.clone());
        let chat = MockChat::default();

        let args = UpdateOrderArgs {
            trade_id: Arg::Value("T1".to_string()),
            update_quantity: true,
            quantity: Arg::Value(3),
            ..Default::default()
        };
        handle(&chat, &store, &brokerage, "U1", args).await.unwrap();

        assert!(script.updates.lock().unwrap().is_empty());
        assert_eq!(
            chat.replies(),
            vec![Reply::Text("新數量必須小於目前數量 3".to_string())]
        );
    }

    #[tokio::test]
    async fn test_reduced_quantity_is_applied() {
        let store = MemoryUserStore::with_user("U1");
        let script = working_order(OrderLot::Common);
        let brokerage = MockBrokerage::new(script.clone());
        let chat = MockChat::default();

        let args = UpdateOrderArgs {
            trade_id: Arg::Value("T1".to_string()),
            update_quantity: true,
            quantity: Arg::Value(1),
            ..Default::default()
        };
        handle(&chat, &store, &brokerage, "U1", args).await.unwrap();

        assert_eq!(
            *script.updates.lock().unwrap(),
            vec![("T1".to_string(), OrderUpdate::Quantity(1))]
        );
        assert_eq!(
            chat.replies(),
            vec![Reply::Text("✅ 已將委託單 T1 的數量改為 1 張".to_string())]
        );
    }

    #[tokio::test]
    async fn test_reprice_prompt_and_apply() {
        let store = MemoryUserStore::with_user("U1");
        let script = working_order(OrderLot::Common);
        let brokerage = MockBrokerage::new(script.clone());
        let chat = MockChat::default();

        let prompt_args = UpdateOrderArgs {
            trade_id: Arg::Value("T1".to_string()),
            update_quantity: false,
            ..Default::default()
        };
        handle(&chat, &store, &brokerage, "U1", prompt_args)
            .await
            .unwrap();
        assert_eq!(
            chat.replies(),
            vec![Reply::Text(
                "請輸入新的價格\n\n目前價格: NTD$600".to_string()
            )]
        );
        assert_eq!(
            store.pending_template("U1").unwrap().as_deref(),
            Some("cmd=update_order&trade_id=T1&update_quantity=False&quantity=None&price={text}")
        );

        let apply_args = UpdateOrderArgs {
            trade_id: Arg::Value("T1".to_string()),
            update_quantity: false,
            price: Arg::Value(598.0),
            ..Default::default()
        };
        handle(&chat, &store, &brokerage, "U1", apply_args)
            .await
            .unwrap();
        assert_eq!(
            *script.updates.lock().unwrap(),
            vec![("T1".to_string(), OrderUpdate::Price(598.0))]
        );
        assert_eq!(
            chat.replies().last(),
            Some(&Reply::Text(
                "✅ 已將委託單 T1 的價格改為 NTD$598".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_odd_lot_orders_cannot_be_repriced() {
        let store = MemoryUserStore::with_user("U1");
        let brokerage = MockBrokerage::new(working_order(OrderLot::IntradayOdd));
        let chat = MockChat::default();

        let args = UpdateOrderArgs {
            trade_id: Arg::Value("T1".to_string()),
            update_quantity: false,
            ..Default::default()
        };
        handle(&chat, &store, &brokerage, "U1", args).await.unwrap();

        assert_eq!(
            chat.replies(),
            vec![Reply::Text("零股委託無法改價".to_string())]
        );
        assert_eq!(store.pending_template("U1").unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_trade_id() {
        let store = MemoryUserStore::with_user("U1");
        let brokerage = MockBrokerage::new(working_order(OrderLot::Common));
        let chat = MockChat::default();

        let args = UpdateOrderArgs {
            trade_id: Arg::Value("T9".to_string()),
            update_quantity: true,
            quantity: Arg::Value(1),
            ..Default::default()
        };
        handle(&chat, &store, &brokerage, "U1", args).await.unwrap();

        assert_eq!(
            chat.replies(),
            vec![Reply::Text("找不到編號為 T9 的委託單".to_string())]
        );
    }

    #[tokio::test]
    async fn test_non_stock_trade_is_unsupported() {
        let store = MemoryUserStore::with_user("U1");
        let mut trade = test_trade("T1", "2330", OrderStatus::Submitted, OrderLot::Common, 3, 600.0);
        trade.order.security_type = SecurityType::Future;
        let mut script = BrokerageScript::default();
        script.trades = vec![trade];
        let brokerage = MockBrokerage::new(Arc::new(script));
        let chat = MockChat::default();

        let args = UpdateOrderArgs {
            trade_id: Arg::Value("T1".to_string()),
            update_quantity: true,
            quantity: Arg::Value(1),
            ..Default::default()
        };
        handle(&chat, &store, &brokerage, "U1", args).await.unwrap();

        assert_eq!(
            chat.replies(),
            vec![Reply::Text("不支援的委託單類型".to_string())]
        );
    }
}
