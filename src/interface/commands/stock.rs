//! # Stock Command
//!
//! Handles `cmd=stock`: shows the user's open positions as a carousel. Each
//! card carries buy/sell buttons whose payloads drop straight into the
//! place-order walk with the stock and action already filled in.

use anyhow::Result;

use crate::application::codec;
use crate::domain::commands::{Arg, Invocation, PlaceOrderArgs};
use crate::domain::traits::{
    Brokerage, BrokerageSession, CarouselColumn, ChatProvider, PostbackChoice, UserStore,
};
use crate::domain::types::{OrderAction, Position};
use crate::strings::messages;

pub async fn handle(
    chat: &dyn ChatProvider,
    store: &dyn UserStore,
    brokerage: &dyn Brokerage,
    user_id: &str,
) -> Result<()> {
    let Some(user) = store.user(user_id)? else {
        chat.reply_text(messages::NOT_CONFIGURED)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    };

    let session = brokerage.open_session(&user).await?;
    let result = list_positions(session.as_ref(), chat).await;
    if let Err(err) = session.close().await {
        tracing::warn!("Failed to close brokerage session: {}", err);
    }
    result
}

async fn list_positions(session: &dyn BrokerageSession, chat: &dyn ChatProvider) -> Result<()> {
    let positions = session.list_positions().await?;

    let mut columns = Vec::new();
    for position in positions {
        // Delisted or otherwise unknown codes have no contract to price
        // against; leave them off the carousel.
        let Some(contract) = session.contract(&position.code).await? else {
            continue;
        };
        columns.push(position_column(&position, &contract.name));
    }

    if columns.is_empty() {
        chat.reply_text(messages::NO_POSITIONS)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    }

    chat.reply_carousel(messages::POSITIONS_TITLE, columns)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}

fn position_column(position: &Position, name: &str) -> CarouselColumn {
    let actions = [OrderAction::Buy, OrderAction::Sell]
        .into_iter()
        .map(|action| {
            let args = PlaceOrderArgs {
                stock_id: Arg::Value(position.code.clone()),
                action: Arg::Value(action),
                ..Default::default()
            };
            PostbackChoice {
                label: action.label().to_string(),
                data: codec::encode(&Invocation::PlaceOrder(args)),
            }
        })
        .collect();

    CarouselColumn {
        text: messages::position_column(
            &position.code,
            name,
            position.quantity,
            position.price,
            position.last_price,
            position.pnl,
        ),
        actions,
    }
}
