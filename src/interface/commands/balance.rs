//! # Balance Command
//!
//! Handles `cmd=balance`: replies with the account's bank balance.

use anyhow::Result;

use crate::domain::traits::{Brokerage, ChatProvider, UserStore};
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
    let result = match session.account_balance().await {
        Ok(amount) => chat
            .reply_text(&messages::balance(amount))
            .await
            .map_err(|e| anyhow::anyhow!(e)),
        Err(err) => Err(anyhow::anyhow!(err)),
    };
    if let Err(err) = session.close().await {
        tracing::warn!("Failed to close brokerage session: {}", err);
    }
    result
}
