//! # Cancel Command
//!
//! Handles `cmd=cancel`: abandons whatever multi-step command is in
//! progress. Clearing an already-empty template is harmless, so no user or
//! template existence check is needed.

use anyhow::Result;

use crate::domain::traits::{ChatProvider, UserStore};
use crate::strings::messages;

pub async fn handle(chat: &dyn ChatProvider, store: &dyn UserStore, user_id: &str) -> Result<()> {
    store.set_pending_template(user_id, None)?;
    chat.reply_text(messages::CANCELLED)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(())
}
