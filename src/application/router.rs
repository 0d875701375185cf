//! # Command Router
//!
//! Routes incoming chat events to the appropriate command handler (in
//! `interface/commands`). Free-text messages first go through the
//! continuation resolver; postback payloads and `cmd=` prefixed text are
//! decoded directly. Every dispatch sends exactly one reply, so handler
//! failures are caught here and answered with a generic error message.

use std::sync::Arc;

use crate::application::codec;
use crate::application::continuation::{self, Resolution};
use crate::domain::commands::Invocation;
use crate::domain::errors::CodecError;
use crate::domain::traits::{Brokerage, ChatProvider, UserStore};
use crate::interface::commands;
use crate::strings::messages;

pub struct CommandRouter {
    store: Arc<dyn UserStore>,
    brokerage: Arc<dyn Brokerage>,
}

impl CommandRouter {
    pub fn new(store: Arc<dyn UserStore>, brokerage: Arc<dyn Brokerage>) -> Self {
        Self { store, brokerage }
    }

    /// Handle a free-text message. If the user has a pending template the
    /// text is substituted into it and the result dispatched; otherwise only
    /// `cmd=` prefixed text is treated as a manually typed command.
    pub async fn route_text(&self, chat: &dyn ChatProvider, user_id: &str, text: &str) {
        match continuation::resolve(self.store.as_ref(), user_id, text) {
            Ok(Resolution::Resolved(payload)) => self.dispatch(chat, user_id, &payload).await,
            Ok(Resolution::NoPendingTemplate) => {
                if text.starts_with("cmd=") {
                    self.dispatch(chat, user_id, text).await;
                } else {
                    tracing::debug!("Ignoring free text from user='{}'", user_id);
                }
            }
            Err(err) => {
                tracing::error!("Failed to resolve continuation for user='{}': {}", user_id, err);
                let _ = chat.reply_text(messages::UNEXPECTED_ERROR).await;
            }
        }
    }

    /// Handle a postback payload from a button or rich menu tap.
    pub async fn route_postback(&self, chat: &dyn ChatProvider, user_id: &str, data: &str) {
        self.dispatch(chat, user_id, data).await;
    }

    async fn dispatch(&self, chat: &dyn ChatProvider, user_id: &str, payload: &str) {
        let invocation = match codec::decode(payload) {
            Ok(invocation) => invocation,
            Err(CodecError::BadValue { param, value }) => {
                tracing::warn!(
                    "Rejected payload from user='{}': bad value '{}' for '{}'",
                    user_id,
                    value,
                    param
                );
                let _ = chat.reply_text(&messages::invalid_input(&value)).await;
                return;
            }
            Err(err) => {
                tracing::warn!("Undecodable payload from user='{}': {}", user_id, err);
                return;
            }
        };

        tracing::info!("Dispatching cmd='{}' for user='{}'", invocation.name(), user_id);

        let store = self.store.as_ref();
        let brokerage = self.brokerage.as_ref();
        let result = match invocation {
            Invocation::PlaceOrder(args) => {
                commands::place_order::handle(chat, store, brokerage, user_id, args).await
            }
            Invocation::UpdateOrder(args) => {
                commands::update_order::handle(chat, store, brokerage, user_id, args).await
            }
            Invocation::ListTrades(args) => {
                commands::list_trades::handle(chat, store, brokerage, user_id, args).await
            }
            Invocation::Stock => commands::stock::handle(chat, store, brokerage, user_id).await,
            Invocation::Balance => commands::balance::handle(chat, store, brokerage, user_id).await,
            Invocation::Cancel => commands::cancel::handle(chat, store, user_id).await,
        };

        if let Err(err) = result {
            tracing::error!("Command failed for user='{}': {:#}", user_id, err);
            let _ = chat.reply_text(messages::UNEXPECTED_ERROR).await;
        }
    }
}
