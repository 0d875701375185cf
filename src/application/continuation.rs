//! # Continuation Resolver
//!
//! When a free-text message arrives, the user may be mid-walk through a
//! multi-step command. The resolver atomically consumes any pending template
//! for the user and substitutes the message text into its placeholder,
//! producing the payload to dispatch. Consuming before dispatch means a
//! template is used at most once even if the resulting command fails.

use crate::application::codec;
use crate::domain::errors::StoreError;
use crate::domain::traits::UserStore;

#[derive(Debug, PartialEq)]
pub enum Resolution {
    /// A template was pending; the filled payload is ready to dispatch.
    Resolved(String),
    /// Nothing was pending for this user.
    NoPendingTemplate,
}

pub fn resolve(
    store: &dyn UserStore,
    user_id: &str,
    text: &str,
) -> Result<Resolution, StoreError> {
    match store.take_pending_template(user_id)? {
        Some(template) => Ok(Resolution::Resolved(codec::fill(&template, text))),
        None => Ok(Resolution::NoPendingTemplate),
    }
}
