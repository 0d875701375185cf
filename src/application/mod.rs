//! # Application Layer
//!
//! Contains the core business logic and orchestration of the bot.
//! This includes the command codec, the continuation resolver and the router.

pub mod codec;
pub mod continuation;
pub mod router;
