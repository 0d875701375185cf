//! # Interface Layer
//!
//! User-facing command handlers. Everything here talks to the user through
//! the `ChatProvider` trait and never touches the LINE wire format directly.

pub mod commands;
