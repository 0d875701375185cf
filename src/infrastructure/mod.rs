//! # Infrastructure Layer
//!
//! Handles interactions with external systems and services.
//! Implements the traits defined in the Domain layer (e.g., ChatProvider, UserStore, Brokerage).

pub mod brokerage;
pub mod line;
pub mod store;
pub mod webhook;
