//! # Strings Module
//!
//! Centralizes user-facing strings and reply templates.
//! Ensures consistency in messaging and easier localization/updates.

pub mod messages;
