//! Core domain + application logic for the chatlist bot.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind the
//! `MessagingPort` trait implemented in `chatlist-telegram`; persistence lives
//! behind the directory/ledger traits implemented by `store::SqliteStore`.

pub mod broadcast;
pub mod config;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod ledger;
pub mod logging;
pub mod messaging;
pub mod onboarding;
pub mod security;
pub mod store;
pub mod utils;

pub use errors::{Error, Result};
