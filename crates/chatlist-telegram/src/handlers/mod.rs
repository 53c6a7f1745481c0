//! Telegram update handlers.
//!
//! Each handler is a small adapter that:
//! - converts the teloxide update into core types
//! - calls into `chatlist-core` (onboarding or the admin console)
//! - turns every failure into a reply or a log line

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message},
};

use crate::{convert, router::AppState};

mod admin;
mod callback;
mod start;

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    callback::handle_callback(bot, q, state).await
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    // Onboarding and the admin console only run in private chats.
    if convert::private_sender(&msg).is_none() {
        return Ok(());
    }

    if let Some(text) = msg.text() {
        if text.starts_with('/') {
            let (cmd, _args) = parse_command(text);
            match cmd.as_str() {
                "start" => return start::handle_start(bot, msg, state).await,
                "panel" => return admin::handle_panel(bot, msg, state).await,
                _ => {}
            }
        }
    }

    admin::handle_admin_message(bot, msg, state).await
}

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}
