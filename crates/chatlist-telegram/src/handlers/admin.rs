use std::sync::Arc;

use teloxide::prelude::*;

use chatlist_core::{
    broadcast::{menu, Handled},
    domain::ChatId,
    errors::Error,
};

use crate::{convert, router::AppState};

/// `/panel`.
pub async fn handle_panel(_bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let admin = convert::user_id(user);
    let chat_id = ChatId(msg.chat.id.0);

    if let Err(e) = state.console.open_panel(admin, chat_id).await {
        reply_error(&state, chat_id, &e).await;
    }
    Ok(())
}

/// Panel labels and broadcast payloads. Non-admin traffic is ignored.
pub async fn handle_admin_message(
    _bot: Bot,
    msg: Message,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let Some(inbound) = convert::inbound(&msg) else {
        return Ok(());
    };
    if !state.console.is_admin(inbound.sender) {
        return Ok(());
    }
    let chat_id = ChatId(msg.chat.id.0);

    match state.console.handle_message(chat_id, &inbound).await {
        Ok(Handled::Consumed) => {}
        Ok(Handled::Ignored) => {
            tracing::debug!(chat_id = chat_id.0, "admin message not consumed by the console");
        }
        Err(e) => reply_error(&state, chat_id, &e).await,
    }
    Ok(())
}

pub(crate) async fn reply_error(state: &AppState, chat_id: ChatId, err: &Error) {
    match err {
        Error::Authorization | Error::InvalidBroadcast(_) | Error::StateLost => {
            tracing::info!(chat_id = chat_id.0, error = %err, "admin request rejected");
        }
        _ => tracing::error!(chat_id = chat_id.0, error = %err, "admin request failed"),
    }
    if let Err(e) = state
        .messenger
        .send_text(chat_id, &menu::error_reply(err))
        .await
    {
        tracing::warn!(chat_id = chat_id.0, error = %e, "failed to send error reply");
    }
}
