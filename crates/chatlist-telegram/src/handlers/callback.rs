use std::sync::Arc;

use teloxide::prelude::*;

use chatlist_core::{
    broadcast::{
        menu,
        planner::{parse_callback, ConfirmationAction},
    },
    domain::ChatId,
    errors::Error,
};

use crate::{convert, handlers::admin::reply_error, router::AppState};

pub async fn handle_callback(
    _bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let cb_id = q.id.clone();
    let admin = convert::user_id(&q.from);
    let Some(chat_id) = q.message.as_ref().map(|m| ChatId(m.chat.id.0)) else {
        answer(&state, &cb_id, None, false).await;
        return Ok(());
    };

    // Parse callback data: broadcast:{confirm|cancel}:{snapshot_id}
    let Some((action, snapshot_id)) = q.data.as_deref().and_then(parse_callback) else {
        answer(&state, &cb_id, None, false).await;
        return Ok(());
    };

    if !state.console.is_admin(admin) {
        answer(&state, &cb_id, Some(menu::NO_ADMIN_ACCESS_ALERT), true).await;
        return Ok(());
    }

    match action {
        ConfirmationAction::Cancel => {
            let prompt = q.message.as_ref().map(convert::message_ref);
            match state.console.cancel(admin, chat_id, snapshot_id, prompt).await {
                Ok(()) => answer(&state, &cb_id, None, false).await,
                Err(e) => answer_error(&state, &cb_id, chat_id, &e).await,
            }
        }
        ConfirmationAction::Confirm => {
            // The run can outlast the callback's answer window; acknowledge first
            // unless the session is already gone.
            if !state.console.sessions().contains(admin).await {
                if let Err(e) = state.console.confirm(admin, chat_id, snapshot_id).await {
                    answer_error(&state, &cb_id, chat_id, &e).await;
                }
                return Ok(());
            }
            answer(&state, &cb_id, None, false).await;
            match state.console.confirm(admin, chat_id, snapshot_id).await {
                Ok(outcome) => {
                    tracing::info!(
                        admin_id = admin.0,
                        snapshot_id,
                        delivered = outcome.tally.successful_sends,
                        failed = outcome.tally.failed(),
                        recorded = outcome.recorded,
                        "broadcast completed"
                    );
                }
                Err(e) => reply_error(&state, chat_id, &e).await,
            }
        }
    }

    Ok(())
}

async fn answer(state: &AppState, cb_id: &str, text: Option<&str>, alert: bool) {
    if let Err(e) = state
        .messenger
        .answer_callback_query(cb_id, text, alert)
        .await
    {
        tracing::warn!(error = %e, "failed to answer callback query");
    }
}

async fn answer_error(state: &AppState, cb_id: &str, chat_id: ChatId, err: &Error) {
    match err {
        Error::StateLost | Error::Authorization | Error::InvalidBroadcast(_) => {
            tracing::info!(chat_id = chat_id.0, error = %err, "broadcast callback rejected");
            answer(state, cb_id, Some(&menu::error_reply(err)), true).await;
        }
        _ => {
            answer(state, cb_id, None, false).await;
            reply_error(state, chat_id, err).await;
        }
    }
}
