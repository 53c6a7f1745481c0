use std::sync::Arc;

use teloxide::prelude::*;

use chatlist_core::{domain::ChatId, onboarding};

use crate::{convert, router::AppState};

pub async fn handle_start(_bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let chat_id = ChatId(msg.chat.id.0);
    let profile = convert::profile(user);

    if let Err(e) = onboarding::greet(
        state.directory.as_ref(),
        state.messenger.as_ref(),
        chat_id,
        &profile,
    )
    .await
    {
        tracing::warn!(chat_id = chat_id.0, error = %e, "failed to send welcome");
    }
    Ok(())
}
