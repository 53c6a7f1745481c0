//! `/start` flow shared by every user.

use crate::{
    broadcast::menu,
    directory::{UserDirectory, ACTIVITY_START},
    domain::{ChatId, UserId, UserProfile},
    messaging::port::MessagingPort,
    Result,
};

/// Register the user, then send the welcome text and the peer-picker keyboard.
///
/// Directory failures are logged and never block the greeting.
pub async fn greet(
    directory: &dyn UserDirectory,
    messenger: &dyn MessagingPort,
    chat: ChatId,
    profile: &UserProfile,
) -> Result<()> {
    let user_id = UserId(profile.user_id);
    if let Err(e) = directory.upsert_user(profile).await {
        tracing::error!(user_id = user_id.0, error = %e, "failed to register user");
    } else if let Err(e) = directory.record_interaction(user_id, ACTIVITY_START).await {
        tracing::error!(user_id = user_id.0, error = %e, "failed to record /start");
    }

    messenger
        .send_inline_keyboard(chat, menu::WELCOME_MESSAGE, menu::welcome_links())
        .await?;
    messenger
        .send_reply_keyboard(chat, menu::CHOOSE_OPTION, menu::peer_picker_keyboard())
        .await?;
    Ok(())
}
