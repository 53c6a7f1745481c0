//! Telegram adapter (teloxide).
//!
//! This crate implements the `chatlist-core` MessagingPort over Telegram Bot API
//! and hosts the update dispatcher.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode},
};

use std::time::Duration;
use tokio::time::sleep;

pub mod convert;
pub mod handlers;
pub mod router;

use chatlist_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{
            ButtonAction, InlineKeyboard, MediaKind, MediaRef, MessagingCapabilities, ReplyButton,
            ReplyKeyboard,
        },
    },
    Result,
};

/// Longest flood wait absorbed inside a single call. Longer waits surface as
/// `Error::RateLimited` so the caller can wait outside its own deadline.
pub const MAX_INLINE_FLOOD_WAIT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
    http: reqwest::Client,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self {
            bot,
            http: reqwest::Client::new(),
        }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn msg_ref(chat_id: ChatId, msg: &Message) -> MessageRef {
        MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        }
    }

    fn map_err(chat_id: ChatId, e: teloxide::RequestError) -> Error {
        Error::Delivery {
            recipient: chat_id.0,
            cause: format!("telegram error: {e}"),
        }
    }

    async fn with_retry<T, Fut>(&self, chat_id: ChatId, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d)
                        if attempts < MAX_RETRIES && d <= MAX_INLINE_FLOOD_WAIT =>
                    {
                        attempts += 1;
                        tracing::debug!(chat_id = chat_id.0, retry_after = ?d, "telegram flood wait");
                        sleep(d).await;
                        continue;
                    }
                    teloxide::RequestError::RetryAfter(d) => {
                        return Err(Error::RateLimited {
                            recipient: chat_id.0,
                            retry_after: d,
                        })
                    }
                    other => return Err(Self::map_err(chat_id, other)),
                },
            }
        }
    }

    /// `sendMessage` with a raw `reply_markup`, for keyboards the typed client
    /// cannot express (`request_chat` buttons).
    async fn send_raw_message(
        &self,
        chat_id: ChatId,
        body: &serde_json::Value,
    ) -> Result<MessageRef> {
        let url = self
            .bot
            .api_url()
            .join(&format!("bot{}/sendMessage", self.bot.token()))
            .map_err(|e| Error::Config(format!("bad bot api url: {e}")))?;

        let mut retried = false;
        loop {
            let reply: serde_json::Value = self
                .http
                .post(url.clone())
                .json(body)
                .send()
                .await
                .map_err(|e| Self::http_err(chat_id, e))?
                .json()
                .await
                .map_err(|e| Self::http_err(chat_id, e))?;

            match parse_send_reply(&reply) {
                ApiReply::Sent(id) => {
                    return Ok(MessageRef {
                        chat_id,
                        message_id: MessageId(id),
                    })
                }
                ApiReply::RetryAfter(d) if !retried && d <= MAX_INLINE_FLOOD_WAIT => {
                    retried = true;
                    tracing::debug!(chat_id = chat_id.0, retry_after = ?d, "telegram flood wait");
                    sleep(d).await;
                }
                ApiReply::RetryAfter(d) => {
                    return Err(Error::RateLimited {
                        recipient: chat_id.0,
                        retry_after: d,
                    })
                }
                ApiReply::Failed(description) => {
                    return Err(Error::Delivery {
                        recipient: chat_id.0,
                        cause: format!("telegram error: {description}"),
                    })
                }
            }
        }
    }

    fn http_err(chat_id: ChatId, e: reqwest::Error) -> Error {
        // The request url embeds the bot token.
        Error::Delivery {
            recipient: chat_id.0,
            cause: format!("telegram transport error: {}", e.without_url()),
        }
    }
}

/// Result of a raw Bot API call.
#[derive(Debug, PartialEq)]
enum ApiReply {
    Sent(i32),
    RetryAfter(Duration),
    Failed(String),
}

fn parse_send_reply(reply: &serde_json::Value) -> ApiReply {
    if reply["ok"].as_bool() == Some(true) {
        return match reply["result"]["message_id"].as_i64() {
            Some(id) => ApiReply::Sent(id as i32),
            None => ApiReply::Failed("response without message_id".to_string()),
        };
    }
    if let Some(secs) = reply["parameters"]["retry_after"].as_u64() {
        return ApiReply::RetryAfter(Duration::from_secs(secs));
    }
    ApiReply::Failed(
        reply["description"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string(),
    )
}

/// Inline keyboard markup; URL buttons with an unparsable target are dropped.
pub fn inline_markup(keyboard: InlineKeyboard) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = keyboard
        .rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .filter_map(|b| match b.action {
                    ButtonAction::Callback(data) => {
                        Some(InlineKeyboardButton::callback(b.label, data))
                    }
                    ButtonAction::Url(url) => match reqwest::Url::parse(&url) {
                        Ok(url) => Some(InlineKeyboardButton::url(b.label, url)),
                        Err(e) => {
                            tracing::warn!(%url, error = %e, "dropping inline button with bad url");
                            None
                        }
                    },
                })
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

/// Bot API `ReplyKeyboardMarkup` JSON, including `request_chat` buttons.
pub fn reply_markup_json(keyboard: &ReplyKeyboard) -> serde_json::Value {
    let rows: Vec<Vec<serde_json::Value>> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| match b {
                    ReplyButton::Text(label) => serde_json::json!({ "text": label }),
                    ReplyButton::RequestChat(req) => {
                        let mut request = serde_json::json!({
                            "request_id": req.request_id,
                            "chat_is_channel": req.channel,
                        });
                        if req.created_only {
                            request["chat_is_created"] = true.into();
                        }
                        if let Some(rights) = req.user_rights {
                            request["user_administrator_rights"] = serde_json::json!({
                                "is_anonymous": false,
                                "can_manage_chat": rights.can_manage_chat,
                                "can_delete_messages": false,
                                "can_manage_video_chats": false,
                                "can_restrict_members": rights.can_restrict_members,
                                "can_promote_members": false,
                                "can_change_info": false,
                                "can_invite_users": false,
                            });
                        }
                        serde_json::json!({ "text": req.label, "request_chat": request })
                    }
                })
                .collect()
        })
        .collect();

    serde_json::json!({
        "keyboard": rows,
        "resize_keyboard": true,
        "is_persistent": keyboard.persistent,
    })
}

/// `sendMessage` request body carrying an HTML text and a reply keyboard.
pub fn reply_keyboard_request(
    chat_id: ChatId,
    html: &str,
    keyboard: &ReplyKeyboard,
) -> serde_json::Value {
    serde_json::json!({
        "chat_id": chat_id.0,
        "text": html,
        "parse_mode": "HTML",
        "reply_markup": reply_markup_json(keyboard),
    })
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_html: true,
            supports_edit: true,
            supports_forward: true,
            max_message_len: 4096,
        }
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(chat_id, || {
                self.bot.send_message(Self::tg_chat(chat_id), text.to_string())
            })
            .await?;
        Ok(Self::msg_ref(chat_id, &msg))
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(chat_id, || {
                self.bot
                    .send_message(Self::tg_chat(chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
            })
            .await?;
        Ok(Self::msg_ref(chat_id, &msg))
    }

    async fn send_with_attachment(
        &self,
        chat_id: ChatId,
        caption: &str,
        media: &MediaRef,
    ) -> Result<MessageRef> {
        let chat = Self::tg_chat(chat_id);
        let file = || InputFile::file_id(media.file_id.clone());
        let caption = caption.to_string();

        let msg = match media.kind {
            MediaKind::Photo => {
                self.with_retry(chat_id, || {
                    self.bot.send_photo(chat, file()).caption(caption.clone())
                })
                .await?
            }
            MediaKind::Video => {
                self.with_retry(chat_id, || {
                    self.bot.send_video(chat, file()).caption(caption.clone())
                })
                .await?
            }
            MediaKind::Animation => {
                self.with_retry(chat_id, || {
                    self.bot.send_animation(chat, file()).caption(caption.clone())
                })
                .await?
            }
            MediaKind::Document => {
                self.with_retry(chat_id, || {
                    self.bot.send_document(chat, file()).caption(caption.clone())
                })
                .await?
            }
            MediaKind::Audio => {
                self.with_retry(chat_id, || {
                    self.bot.send_audio(chat, file()).caption(caption.clone())
                })
                .await?
            }
            MediaKind::Voice => {
                self.with_retry(chat_id, || {
                    self.bot.send_voice(chat, file()).caption(caption.clone())
                })
                .await?
            }
        };
        Ok(Self::msg_ref(chat_id, &msg))
    }

    async fn forward(&self, chat_id: ChatId, source: MessageRef) -> Result<MessageRef> {
        let msg = self
            .with_retry(chat_id, || {
                self.bot.forward_message(
                    Self::tg_chat(chat_id),
                    Self::tg_chat(source.chat_id),
                    Self::tg_msg_id(source.message_id),
                )
            })
            .await?;
        Ok(Self::msg_ref(chat_id, &msg))
    }

    async fn edit_text(&self, msg: MessageRef, text: &str) -> Result<()> {
        self.with_retry(msg.chat_id, || {
            self.bot.edit_message_text(
                Self::tg_chat(msg.chat_id),
                Self::tg_msg_id(msg.message_id),
                text.to_string(),
            )
        })
        .await?;
        Ok(())
    }

    async fn send_reply_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: ReplyKeyboard,
    ) -> Result<MessageRef> {
        let body = reply_keyboard_request(chat_id, html, &keyboard);
        self.send_raw_message(chat_id, &body).await
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        let markup = inline_markup(keyboard);
        let msg = self
            .with_retry(chat_id, || {
                self.bot
                    .send_message(Self::tg_chat(chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
                    .reply_markup(markup.clone())
            })
            .await?;
        Ok(Self::msg_ref(chat_id, &msg))
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> Result<MessageRef> {
        let file = InputFile::memory(bytes).file_name(file_name.to_string());
        let msg = self
            .with_retry(chat_id, || {
                self.bot
                    .send_document(Self::tg_chat(chat_id), file.clone())
                    .caption(caption.to_string())
            })
            .await?;
        Ok(Self::msg_ref(chat_id, &msg))
    }

    async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<()> {
        let mut req = self
            .bot
            .answer_callback_query(callback_id.to_string())
            .show_alert(show_alert);
        if let Some(t) = text {
            req = req.text(t.to_string());
        }
        req.await
            .map_err(|e| Error::External(format!("telegram error: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatlist_core::broadcast::menu;
    use chatlist_core::messaging::types::InlineButton;

    #[test]
    fn peer_picker_json_carries_chat_requests() {
        let json = reply_markup_json(&menu::peer_picker_keyboard());
        assert_eq!(json["is_persistent"], true);

        let first = &json["keyboard"][0][0];
        assert_eq!(first["text"], "Channels I administer");
        assert_eq!(first["request_chat"]["request_id"], 345);
        assert_eq!(first["request_chat"]["chat_is_channel"], true);
        assert_eq!(
            first["request_chat"]["user_administrator_rights"]["can_restrict_members"],
            true
        );

        let own_groups = &json["keyboard"][3][0];
        assert_eq!(own_groups["request_chat"]["request_id"], 234);
        assert_eq!(own_groups["request_chat"]["chat_is_created"], true);
        assert!(own_groups["request_chat"]
            .get("user_administrator_rights")
            .is_none());
    }

    #[test]
    fn peer_picker_request_sends_request_chat_buttons() {
        let body = reply_keyboard_request(ChatId(5), "Choose", &menu::peer_picker_keyboard());
        assert_eq!(body["chat_id"], 5);
        assert_eq!(body["parse_mode"], "HTML");

        let request_ids: Vec<i64> = body["reply_markup"]["keyboard"]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row[0]["request_chat"]["request_id"].as_i64().unwrap())
            .collect();
        assert_eq!(request_ids, vec![345, 456, 123, 234]);
        assert_eq!(
            body["reply_markup"]["keyboard"][1][0]["request_chat"]["chat_is_channel"],
            false
        );
    }

    #[test]
    fn send_replies_map_to_message_ids_and_flood_waits() {
        let ok = serde_json::json!({ "ok": true, "result": { "message_id": 42, "date": 0 } });
        assert_eq!(parse_send_reply(&ok), ApiReply::Sent(42));

        let flood = serde_json::json!({
            "ok": false,
            "error_code": 429,
            "description": "Too Many Requests: retry after 30",
            "parameters": { "retry_after": 30 }
        });
        assert_eq!(
            parse_send_reply(&flood),
            ApiReply::RetryAfter(Duration::from_secs(30))
        );

        let blocked = serde_json::json!({
            "ok": false,
            "error_code": 403,
            "description": "Forbidden: bot was blocked by the user"
        });
        assert_eq!(
            parse_send_reply(&blocked),
            ApiReply::Failed("Forbidden: bot was blocked by the user".to_string())
        );
    }

    #[test]
    fn text_keyboards_serialize_as_plain_buttons() {
        let json = reply_markup_json(&menu::panel_keyboard());
        assert_eq!(json["keyboard"][0][0], serde_json::json!({ "text": menu::LABEL_STATS }));
        assert_eq!(json["keyboard"][2][0]["text"], menu::LABEL_EXIT_PANEL);
        assert_eq!(json["is_persistent"], false);
    }

    #[test]
    fn inline_markup_keeps_rows_and_drops_bad_urls() {
        let kb = InlineKeyboard::new(vec![
            vec![InlineButton::callback("yes", "broadcast:confirm:1")],
            vec![
                InlineButton::url("ok", "https://t.me/example"),
                InlineButton::url("bad", "not a url"),
            ],
        ]);
        let markup = inline_markup(kb);
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[1].len(), 1);
        assert_eq!(markup.inline_keyboard[1][0].text, "ok");
    }
}
