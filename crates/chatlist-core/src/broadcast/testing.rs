//! In-memory fakes shared by the broadcast tests.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    directory::{ActivityReport, ActivityReports, UserDirectory, UserStats},
    domain::{ChatId, MessageId, MessageRef, UserId, UserProfile},
    errors::Error,
    ledger::{BroadcastLedger, BroadcastRecord},
    messaging::{
        port::MessagingPort,
        types::{InboundMessage, InlineKeyboard, MediaRef, MessagingCapabilities, ReplyKeyboard},
    },
    Result,
};

/// Chat the fakes treat as the operating admin's; never a broadcast recipient.
pub const ADMIN_CHAT: ChatId = ChatId(100);

pub fn inbound(sender: i64, text: Option<&str>) -> InboundMessage {
    InboundMessage {
        sender: UserId(sender),
        source: MessageRef {
            chat_id: ChatId(sender),
            message_id: MessageId(500),
        },
        text: text.map(|s| s.to_string()),
        media: None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SentKind {
    Text(String),
    Html(String),
    Attachment(String, MediaRef),
    Forward(MessageRef),
    ReplyKeyboard(String, ReplyKeyboard),
    InlineKeyboard(String, InlineKeyboard),
    Document(String, Vec<u8>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sent {
    pub chat_id: ChatId,
    pub kind: SentKind,
}

#[derive(Default)]
pub struct FakeMessenger {
    next_id: Mutex<i32>,
    sent: Mutex<Vec<Sent>>,
    edits: Mutex<Vec<String>>,
    callback_answers: Mutex<Vec<(String, Option<String>, bool)>>,
    failing: Mutex<HashSet<i64>>,
    hanging: Mutex<HashSet<i64>>,
    rate_limited: Mutex<HashMap<i64, Duration>>,
    fail_edits: Mutex<bool>,
}

impl FakeMessenger {
    pub fn fail_for(&self, chats: &[i64]) {
        self.failing.lock().unwrap().extend(chats.iter().copied());
    }

    pub fn hang_for(&self, chats: &[i64]) {
        self.hanging.lock().unwrap().extend(chats.iter().copied());
    }

    /// The next send to each chat is refused with a flood wait.
    pub fn rate_limit_once(&self, chats: &[i64], retry_after: Duration) {
        let mut guard = self.rate_limited.lock().unwrap();
        for &chat in chats {
            guard.insert(chat, retry_after);
        }
    }

    pub fn fail_edits(&self) {
        *self.fail_edits.lock().unwrap() = true;
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, chat_id: ChatId) -> Vec<SentKind> {
        self.sent()
            .into_iter()
            .filter(|s| s.chat_id == chat_id)
            .map(|s| s.kind)
            .collect()
    }

    pub fn texts_to(&self, chat_id: ChatId) -> Vec<String> {
        self.sent_to(chat_id)
            .into_iter()
            .filter_map(|k| match k {
                SentKind::Text(t) | SentKind::Html(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    /// Broadcast-shaped sends (forward, copy text, copy attachment) to anyone
    /// but the admin.
    pub fn deliveries(&self) -> Vec<Sent> {
        self.sent()
            .into_iter()
            .filter(|s| s.chat_id != ADMIN_CHAT)
            .filter(|s| {
                matches!(
                    s.kind,
                    SentKind::Forward(_) | SentKind::Attachment(..) | SentKind::Text(_)
                )
            })
            .collect()
    }

    pub fn delivery_targets(&self) -> Vec<UserId> {
        self.deliveries()
            .into_iter()
            .map(|s| UserId(s.chat_id.0))
            .collect()
    }

    pub fn edits(&self) -> Vec<String> {
        self.edits.lock().unwrap().clone()
    }

    pub fn callback_answers(&self) -> Vec<(String, Option<String>, bool)> {
        self.callback_answers.lock().unwrap().clone()
    }

    fn alloc(&self, chat_id: ChatId) -> MessageRef {
        let mut guard = self.next_id.lock().unwrap();
        *guard += 1;
        MessageRef {
            chat_id,
            message_id: MessageId(*guard),
        }
    }

    async fn record(&self, chat_id: ChatId, kind: SentKind) -> Result<MessageRef> {
        self.sent.lock().unwrap().push(Sent { chat_id, kind });
        let hang = self.hanging.lock().unwrap().contains(&chat_id.0);
        if hang {
            std::future::pending::<()>().await;
        }
        let flood_wait = self.rate_limited.lock().unwrap().remove(&chat_id.0);
        if let Some(retry_after) = flood_wait {
            return Err(Error::RateLimited {
                recipient: chat_id.0,
                retry_after,
            });
        }
        let fail = self.failing.lock().unwrap().contains(&chat_id.0);
        if fail {
            return Err(Error::Delivery {
                recipient: chat_id.0,
                cause: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        Ok(self.alloc(chat_id))
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_html: true,
            supports_edit: true,
            supports_forward: true,
            max_message_len: 4096,
        }
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        self.record(chat_id, SentKind::Text(text.to_string())).await
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        self.record(chat_id, SentKind::Html(html.to_string())).await
    }

    async fn send_with_attachment(
        &self,
        chat_id: ChatId,
        caption: &str,
        media: &MediaRef,
    ) -> Result<MessageRef> {
        self.record(
            chat_id,
            SentKind::Attachment(caption.to_string(), media.clone()),
        )
        .await
    }

    async fn forward(&self, chat_id: ChatId, source: MessageRef) -> Result<MessageRef> {
        self.record(chat_id, SentKind::Forward(source)).await
    }

    async fn edit_text(&self, msg: MessageRef, text: &str) -> Result<()> {
        let fail = *self.fail_edits.lock().unwrap();
        if fail {
            return Err(Error::Delivery {
                recipient: msg.chat_id.0,
                cause: "message to edit not found".to_string(),
            });
        }
        self.edits.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn send_reply_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: ReplyKeyboard,
    ) -> Result<MessageRef> {
        self.record(chat_id, SentKind::ReplyKeyboard(html.to_string(), keyboard))
            .await
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        html: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        self.record(chat_id, SentKind::InlineKeyboard(html.to_string(), keyboard))
            .await
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        file_name: &str,
        bytes: Vec<u8>,
        _caption: &str,
    ) -> Result<MessageRef> {
        self.record(chat_id, SentKind::Document(file_name.to_string(), bytes))
            .await
    }

    async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<()> {
        self.callback_answers.lock().unwrap().push((
            callback_id.to_string(),
            text.map(|s| s.to_string()),
            show_alert,
        ));
        Ok(())
    }
}

/// Directory + ledger + reports backed by plain vectors.
#[derive(Default)]
pub struct FakeStore {
    pub recipients: Mutex<Vec<UserId>>,
    pub records: Mutex<Vec<BroadcastRecord>>,
    pub interactions: Mutex<Vec<(UserId, String)>>,
    pub ledger_failures: Mutex<u32>,
}

impl FakeStore {
    pub fn with_recipients(ids: &[i64]) -> Self {
        let store = Self::default();
        store.set_recipients(ids);
        store
    }

    pub fn set_recipients(&self, ids: &[i64]) {
        *self.recipients.lock().unwrap() = ids.iter().copied().map(UserId).collect();
    }

    pub fn records(&self) -> Vec<BroadcastRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl UserDirectory for FakeStore {
    async fn upsert_user(&self, profile: &UserProfile) -> Result<()> {
        let mut r = self.recipients.lock().unwrap();
        let id = UserId(profile.user_id);
        if !r.contains(&id) {
            r.push(id);
        }
        Ok(())
    }

    async fn record_interaction(&self, user_id: UserId, activity_type: &str) -> Result<()> {
        self.interactions
            .lock()
            .unwrap()
            .push((user_id, activity_type.to_string()));
        Ok(())
    }

    async fn list_active_recipients(&self) -> Result<Vec<UserId>> {
        Ok(self.recipients.lock().unwrap().clone())
    }

    async fn count_active(&self) -> Result<usize> {
        Ok(self.recipients.lock().unwrap().len())
    }
}

#[async_trait]
impl BroadcastLedger for FakeStore {
    async fn append(&self, record: &BroadcastRecord) -> Result<()> {
        let mut left = self.ledger_failures.lock().unwrap();
        if *left > 0 {
            *left -= 1;
            return Err(Error::Persistence("disk I/O error".to_string()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

#[async_trait]
impl ActivityReports for FakeStore {
    async fn user_stats(&self) -> Result<UserStats> {
        let total = self.recipients.lock().unwrap().len() as i64;
        Ok(UserStats {
            total_users: total,
            active_users_24h: total,
            new_users_7d: total,
            total_commands: self.interactions.lock().unwrap().len() as i64,
            activity_counts: vec![("start_command".to_string(), total)],
            daily_new_users: vec![("2026-01-01".to_string(), total)],
        })
    }

    async fn export_report(&self) -> Result<ActivityReport> {
        Ok(ActivityReport {
            generated_at: "2026-01-01T00:00:00+00:00".to_string(),
            ..ActivityReport::default()
        })
    }
}
