use crate::domain::{MessageRef, UserId};

/// Kind of media attached to an inbound message that can be re-sent by file id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Animation,
    Document,
    Audio,
    Voice,
}

/// Reference to media already stored on the platform (re-sendable by file id).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaRef {
    pub kind: MediaKind,
    pub file_id: String,
}

/// Inbound private message as seen by the admin console.
///
/// The same value becomes the broadcast payload once captured: `source` is used
/// by forward mode, `text`/`media` by copy mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender: UserId,
    pub source: MessageRef,
    /// Message text, or the caption for media messages.
    pub text: Option<String>,
    pub media: Option<MediaRef>,
}

impl InboundMessage {
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// True when copy mode has something to re-send.
    pub fn is_copyable(&self) -> bool {
        self.media.is_some() || !self.text().trim().is_empty()
    }
}

/// Inline keyboard (buttons attached to a message).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub action: ButtonAction,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ButtonAction {
    Callback(String),
    Url(String),
}

impl InlineKeyboard {
    pub fn new(rows: Vec<Vec<InlineButton>>) -> Self {
        Self { rows }
    }

    /// Convenience for "one button per row" layouts.
    pub fn one_per_row(buttons: Vec<InlineButton>) -> Self {
        Self {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }

    pub fn callback_data(&self) -> Vec<&str> {
        self.rows
            .iter()
            .flatten()
            .filter_map(|b| match &b.action {
                ButtonAction::Callback(data) => Some(data.as_str()),
                ButtonAction::Url(_) => None,
            })
            .collect()
    }
}

impl InlineButton {
    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Callback(data.into()),
        }
    }

    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: ButtonAction::Url(url.into()),
        }
    }
}

/// Reply keyboard (replaces the user's keyboard until replaced again).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyKeyboard {
    pub rows: Vec<Vec<ReplyButton>>,
    pub persistent: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyButton {
    /// Sends its label back as a text message.
    Text(String),
    /// Opens the platform chat picker.
    RequestChat(ChatRequest),
}

/// Native chat-picker filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatRequest {
    pub label: String,
    pub request_id: i32,
    pub channel: bool,
    /// Only chats created (owned) by the user.
    pub created_only: bool,
    /// Admin rights the user must hold in the chat (`None` = no filter).
    pub user_rights: Option<AdminRightsFilter>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdminRightsFilter {
    pub can_manage_chat: bool,
    pub can_restrict_members: bool,
}

impl ReplyKeyboard {
    pub fn text_rows(rows: &[&[&str]]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|r| r.iter().map(|l| ReplyButton::Text(l.to_string())).collect())
                .collect(),
            persistent: false,
        }
    }

    pub fn labels(&self) -> Vec<&str> {
        self.labels_by_row().into_iter().flatten().collect()
    }

    pub fn labels_by_row(&self) -> Vec<Vec<&str>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(ReplyButton::label).collect())
            .collect()
    }
}

impl ReplyButton {
    pub fn label(&self) -> &str {
        match self {
            ReplyButton::Text(l) => l,
            ReplyButton::RequestChat(r) => &r.label,
        }
    }
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_html: bool,
    pub supports_edit: bool,
    pub supports_forward: bool,
    pub max_message_len: usize,
}
