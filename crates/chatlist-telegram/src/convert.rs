//! teloxide types -> core types.

use teloxide::types::{Message, User};

use chatlist_core::{
    domain::{ChatId, MessageId, MessageRef, UserId, UserProfile},
    messaging::types::{InboundMessage, MediaKind, MediaRef},
};

pub fn user_id(user: &User) -> UserId {
    UserId(user.id.0 as i64)
}

pub fn profile(user: &User) -> UserProfile {
    UserProfile {
        user_id: user.id.0 as i64,
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()),
        last_name: user.last_name.clone(),
    }
}

pub fn message_ref(msg: &Message) -> MessageRef {
    MessageRef {
        chat_id: ChatId(msg.chat.id.0),
        message_id: MessageId(msg.id.0),
    }
}

/// Sender of a message posted in a private chat with the bot. Group, supergroup
/// and channel traffic yields `None`.
pub fn private_sender(msg: &Message) -> Option<&User> {
    if !msg.chat.is_private() {
        return None;
    }
    msg.from()
}

/// Re-sendable media carried by the message, by file id.
///
/// Animations are checked before documents: Telegram sets both for GIFs.
pub fn media(msg: &Message) -> Option<MediaRef> {
    let (kind, file_id) = if let Some(photos) = msg.photo() {
        (MediaKind::Photo, photos.last()?.file.id.clone())
    } else if let Some(v) = msg.video() {
        (MediaKind::Video, v.file.id.clone())
    } else if let Some(a) = msg.animation() {
        (MediaKind::Animation, a.file.id.clone())
    } else if let Some(d) = msg.document() {
        (MediaKind::Document, d.file.id.clone())
    } else if let Some(a) = msg.audio() {
        (MediaKind::Audio, a.file.id.clone())
    } else if let Some(v) = msg.voice() {
        (MediaKind::Voice, v.file.id.clone())
    } else {
        return None;
    };
    Some(MediaRef { kind, file_id })
}

/// `None` for messages without a sender or outside a private chat.
pub fn inbound(msg: &Message) -> Option<InboundMessage> {
    let sender = private_sender(msg)?;
    Some(InboundMessage {
        sender: user_id(sender),
        source: message_ref(msg),
        text: msg
            .text()
            .or_else(|| msg.caption())
            .map(|s| s.to_string()),
        media: media(msg),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(extra: serde_json::Value) -> Message {
        let mut json = serde_json::json!({
            "message_id": 77,
            "date": 1_767_225_600,
            "chat": { "id": 5, "type": "private", "first_name": "Ann" },
            "from": { "id": 5, "is_bot": false, "first_name": "Ann", "username": "ann" },
        });
        if let (Some(base), Some(extra)) = (json.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn text_message_has_no_media() {
        let msg = message(serde_json::json!({ "text": "hello" }));
        let inbound = inbound(&msg).unwrap();
        assert_eq!(inbound.sender, UserId(5));
        assert_eq!(inbound.text.as_deref(), Some("hello"));
        assert_eq!(inbound.media, None);
        assert_eq!(
            inbound.source,
            MessageRef {
                chat_id: ChatId(5),
                message_id: MessageId(77)
            }
        );
    }

    #[test]
    fn photo_uses_largest_size_and_caption() {
        let msg = message(serde_json::json!({
            "caption": "look",
            "photo": [
                { "file_id": "small", "file_unique_id": "s", "width": 90, "height": 90, "file_size": 10 },
                { "file_id": "large", "file_unique_id": "l", "width": 800, "height": 800, "file_size": 100 }
            ]
        }));
        let inbound = inbound(&msg).unwrap();
        assert_eq!(inbound.text.as_deref(), Some("look"));
        assert_eq!(
            inbound.media,
            Some(MediaRef {
                kind: MediaKind::Photo,
                file_id: "large".to_string()
            })
        );
    }

    #[test]
    fn group_messages_are_not_admin_input() {
        let msg = message(serde_json::json!({
            "chat": { "id": -100, "type": "group", "title": "Team" },
            "text": "📤 Send to all"
        }));
        assert!(msg.from().is_some());
        assert!(private_sender(&msg).is_none());
        assert!(inbound(&msg).is_none());

        let private = message(serde_json::json!({ "text": "📤 Send to all" }));
        assert_eq!(private_sender(&private).map(user_id), Some(UserId(5)));
    }

    #[test]
    fn profile_copies_names() {
        let msg = message(serde_json::json!({ "text": "/start" }));
        let p = profile(msg.from().unwrap());
        assert_eq!(p.user_id, 5);
        assert_eq!(p.username.as_deref(), Some("ann"));
        assert_eq!(p.first_name.as_deref(), Some("Ann"));
        assert_eq!(p.last_name, None);
    }
}
