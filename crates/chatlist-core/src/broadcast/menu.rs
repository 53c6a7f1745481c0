//! Static panel labels, keyboards and reply texts.

use std::fmt::Write as _;

use crate::{
    directory::UserStats,
    errors::Error,
    formatting::{escape_html, text_bar},
    messaging::types::{
        AdminRightsFilter, ChatRequest, InlineButton, InlineKeyboard, ReplyButton, ReplyKeyboard,
    },
};

const CHART_WIDTH: usize = 12;

pub const LABEL_STATS: &str = "📊 User stats";
pub const LABEL_BROADCAST: &str = "📤 Send to all";
pub const LABEL_REPORT: &str = "📋 Activity report";
pub const LABEL_SETTINGS: &str = "⚙️ Settings";
pub const LABEL_EXIT_PANEL: &str = "🔙 Back to main menu";

pub const LABEL_MODE_FORWARD: &str = "🔄 Send with name (Forward)";
pub const LABEL_MODE_COPY: &str = "📋 Send without name (Copy)";
pub const LABEL_MODE_BACK: &str = "🔙 Back";

pub const WELCOME_MESSAGE: &str = "This bot helps you find the channels and groups you own or administer, even ones you have already left.\n\
More info: https://tginfo.me/how-to-find-my-chats-en/\n\n\
1. Pick the chat type (channel or group) with the buttons below.\n\n\
2. Tap the chat you are looking for and the bot sends its name.\n\n\
3. Tap the name to open the chat.\n\n\
If the chat does not open, Telegram cannot show it anymore and there is no way back into it.";

pub const CHOOSE_OPTION: &str = "Please choose one of the options:";
pub const PANEL_WELCOME: &str = "🔐 Welcome to the admin panel. Please choose an option:";
pub const NO_ACCESS: &str = "You don't have access to this section.";
pub const NO_ADMIN_ACCESS_ALERT: &str = "You don't have admin access.";
pub const STATE_LOST_ALERT: &str = "Cannot process this request: the broadcast state was lost. Please start again from /panel.";
pub const SETTINGS_SOON: &str = "⚙️ Settings will be added soon.";
pub const REPORT_CAPTION: &str = "📊 Full bot activity report";
pub const REPORT_FAILED: &str = "❌ Could not generate the report. Please try again later.";
pub const STATS_FAILED: &str = "❌ Could not load statistics. Please try again later.";
pub const ASK_FOR_PAYLOAD: &str = "✅ Send the message you want to deliver to every user:";
pub const BROADCAST_CANCELLED: &str = "❌ Broadcast cancelled.";
pub const BROADCAST_SENDING: &str = "🔄 Sending the message to users...";
pub const LEDGER_WRITE_FAILED: &str = "⚠️ The broadcast finished, but its audit record could not be saved.";
pub const GENERIC_FAILURE: &str = "❌ Something went wrong. Please try again later.";

pub const MODE_PROMPT: &str = "🔄 <b>Send a message to all users</b>\n\n\
Choose how to send it:\n\
- <b>Send with name (Forward)</b>: the message is forwarded with your name\n\
- <b>Send without name (Copy)</b>: the message is sent as the bot\n\n\
Then send your message.";

/// Every label the admin console reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelAction {
    Stats,
    Broadcast,
    Report,
    Settings,
    ExitPanel,
    ModeForward,
    ModeCopy,
    ModeBack,
}

impl PanelAction {
    pub fn from_label(text: &str) -> Option<Self> {
        let action = match text.trim() {
            LABEL_STATS => Self::Stats,
            LABEL_BROADCAST => Self::Broadcast,
            LABEL_REPORT => Self::Report,
            LABEL_SETTINGS => Self::Settings,
            LABEL_EXIT_PANEL => Self::ExitPanel,
            LABEL_MODE_FORWARD => Self::ModeForward,
            LABEL_MODE_COPY => Self::ModeCopy,
            LABEL_MODE_BACK => Self::ModeBack,
            _ => return None,
        };
        Some(action)
    }
}

pub fn panel_keyboard() -> ReplyKeyboard {
    ReplyKeyboard::text_rows(&[
        &[LABEL_STATS, LABEL_BROADCAST],
        &[LABEL_REPORT, LABEL_SETTINGS],
        &[LABEL_EXIT_PANEL],
    ])
}

pub fn mode_keyboard() -> ReplyKeyboard {
    ReplyKeyboard::text_rows(&[&[LABEL_MODE_FORWARD, LABEL_MODE_COPY], &[LABEL_MODE_BACK]])
}

pub fn welcome_links() -> InlineKeyboard {
    InlineKeyboard::one_per_row(vec![
        InlineButton::url("🤖 AI assistant bot", "https://t.me/GPTAlphaRobot"),
        InlineButton::url("🤖 Utility bots", "https://t.me/AlphaTeam_bots/6"),
    ])
}

/// Peer-picker keyboard: chats the user administers or owns.
pub fn peer_picker_keyboard() -> ReplyKeyboard {
    let row = |req: ChatRequest| vec![ReplyButton::RequestChat(req)];
    ReplyKeyboard {
        rows: vec![
            row(ChatRequest {
                label: "Channels I administer".to_string(),
                request_id: 345,
                channel: true,
                created_only: false,
                user_rights: Some(AdminRightsFilter {
                    can_manage_chat: true,
                    can_restrict_members: true,
                }),
            }),
            row(ChatRequest {
                label: "Groups I administer".to_string(),
                request_id: 456,
                channel: false,
                created_only: false,
                user_rights: Some(AdminRightsFilter {
                    can_manage_chat: true,
                    can_restrict_members: false,
                }),
            }),
            row(ChatRequest {
                label: "My channels".to_string(),
                request_id: 123,
                channel: true,
                created_only: true,
                user_rights: None,
            }),
            row(ChatRequest {
                label: "My groups".to_string(),
                request_id: 234,
                channel: false,
                created_only: true,
                user_rights: None,
            }),
        ],
        persistent: true,
    }
}

/// User-facing text for a failed console operation.
pub fn error_reply(err: &Error) -> String {
    match err {
        Error::Authorization => NO_ACCESS.to_string(),
        Error::StateLost => STATE_LOST_ALERT.to_string(),
        Error::InvalidBroadcast(reason) => format!("❌ Cannot send this broadcast: {reason}."),
        _ => GENERIC_FAILURE.to_string(),
    }
}

/// HTML stats card with a text bar chart of daily sign-ups.
pub fn stats_message(stats: &UserStats) -> String {
    let mut out = String::from("📊 <b>Bot user statistics</b>\n\n");
    let _ = writeln!(out, "👥 Total users: {}", stats.total_users);
    let _ = writeln!(out, "🟢 Active in the last 24h: {}", stats.active_users_24h);
    let _ = writeln!(out, "🆕 New in the last 7 days: {}", stats.new_users_7d);
    let _ = writeln!(out, "⌨️ Commands used: {}", stats.total_commands);

    if !stats.activity_counts.is_empty() {
        out.push_str("\n<b>Top activities</b>\n");
        for (kind, count) in &stats.activity_counts {
            let _ = writeln!(out, "• {}: {count}", escape_html(kind));
        }
    }

    if !stats.daily_new_users.is_empty() {
        let max = stats
            .daily_new_users
            .iter()
            .map(|(_, n)| *n)
            .max()
            .unwrap_or(0);
        out.push_str("\n<b>New users per day</b>\n<pre>");
        for (day, count) in &stats.daily_new_users {
            let _ = writeln!(
                out,
                "{} {:>4} {}",
                escape_html(day),
                count,
                text_bar(*count, max, CHART_WIDTH)
            );
        }
        out.push_str("</pre>");
    }
    out
}
