use crate::{
    domain::BroadcastMode,
    errors::Error,
    messaging::types::{InboundMessage, InlineButton, InlineKeyboard},
    Result,
};

const CALLBACK_PREFIX: &str = "broadcast";

/// A validated broadcast, ready for the admin's confirmation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BroadcastPlan {
    pub snapshot_id: u64,
    pub mode: BroadcastMode,
    pub payload: InboundMessage,
    pub recipient_count: usize,
}

/// Confirm/cancel answer for a specific captured payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmationAction {
    Confirm,
    Cancel,
}

/// Validate a session's broadcast inputs.
///
/// Pure: the caller supplies the recipient count it just read.
pub fn plan(
    snapshot_id: u64,
    mode: Option<BroadcastMode>,
    payload: Option<&InboundMessage>,
    recipient_count: usize,
) -> Result<BroadcastPlan> {
    let Some(mode) = mode else {
        return Err(Error::InvalidBroadcast(
            "no broadcast type selected".to_string(),
        ));
    };
    let Some(payload) = payload else {
        return Err(Error::InvalidBroadcast("no message to send".to_string()));
    };
    if recipient_count == 0 {
        return Err(Error::InvalidBroadcast("there are no recipients".to_string()));
    }
    if mode == BroadcastMode::Copy && !payload.is_copyable() {
        return Err(Error::InvalidBroadcast(
            "this message has no text or media that can be copied".to_string(),
        ));
    }

    Ok(BroadcastPlan {
        snapshot_id,
        mode,
        payload: payload.clone(),
        recipient_count,
    })
}

impl BroadcastPlan {
    pub fn summary(&self) -> String {
        let mode = match self.mode {
            BroadcastMode::Forward => "with name (Forward)",
            BroadcastMode::Copy => "without name (Copy)",
        };
        format!(
            "Are you sure you want to send this message to all users?\n\n\
             Send type: {mode}\n\n\
             Recipients: {} users",
            self.recipient_count
        )
    }

    pub fn keyboard(&self) -> InlineKeyboard {
        InlineKeyboard::one_per_row(vec![
            InlineButton::callback(
                "✅ Yes, send it",
                encode_callback(ConfirmationAction::Confirm, self.snapshot_id),
            ),
            InlineButton::callback(
                "❌ No, cancel",
                encode_callback(ConfirmationAction::Cancel, self.snapshot_id),
            ),
        ])
    }
}

pub fn encode_callback(action: ConfirmationAction, snapshot_id: u64) -> String {
    let verb = match action {
        ConfirmationAction::Confirm => "confirm",
        ConfirmationAction::Cancel => "cancel",
    };
    format!("{CALLBACK_PREFIX}:{verb}:{snapshot_id}")
}

/// Parse `broadcast:{confirm|cancel}:{snapshot_id}`.
pub fn parse_callback(data: &str) -> Option<(ConfirmationAction, u64)> {
    let mut parts = data.split(':');
    if parts.next()? != CALLBACK_PREFIX {
        return None;
    }
    let action = match parts.next()? {
        "confirm" => ConfirmationAction::Confirm,
        "cancel" => ConfirmationAction::Cancel,
        _ => return None,
    };
    let snapshot_id = parts.next()?.parse::<u64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((action, snapshot_id))
}
