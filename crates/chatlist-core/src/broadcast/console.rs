use std::{sync::Arc, time::Duration};

use tokio::sync::OwnedMutexGuard;

use crate::{
    broadcast::{
        executor::{BroadcastExecutor, BroadcastTally, ExecutorConfig},
        menu::{self, PanelAction},
        planner,
        session::{AdminSession, AdminStep, PendingBroadcast, SessionStore},
    },
    config::Config,
    directory::{ActivityReport, ActivityReports, UserDirectory},
    domain::{BroadcastMode, ChatId, MessageRef, UserId},
    errors::Error,
    formatting::truncate_chars,
    ledger::{append_with_retry, BroadcastLedger, BroadcastRecord},
    messaging::{port::MessagingPort, types::InboundMessage},
    security::AdminAllowList,
    utils::sql_timestamp_now,
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ConsoleConfig {
    pub executor: ExecutorConfig,
    pub ledger_write_attempts: u32,
    pub ledger_retry_backoff: Duration,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            executor: ExecutorConfig::default(),
            ledger_write_attempts: 3,
            ledger_retry_backoff: Duration::from_millis(200),
        }
    }
}

impl From<&Config> for ConsoleConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            executor: ExecutorConfig {
                pace: cfg.broadcast_pace,
                delivery_timeout: cfg.delivery_timeout,
            },
            ledger_write_attempts: cfg.ledger_write_attempts,
            ..Self::default()
        }
    }
}

/// Whether the console took ownership of an inbound message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handled {
    Consumed,
    Ignored,
}

/// Result of a confirmed broadcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub tally: BroadcastTally,
    /// False when every ledger write attempt failed.
    pub recorded: bool,
}

/// The admin management console.
///
/// Owns the per-admin session store and drives planner, executor and ledger.
/// Every entry point checks the allow-list before touching a session.
pub struct AdminConsole {
    admins: AdminAllowList,
    sessions: SessionStore,
    directory: Arc<dyn UserDirectory>,
    ledger: Arc<dyn BroadcastLedger>,
    reports: Arc<dyn ActivityReports>,
    messenger: Arc<dyn MessagingPort>,
    executor: BroadcastExecutor,
    cfg: ConsoleConfig,
}

impl AdminConsole {
    pub fn new(
        admins: AdminAllowList,
        directory: Arc<dyn UserDirectory>,
        ledger: Arc<dyn BroadcastLedger>,
        reports: Arc<dyn ActivityReports>,
        messenger: Arc<dyn MessagingPort>,
        cfg: ConsoleConfig,
    ) -> Self {
        let executor = BroadcastExecutor::new(messenger.clone(), cfg.executor);
        Self {
            admins,
            sessions: SessionStore::new(),
            directory,
            ledger,
            reports,
            messenger,
            executor,
            cfg,
        }
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.admins.is_admin(user_id)
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    fn ensure_admin(&self, user_id: UserId) -> Result<()> {
        if self.is_admin(user_id) {
            Ok(())
        } else {
            tracing::warn!(user_id = user_id.0, "admin console access denied");
            Err(Error::Authorization)
        }
    }

    /// `/panel`: (re)start the admin's session at the main menu.
    pub async fn open_panel(&self, admin: UserId, chat: ChatId) -> Result<()> {
        self.ensure_admin(admin)?;
        let _session = self.sessions.reset(admin).await;
        self.messenger
            .send_reply_keyboard(chat, menu::PANEL_WELCOME, menu::panel_keyboard())
            .await?;
        Ok(())
    }

    /// Route an admin's message: panel labels first, then payload capture.
    pub async fn handle_message(&self, chat: ChatId, msg: &InboundMessage) -> Result<Handled> {
        let admin = msg.sender;
        self.ensure_admin(admin)?;

        let label = match (&msg.media, msg.text.as_deref()) {
            (None, Some(text)) => PanelAction::from_label(text),
            _ => None,
        };
        if let Some(action) = label {
            self.apply_action(admin, chat, action).await?;
            return Ok(Handled::Consumed);
        }

        let Some(mut session) = self.sessions.lock_existing(admin).await else {
            return Ok(Handled::Ignored);
        };
        if session.step != AdminStep::AwaitingBroadcastPayload {
            return Ok(Handled::Ignored);
        }
        self.capture_payload(&mut session, chat, msg).await?;
        Ok(Handled::Consumed)
    }

    async fn apply_action(&self, admin: UserId, chat: ChatId, action: PanelAction) -> Result<()> {
        let mut session = self.sessions.lock_or_create(admin).await;
        tracing::debug!(admin_id = admin.0, ?action, step = ?session.step, "panel action");

        match action {
            PanelAction::Stats => self.send_stats(chat).await,
            PanelAction::Report => self.send_report(chat).await,
            PanelAction::Settings => {
                self.messenger.send_text(chat, menu::SETTINGS_SOON).await?;
                Ok(())
            }
            PanelAction::Broadcast => {
                session.reset();
                session.step = AdminStep::AwaitingBroadcastTypeChoice;
                self.messenger
                    .send_reply_keyboard(chat, menu::MODE_PROMPT, menu::mode_keyboard())
                    .await?;
                Ok(())
            }
            PanelAction::ModeForward | PanelAction::ModeCopy => {
                let mode = if action == PanelAction::ModeForward {
                    BroadcastMode::Forward
                } else {
                    BroadcastMode::Copy
                };
                session.step = AdminStep::AwaitingBroadcastPayload;
                session.broadcast_type = Some(mode);
                session.pending = None;
                self.messenger.send_text(chat, menu::ASK_FOR_PAYLOAD).await?;
                Ok(())
            }
            PanelAction::ModeBack => {
                session.reset();
                self.messenger
                    .send_reply_keyboard(chat, menu::PANEL_WELCOME, menu::panel_keyboard())
                    .await?;
                Ok(())
            }
            PanelAction::ExitPanel => {
                session.reset();
                session.step = AdminStep::Idle;
                self.messenger
                    .send_reply_keyboard(chat, menu::CHOOSE_OPTION, menu::peer_picker_keyboard())
                    .await?;
                Ok(())
            }
        }
    }

    async fn capture_payload(
        &self,
        session: &mut OwnedMutexGuard<AdminSession>,
        chat: ChatId,
        msg: &InboundMessage,
    ) -> Result<()> {
        let recipients = self.directory.count_active().await?;
        let snapshot_id = self.sessions.next_snapshot_id();

        let plan = match planner::plan(snapshot_id, session.broadcast_type, Some(msg), recipients)
        {
            Ok(plan) => plan,
            Err(e) => {
                session.reset();
                return Err(e);
            }
        };

        session.pending = Some(PendingBroadcast {
            snapshot_id,
            payload: msg.clone(),
        });
        session.step = AdminStep::AwaitingConfirmation;
        tracing::info!(
            admin_id = session.admin_id.0,
            snapshot_id,
            mode = %plan.mode,
            recipients,
            preview = %truncate_chars(msg.text(), 40),
            "broadcast payload captured"
        );

        self.messenger
            .send_inline_keyboard(chat, &plan.summary(), plan.keyboard())
            .await?;
        Ok(())
    }

    /// Run the pending broadcast tied to `snapshot_id`.
    ///
    /// The session lock is held for the whole run; a second confirmation waits
    /// and then finds nothing pending.
    pub async fn confirm(
        &self,
        admin: UserId,
        chat: ChatId,
        snapshot_id: u64,
    ) -> Result<BroadcastOutcome> {
        self.ensure_admin(admin)?;
        let mut session = self.session_or_state_lost(admin).await?;

        let pending = match session.pending.take() {
            Some(p) if p.snapshot_id == snapshot_id => p,
            Some(newer) => {
                session.pending = Some(newer);
                return Err(Error::InvalidBroadcast(
                    "this confirmation is out of date".to_string(),
                ));
            }
            None => {
                return Err(Error::InvalidBroadcast(
                    "nothing is waiting to be sent".to_string(),
                ));
            }
        };
        let mode = session.broadcast_type;

        let recipients = match self.directory.list_active_recipients().await {
            Ok(r) => r,
            Err(e) => {
                session.reset();
                return Err(e);
            }
        };
        let plan = match planner::plan(snapshot_id, mode, Some(&pending.payload), recipients.len())
        {
            Ok(plan) => plan,
            Err(e) => {
                session.reset();
                return Err(e);
            }
        };

        tracing::info!(
            admin_id = admin.0,
            snapshot_id,
            mode = %plan.mode,
            recipients = recipients.len(),
            "broadcast confirmed"
        );
        let tally = self.executor.execute(chat, &plan, &recipients).await;

        let record = BroadcastRecord {
            admin_id: admin,
            payload_text: plan.payload.text().to_string(),
            broadcast_type: plan.mode,
            sent_time: sql_timestamp_now(),
            total_recipients: tally.total_recipients,
            successful_sends: tally.successful_sends,
        };
        let recorded = match append_with_retry(
            self.ledger.as_ref(),
            &record,
            self.cfg.ledger_write_attempts,
            self.cfg.ledger_retry_backoff,
        )
        .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(?record, error = %e, "broadcast ledger write lost");
                if let Err(e) = self
                    .messenger
                    .send_text(chat, menu::LEDGER_WRITE_FAILED)
                    .await
                {
                    tracing::warn!(chat_id = chat.0, error = %e, "failed to notify admin");
                }
                false
            }
        };

        session.reset();
        Ok(BroadcastOutcome { tally, recorded })
    }

    /// Discard the pending broadcast tied to `snapshot_id`.
    ///
    /// `prompt` is the confirmation message to rewrite, when known.
    pub async fn cancel(
        &self,
        admin: UserId,
        chat: ChatId,
        snapshot_id: u64,
        prompt: Option<MessageRef>,
    ) -> Result<()> {
        self.ensure_admin(admin)?;
        let mut session = self.session_or_state_lost(admin).await?;

        if let Some(p) = &session.pending {
            if p.snapshot_id != snapshot_id {
                return Err(Error::InvalidBroadcast(
                    "this confirmation is out of date".to_string(),
                ));
            }
        }
        session.reset();
        tracing::info!(admin_id = admin.0, snapshot_id, "broadcast cancelled");
        drop(session);

        if let Some(msg) = prompt {
            if self.messenger.capabilities().supports_edit
                && self
                    .messenger
                    .edit_text(msg, menu::BROADCAST_CANCELLED)
                    .await
                    .is_ok()
            {
                return Ok(());
            }
        }
        self.messenger.send_text(chat, menu::BROADCAST_CANCELLED).await?;
        Ok(())
    }

    async fn session_or_state_lost(&self, admin: UserId) -> Result<OwnedMutexGuard<AdminSession>> {
        match self.sessions.lock_existing(admin).await {
            Some(session) => Ok(session),
            None => {
                tracing::warn!(admin_id = admin.0, "broadcast callback without a session");
                drop(self.sessions.reset(admin).await);
                Err(Error::StateLost)
            }
        }
    }

    async fn send_stats(&self, chat: ChatId) -> Result<()> {
        match self.reports.user_stats().await {
            Ok(stats) => {
                self.messenger
                    .send_html(chat, &menu::stats_message(&stats))
                    .await?;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load user stats");
                self.messenger.send_text(chat, menu::STATS_FAILED).await?;
            }
        }
        Ok(())
    }

    async fn send_report(&self, chat: ChatId) -> Result<()> {
        let bytes = self
            .reports
            .export_report()
            .await
            .and_then(|report| report.to_json_bytes());
        match bytes {
            Ok(bytes) => {
                self.messenger
                    .send_document(chat, ActivityReport::FILE_NAME, bytes, menu::REPORT_CAPTION)
                    .await?;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to export activity report");
                self.messenger.send_text(chat, menu::REPORT_FAILED).await?;
            }
        }
        Ok(())
    }
}
