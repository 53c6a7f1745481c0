use std::{sync::Arc, time::Duration};

use tokio::time::{sleep, timeout};

use crate::{
    broadcast::{menu, planner::BroadcastPlan},
    domain::{BroadcastMode, ChatId, MessageRef, UserId},
    errors::Error,
    messaging::{pacing::SendPacer, port::MessagingPort},
    Result,
};

/// Outcome of one broadcast run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BroadcastTally {
    pub total_recipients: usize,
    pub successful_sends: usize,
    pub failed_recipients: Vec<UserId>,
}

impl BroadcastTally {
    pub fn failed(&self) -> usize {
        self.total_recipients - self.successful_sends
    }

    pub fn report(&self) -> String {
        format!(
            "✅ Finished sending the message to users\n\n\
             • Total users: {}\n\
             • Delivered: {}\n\
             • Failed: {}",
            self.total_recipients,
            self.successful_sends,
            self.failed()
        )
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ExecutorConfig {
    /// Minimum spacing between two deliveries.
    pub pace: Duration,
    /// Upper bound for a single delivery attempt.
    pub delivery_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            pace: Duration::from_millis(100),
            delivery_timeout: Duration::from_secs(15),
        }
    }
}

/// Sequential fan-out of one payload to a recipient list.
///
/// Every recipient is attempted exactly once; a failed or timed-out delivery is
/// logged and counted, never aborting the run.
pub struct BroadcastExecutor {
    messenger: Arc<dyn MessagingPort>,
    cfg: ExecutorConfig,
}

impl BroadcastExecutor {
    pub fn new(messenger: Arc<dyn MessagingPort>, cfg: ExecutorConfig) -> Self {
        Self { messenger, cfg }
    }

    /// Deliver `plan` to `recipients`, reporting progress to the admin's chat.
    ///
    /// The status message is best-effort: it is sent before the first delivery and
    /// edited in place with the final tally (or re-sent if the edit fails).
    pub async fn execute(
        &self,
        admin_chat: ChatId,
        plan: &BroadcastPlan,
        recipients: &[UserId],
    ) -> BroadcastTally {
        let status = match self
            .messenger
            .send_text(admin_chat, menu::BROADCAST_SENDING)
            .await
        {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::warn!(chat_id = admin_chat.0, error = %e, "failed to send broadcast status");
                None
            }
        };

        let tally = self.deliver_all(plan, recipients).await;

        tracing::info!(
            snapshot_id = plan.snapshot_id,
            mode = %plan.mode,
            total = tally.total_recipients,
            delivered = tally.successful_sends,
            failed = tally.failed(),
            "broadcast finished"
        );

        self.report_status(admin_chat, status, &tally.report()).await;
        tally
    }

    /// Delivery loop without any status messaging.
    pub async fn deliver_all(&self, plan: &BroadcastPlan, recipients: &[UserId]) -> BroadcastTally {
        let mut pacer = SendPacer::new(self.cfg.pace);
        let mut tally = BroadcastTally {
            total_recipients: recipients.len(),
            ..BroadcastTally::default()
        };

        for &recipient in recipients {
            pacer.pace().await;
            match self.deliver_one(recipient, plan).await {
                Ok(_) => tally.successful_sends += 1,
                Err(e) => {
                    tracing::warn!(recipient = recipient.0, error = %e, "broadcast delivery failed");
                    tally.failed_recipients.push(recipient);
                }
            }
        }

        tally
    }

    /// One delivery. A flood wait reported by the transport is slept off
    /// outside the per-attempt timeout, then the send is retried once.
    async fn deliver_one(&self, recipient: UserId, plan: &BroadcastPlan) -> Result<MessageRef> {
        match self.attempt(recipient, plan).await {
            Err(Error::RateLimited { retry_after, .. }) => {
                tracing::info!(
                    recipient = recipient.0,
                    ?retry_after,
                    "flood wait before redelivery"
                );
                sleep(retry_after).await;
                self.attempt(recipient, plan).await
            }
            other => other,
        }
    }

    async fn attempt(&self, recipient: UserId, plan: &BroadcastPlan) -> Result<MessageRef> {
        let send = self.dispatch(recipient.private_chat(), plan);
        match timeout(self.cfg.delivery_timeout, send).await {
            Ok(res) => res.map_err(|e| match e {
                Error::Delivery { .. } | Error::RateLimited { .. } => e,
                other => Error::Delivery {
                    recipient: recipient.0,
                    cause: other.to_string(),
                },
            }),
            Err(_) => Err(Error::Delivery {
                recipient: recipient.0,
                cause: format!("timed out after {:?}", self.cfg.delivery_timeout),
            }),
        }
    }

    async fn dispatch(&self, chat_id: ChatId, plan: &BroadcastPlan) -> Result<MessageRef> {
        let payload = &plan.payload;
        match plan.mode {
            BroadcastMode::Forward => self.messenger.forward(chat_id, payload.source).await,
            BroadcastMode::Copy => match &payload.media {
                Some(media) => {
                    self.messenger
                        .send_with_attachment(chat_id, payload.text(), media)
                        .await
                }
                None => self.messenger.send_text(chat_id, payload.text()).await,
            },
        }
    }

    async fn report_status(&self, admin_chat: ChatId, status: Option<MessageRef>, text: &str) {
        if let Some(msg) = status {
            if self.messenger.capabilities().supports_edit {
                match self.messenger.edit_text(msg, text).await {
                    Ok(()) => return,
                    Err(e) => {
                        tracing::warn!(chat_id = admin_chat.0, error = %e, "failed to edit broadcast status");
                    }
                }
            }
        }
        if let Err(e) = self.messenger.send_text(admin_chat, text).await {
            tracing::warn!(chat_id = admin_chat.0, error = %e, "failed to send broadcast tally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::testing::{inbound, FakeMessenger, SentKind, ADMIN_CHAT};
    use crate::messaging::types::{MediaKind, MediaRef};

    fn executor(messenger: Arc<FakeMessenger>) -> BroadcastExecutor {
        BroadcastExecutor::new(
            messenger,
            ExecutorConfig {
                pace: Duration::ZERO,
                delivery_timeout: Duration::from_millis(200),
            },
        )
    }

    fn plan(mode: BroadcastMode, text: Option<&str>, media: Option<MediaRef>) -> BroadcastPlan {
        let mut payload = inbound(1, text);
        payload.media = media;
        BroadcastPlan {
            snapshot_id: 1,
            mode,
            payload,
            recipient_count: 0,
        }
    }

    fn ids(raw: &[i64]) -> Vec<UserId> {
        raw.iter().copied().map(UserId).collect()
    }

    #[tokio::test]
    async fn tally_counts_failures_without_aborting() {
        for (n, failing) in [(0usize, vec![]), (1, vec![1]), (4, vec![2, 4]), (5, vec![1, 2, 3, 4, 5])]
        {
            let messenger = Arc::new(FakeMessenger::default());
            messenger.fail_for(&failing);
            let recipients: Vec<UserId> = (1..=n as i64).map(UserId).collect();

            let tally = executor(messenger.clone())
                .deliver_all(&plan(BroadcastMode::Copy, Some("x"), None), &recipients)
                .await;

            assert_eq!(tally.total_recipients, n);
            assert_eq!(tally.successful_sends, n - failing.len());
            assert_eq!(tally.failed(), failing.len());
            assert_eq!(tally.failed_recipients, ids(&failing));
            // Every recipient attempted once, failed or not.
            assert_eq!(messenger.delivery_targets(), recipients);
        }
    }

    #[tokio::test]
    async fn forward_mode_forwards_the_source_message() {
        let messenger = Arc::new(FakeMessenger::default());
        let p = plan(BroadcastMode::Forward, Some("hello"), None);
        executor(messenger.clone())
            .deliver_all(&p, &ids(&[5, 6]))
            .await;

        let sent = messenger.deliveries();
        assert_eq!(sent.len(), 2);
        assert!(sent
            .iter()
            .all(|d| d.kind == SentKind::Forward(p.payload.source)));
    }

    #[tokio::test]
    async fn copy_mode_resends_media_with_caption() {
        let messenger = Arc::new(FakeMessenger::default());
        let media = MediaRef {
            kind: MediaKind::Video,
            file_id: "vid".to_string(),
        };
        executor(messenger.clone())
            .deliver_all(
                &plan(BroadcastMode::Copy, Some("caption"), Some(media.clone())),
                &ids(&[9]),
            )
            .await;

        let sent = messenger.deliveries();
        assert_eq!(
            sent[0].kind,
            SentKind::Attachment("caption".to_string(), media)
        );
    }

    #[tokio::test]
    async fn hung_delivery_counts_as_failure_after_timeout() {
        let messenger = Arc::new(FakeMessenger::default());
        messenger.hang_for(&[2]);

        let tally = executor(messenger.clone())
            .deliver_all(&plan(BroadcastMode::Copy, Some("x"), None), &ids(&[1, 2, 3]))
            .await;

        assert_eq!(tally.successful_sends, 2);
        assert_eq!(tally.failed_recipients, ids(&[2]));
    }

    #[tokio::test]
    async fn flood_wait_longer_than_the_timeout_is_waited_out() {
        let messenger = Arc::new(FakeMessenger::default());
        messenger.rate_limit_once(&[2], Duration::from_millis(300));

        let tally = executor(messenger.clone())
            .deliver_all(&plan(BroadcastMode::Copy, Some("x"), None), &ids(&[1, 2, 3]))
            .await;

        assert_eq!(tally.successful_sends, 3);
        assert!(tally.failed_recipients.is_empty());
        assert_eq!(messenger.delivery_targets(), ids(&[1, 2, 2, 3]));
    }

    #[tokio::test]
    async fn status_message_is_edited_with_the_tally() {
        let messenger = Arc::new(FakeMessenger::default());
        messenger.fail_for(&[2]);

        let tally = executor(messenger.clone())
            .execute(
                ADMIN_CHAT,
                &plan(BroadcastMode::Copy, Some("x"), None),
                &ids(&[1, 2, 3]),
            )
            .await;

        let admin_texts = messenger.texts_to(ADMIN_CHAT);
        assert_eq!(admin_texts, vec![menu::BROADCAST_SENDING.to_string()]);
        let edits = messenger.edits();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0], tally.report());
        assert!(edits[0].contains("Delivered: 2"));
        assert!(edits[0].contains("Failed: 1"));
    }

    #[tokio::test]
    async fn failed_edit_falls_back_to_a_new_message() {
        let messenger = Arc::new(FakeMessenger::default());
        messenger.fail_edits();

        let tally = executor(messenger.clone())
            .execute(
                ADMIN_CHAT,
                &plan(BroadcastMode::Copy, Some("x"), None),
                &ids(&[1]),
            )
            .await;

        let admin_texts = messenger.texts_to(ADMIN_CHAT);
        assert_eq!(admin_texts.len(), 2);
        assert_eq!(admin_texts[1], tally.report());
    }
}
