use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    domain::{BroadcastMode, UserId},
    messaging::types::InboundMessage,
};

/// Where an admin is in the broadcast-composition conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminStep {
    MainMenu,
    AwaitingBroadcastTypeChoice,
    AwaitingBroadcastPayload,
    AwaitingConfirmation,
    /// Left the panel; back on the user keyboard.
    Idle,
}

/// A captured payload waiting for confirm/cancel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingBroadcast {
    /// Unique per capture; carried in the confirm/cancel callback data.
    pub snapshot_id: u64,
    pub payload: InboundMessage,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminSession {
    pub admin_id: UserId,
    pub step: AdminStep,
    pub broadcast_type: Option<BroadcastMode>,
    pub pending: Option<PendingBroadcast>,
}

impl AdminSession {
    pub fn new(admin_id: UserId) -> Self {
        Self {
            admin_id,
            step: AdminStep::MainMenu,
            broadcast_type: None,
            pending: None,
        }
    }

    /// Back to the panel root with nothing pending.
    pub fn reset(&mut self) {
        self.step = AdminStep::MainMenu;
        self.broadcast_type = None;
        self.pending = None;
    }
}

/// Per-admin session store.
///
/// Each admin gets an independent `Mutex<AdminSession>`; holding its guard
/// serializes that admin's transitions (including a whole broadcast run) without
/// blocking other admins.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<UserId, Arc<Mutex<AdminSession>>>>,
    next_snapshot: AtomicU64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the admin's session, creating it at `MainMenu` on first use.
    pub async fn lock_or_create(&self, admin_id: UserId) -> OwnedMutexGuard<AdminSession> {
        let slot = {
            let mut map = self.inner.lock().await;
            map.entry(admin_id)
                .or_insert_with(|| Arc::new(Mutex::new(AdminSession::new(admin_id))))
                .clone()
        };
        slot.lock_owned().await
    }

    /// Lock the admin's session only if one exists.
    pub async fn lock_existing(&self, admin_id: UserId) -> Option<OwnedMutexGuard<AdminSession>> {
        let slot = { self.inner.lock().await.get(&admin_id).cloned() }?;
        Some(slot.lock_owned().await)
    }

    /// Create or overwrite the admin's session at `MainMenu`.
    pub async fn reset(&self, admin_id: UserId) -> OwnedMutexGuard<AdminSession> {
        let mut guard = self.lock_or_create(admin_id).await;
        guard.reset();
        guard
    }

    /// Drop the admin's session entirely.
    pub async fn remove(&self, admin_id: UserId) {
        self.inner.lock().await.remove(&admin_id);
    }

    /// Copy of the admin's current session, if any.
    pub async fn snapshot(&self, admin_id: UserId) -> Option<AdminSession> {
        let guard = self.lock_existing(admin_id).await?;
        Some(guard.clone())
    }

    /// Whether a session exists, without waiting on its lock.
    pub async fn contains(&self, admin_id: UserId) -> bool {
        self.inner.lock().await.contains_key(&admin_id)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub fn next_snapshot_id(&self) -> u64 {
        self.next_snapshot.fetch_add(1, Ordering::Relaxed) + 1
    }
}
