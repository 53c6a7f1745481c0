//! Known users, their activity counters, and the reports built on them.

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    domain::{UserId, UserProfile},
    Result,
};

/// Activity tag recorded when a user sends `/start`.
pub const ACTIVITY_START: &str = "start_command";

/// Durable record of known recipients.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Insert the user on first contact; existing rows are left untouched.
    async fn upsert_user(&self, profile: &UserProfile) -> Result<()>;

    /// Bump `commands_used`/`last_activity` and append an activity row.
    async fn record_interaction(&self, user_id: UserId, activity_type: &str) -> Result<()>;

    /// Snapshot of every active recipient, ordered by id.
    async fn list_active_recipients(&self) -> Result<Vec<UserId>>;

    async fn count_active(&self) -> Result<usize>;
}

/// Read-only reporting over users, activity and broadcasts.
#[async_trait]
pub trait ActivityReports: Send + Sync {
    async fn user_stats(&self) -> Result<UserStats>;
    async fn export_report(&self) -> Result<ActivityReport>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub total_users: i64,
    pub active_users_24h: i64,
    pub new_users_7d: i64,
    pub total_commands: i64,
    /// `(activity_type, count)`, most frequent first.
    pub activity_counts: Vec<(String, i64)>,
    /// `(YYYY-MM-DD, count)`, oldest first.
    pub daily_new_users: Vec<(String, i64)>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct UserRow {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub join_date: String,
    pub last_activity: String,
    pub commands_used: i64,
    pub is_active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ActivityRow {
    pub id: i64,
    pub user_id: i64,
    pub activity_type: String,
    pub timestamp: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct BroadcastRow {
    pub id: i64,
    pub admin_id: i64,
    pub message_text: String,
    pub broadcast_type: String,
    pub sent_date: String,
    pub total_recipients: i64,
    pub successful_sends: i64,
}

/// Full dump of the bot's tables, exported as a file from the admin panel.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ActivityReport {
    pub generated_at: String,
    pub users: Vec<UserRow>,
    pub activities: Vec<ActivityRow>,
    pub broadcasts: Vec<BroadcastRow>,
}

impl ActivityReport {
    pub const FILE_NAME: &'static str = "bot_report.json";

    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}
