//! SQLite-backed `UserDirectory`, `BroadcastLedger` and `ActivityReports`.

use std::{path::Path, str::FromStr, time::Duration};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::{
    directory::{
        ActivityReport, ActivityReports, ActivityRow, BroadcastRow, UserDirectory, UserRow,
        UserStats,
    },
    domain::{UserId, UserProfile},
    errors::Error,
    ledger::{BroadcastLedger, BroadcastRecord},
    utils::{iso_timestamp_utc, sql_timestamp_now},
    Result,
};

const TOP_ACTIVITY_TYPES: i64 = 5;

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open or create the database file and apply migrations.
    ///
    /// Creates the parent directory if needed, enables WAL journal mode, foreign
    /// keys, and a 5-second busy timeout.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))
            .map_err(|e| Error::Persistence(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        tracing::info!(path = %path.display(), "database opened");
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| Error::Persistence(e.to_string()))?
            .foreign_keys(true);

        // A single connection: every in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl UserDirectory for SqliteStore {
    async fn upsert_user(&self, profile: &UserProfile) -> Result<()> {
        let now = sql_timestamp_now();
        sqlx::query(
            "INSERT OR IGNORE INTO users \
             (user_id, username, first_name, last_name, join_date, last_activity) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(profile.user_id)
        .bind(&profile.username)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_interaction(&self, user_id: UserId, activity_type: &str) -> Result<()> {
        let now = sql_timestamp_now();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE users SET last_activity = ?, commands_used = commands_used + 1 \
             WHERE user_id = ?",
        )
        .bind(&now)
        .bind(user_id.0)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Activity rows reference users; an unknown id has nothing to count against.
            tx.rollback().await?;
            return Err(Error::Persistence(format!(
                "unknown user {user_id} for activity {activity_type}"
            )));
        }

        sqlx::query("INSERT INTO user_activity (user_id, activity_type, timestamp) VALUES (?, ?, ?)")
            .bind(user_id.0)
            .bind(activity_type)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_active_recipients(&self) -> Result<Vec<UserId>> {
        let ids: Vec<i64> =
            sqlx::query_scalar("SELECT user_id FROM users WHERE is_active = 1 ORDER BY user_id")
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.into_iter().map(UserId).collect())
    }

    async fn count_active(&self) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(n).unwrap_or(0))
    }
}

#[async_trait]
impl BroadcastLedger for SqliteStore {
    async fn append(&self, record: &BroadcastRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO message_broadcasts \
             (admin_id, message_text, broadcast_type, sent_date, total_recipients, successful_sends) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(record.admin_id.0)
        .bind(&record.payload_text)
        .bind(record.broadcast_type.as_str())
        .bind(&record.sent_time)
        .bind(record.total_recipients as i64)
        .bind(record.successful_sends as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ActivityReports for SqliteStore {
    async fn user_stats(&self) -> Result<UserStats> {
        let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let active_users_24h: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE datetime(last_activity) > datetime('now', '-1 day')",
        )
        .fetch_one(&self.pool)
        .await?;

        let new_users_7d: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE datetime(join_date) > datetime('now', '-7 days')",
        )
        .fetch_one(&self.pool)
        .await?;

        let total_commands: Option<i64> = sqlx::query_scalar("SELECT SUM(commands_used) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let activity_counts: Vec<(String, i64)> = sqlx::query_as(
            "SELECT activity_type, COUNT(*) AS count FROM user_activity \
             GROUP BY activity_type ORDER BY count DESC, activity_type LIMIT ?",
        )
        .bind(TOP_ACTIVITY_TYPES)
        .fetch_all(&self.pool)
        .await?;

        let daily_new_users: Vec<(String, i64)> = sqlx::query_as(
            "SELECT date(join_date) AS day, COUNT(*) AS count FROM users \
             WHERE datetime(join_date) > datetime('now', '-7 days') \
             GROUP BY day ORDER BY day",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(UserStats {
            total_users,
            active_users_24h,
            new_users_7d,
            total_commands: total_commands.unwrap_or(0),
            activity_counts,
            daily_new_users,
        })
    }

    async fn export_report(&self) -> Result<ActivityReport> {
        let users: Vec<UserRow> = sqlx::query_as(
            "SELECT user_id, username, first_name, last_name, join_date, last_activity, \
             commands_used, is_active FROM users ORDER BY user_id",
        )
        .fetch_all(&self.pool)
        .await?;

        let activities: Vec<ActivityRow> = sqlx::query_as(
            "SELECT id, user_id, activity_type, timestamp FROM user_activity ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let broadcasts: Vec<BroadcastRow> = sqlx::query_as(
            "SELECT id, admin_id, message_text, broadcast_type, sent_date, total_recipients, \
             successful_sends FROM message_broadcasts ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ActivityReport {
            generated_at: iso_timestamp_utc(),
            users,
            activities,
            broadcasts,
        })
    }
}
