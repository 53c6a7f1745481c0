/// Core error type.
///
/// Adapter crates map their specific errors into this type so handlers can
/// decide between a user-facing reply, an alert, or a log line.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("not authorized")]
    Authorization,

    #[error("admin session state lost")]
    StateLost,

    #[error("invalid broadcast: {0}")]
    InvalidBroadcast(String),

    #[error("delivery to {recipient} failed: {cause}")]
    Delivery { recipient: i64, cause: String },

    #[error("rate limited sending to {recipient}; retry after {retry_after:?}")]
    RateLimited {
        recipient: i64,
        retry_after: std::time::Duration,
    },

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for Error {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::Persistence(format!("migration failed: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
