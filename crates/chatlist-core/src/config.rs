use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Typed configuration for the bot process.
#[derive(Clone, Debug)]
pub struct Config {
    // Credentials
    pub api_id: i32,
    pub api_hash: String,
    pub bot_token: String,

    // Admin console
    pub admin_ids: Vec<i64>,

    // Storage
    pub database_path: PathBuf,

    // Broadcast delivery
    pub broadcast_pace: Duration,
    pub delivery_timeout: Duration,
    pub ledger_write_attempts: u32,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (the process env in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        // Required credentials
        let (Some(api_id), Some(api_hash), Some(bot_token)) =
            (get("API_ID"), get("API_HASH"), get("BOT_TOKEN"))
        else {
            return Err(Error::Config(
                "please set API_ID, API_HASH and BOT_TOKEN in .env".to_string(),
            ));
        };
        let api_id = api_id
            .trim()
            .parse::<i32>()
            .map_err(|_| Error::Config(format!("API_ID must be numeric, got {api_id:?}")))?;

        let admin_ids = parse_csv_i64(get("ADMIN_IDS"));

        let database_path = PathBuf::from(get("DATABASE_PATH").unwrap_or("users.db".to_string()));

        let broadcast_pace =
            Duration::from_millis(parse_u64(get("BROADCAST_PACE_MS")).unwrap_or(100));
        let delivery_timeout =
            Duration::from_millis(parse_u64(get("DELIVERY_TIMEOUT_MS")).unwrap_or(15_000));
        let ledger_write_attempts = parse_u64(get("LEDGER_WRITE_ATTEMPTS"))
            .map(|n| n.clamp(1, 10) as u32)
            .unwrap_or(3);

        Ok(Self {
            api_id,
            api_hash: api_hash.trim().to_string(),
            bot_token: bot_token.trim().to_string(),
            admin_ids,
            database_path,
            broadcast_pace,
            delivery_timeout,
            ledger_write_attempts,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn parse_u64(v: Option<String>) -> Option<u64> {
    v.and_then(|s| s.trim().parse::<u64>().ok())
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
