//! Append-only audit trail of executed broadcasts.

use std::time::Duration;

use async_trait::async_trait;

use crate::{
    domain::{BroadcastMode, UserId},
    Result,
};

/// One row per executed (not cancelled) broadcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BroadcastRecord {
    pub admin_id: UserId,
    pub payload_text: String,
    pub broadcast_type: BroadcastMode,
    /// UTC, `YYYY-MM-DD HH:MM:SS`.
    pub sent_time: String,
    pub total_recipients: usize,
    pub successful_sends: usize,
}

#[async_trait]
pub trait BroadcastLedger: Send + Sync {
    async fn append(&self, record: &BroadcastRecord) -> Result<()>;
}

/// Append with up to `attempts` tries and linear backoff.
///
/// Returns the last error when every attempt failed; the caller owns the record
/// and decides how to surface the loss.
pub async fn append_with_retry(
    ledger: &dyn BroadcastLedger,
    record: &BroadcastRecord,
    attempts: u32,
    backoff: Duration,
) -> Result<()> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match ledger.append(record).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    attempt,
                    attempts,
                    admin_id = record.admin_id.0,
                    error = %e,
                    "broadcast ledger write failed, retrying"
                );
                tokio::time::sleep(backoff * attempt).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
