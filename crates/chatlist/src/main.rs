use std::sync::Arc;

use chatlist_core::{config::Config, store::SqliteStore};

#[tokio::main]
async fn main() -> Result<(), chatlist_core::Error> {
    chatlist_core::logging::init("chatlist")?;

    let cfg = Arc::new(Config::load()?);
    let store = SqliteStore::open(&cfg.database_path).await?;

    let result = chatlist_telegram::router::run_polling(cfg, store.clone())
        .await
        .map_err(|e| chatlist_core::Error::External(format!("telegram bot failed: {e}")));

    store.close().await;
    tracing::info!("chatlist stopped");
    result
}
