use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use chatlist_core::{
    broadcast::{AdminConsole, ConsoleConfig},
    config::Config,
    directory::UserDirectory,
    messaging::port::MessagingPort,
    security::AdminAllowList,
    store::SqliteStore,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub console: Arc<AdminConsole>,
    pub directory: Arc<dyn UserDirectory>,
    pub messenger: Arc<dyn MessagingPort>,
}

impl AppState {
    pub fn new(cfg: Arc<Config>, store: SqliteStore, messenger: Arc<dyn MessagingPort>) -> Self {
        let store = Arc::new(store);
        let console = AdminConsole::new(
            AdminAllowList::new(cfg.admin_ids.clone()),
            store.clone(),
            store.clone(),
            store.clone(),
            messenger.clone(),
            ConsoleConfig::from(cfg.as_ref()),
        );
        Self {
            cfg,
            console: Arc::new(console),
            directory: store,
            messenger,
        }
    }
}

pub async fn run_polling(cfg: Arc<Config>, store: SqliteStore) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());

    // Basic startup info.
    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "chatlist started"),
        Err(e) => tracing::warn!(error = %e, "get_me failed; continuing"),
    }
    if cfg.admin_ids.is_empty() {
        tracing::warn!("ADMIN_IDS is empty; the admin panel is disabled");
    } else {
        tracing::info!(admins = cfg.admin_ids.len(), "admin panel enabled");
    }

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let state = Arc::new(AppState::new(cfg, store, messenger));

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
