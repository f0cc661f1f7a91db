use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tokio_util::sync::CancellationToken;

use shoppy_core::{
    config::Config,
    messaging::port::MessagingPort,
    router::{Router, RouterSettings},
    store::Stores,
};

use crate::{handlers, maintenance, TelegramMessenger};

pub struct AppState {
    pub router: Router,
}

/// Bot handle for invite links: configured, else asked from Telegram.
async fn bot_username(bot: &Bot, cfg: &Config) -> anyhow::Result<String> {
    if let Some(name) = cfg.bot_username.as_deref() {
        return Ok(name.to_string());
    }
    let me = bot.get_me().await?;
    Ok(me.username().to_string())
}

pub async fn run_polling(cfg: Arc<Config>, stores: Stores) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let username = bot_username(&bot, &cfg).await?;
    tracing::info!(bot = %username, "shoppy started");

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let settings = RouterSettings::new(&cfg, username);
    let state = Arc::new(AppState {
        router: Router::new(stores.clone(), messenger, settings),
    });

    let cancel = CancellationToken::new();
    let pruner = maintenance::spawn_activity_pruner(
        stores.activity.clone(),
        cfg.activity_retention_days,
        cfg.activity_prune_interval,
        cancel.clone(),
    );

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    tracing::info!("dispatcher stopped, shutting down");
    cancel.cancel();
    if let Err(e) = pruner.await {
        tracing::warn!(error = %e, "activity pruner ended abnormally");
    }

    Ok(())
}
