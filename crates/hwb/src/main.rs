use std::sync::Arc;

use hwb_core::{
    config::{self, Config},
    domain::Cursor,
    notifier::Notifier,
    poller::Poller,
};
use hwb_practicum::PracticumClient;
use hwb_telegram::TelegramMessenger;

#[tokio::main]
async fn main() -> Result<(), hwb_core::Error> {
    let dotenv = config::load_dotenv();
    hwb_core::logging::init("hwb", config::log_file_from_env().as_deref())?;
    if let Err(e) = dotenv {
        tracing::warn!("{e}");
    }

    let cfg = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("startup aborted: {e}");
            return Err(e);
        }
    };

    let source = Arc::new(PracticumClient::from_config(&cfg)?);
    let messenger = Arc::new(TelegramMessenger::from_token(cfg.telegram_token.clone()));

    match messenger.username().await {
        Ok(name) => tracing::info!("hwb started: @{name}"),
        Err(e) => tracing::warn!("could not fetch bot identity: {e}"),
    }
    tracing::debug!(?cfg, "config loaded");
    tracing::info!(
        endpoint = %source.endpoint(),
        chat_id = cfg.telegram_chat_id.0,
        "watching homework statuses"
    );

    let notifier = Notifier::new(messenger, cfg.telegram_chat_id);
    let mut poller = Poller::new(source, notifier, cfg.retry_period, Cursor::now());
    poller.run().await;

    Ok(())
}
