//! Telegram adapter (teloxide).
//!
//! This crate implements the `hwb-core` MessagingPort over Telegram Bot API.

use async_trait::async_trait;

use teloxide::prelude::*;

use tokio::time::sleep;

use hwb_core::{
    domain::ChatId,
    errors::Error,
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn from_token(token: impl Into<String>) -> Self {
        Self::new(Bot::new(token))
    }

    /// `@username` of the bot, for the startup banner.
    pub async fn username(&self) -> Result<String> {
        let me = self.with_retry(|| self.bot.get_me()).await?;
        Ok(me.username().to_string())
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Delivery(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        tracing::warn!("telegram flood control, retrying in {d:?}");
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: 4096,
        }
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        // Plain text: homework names and error details are not HTML-escaped.
        self.with_retry(|| {
            self.bot
                .send_message(Self::tg_chat(chat_id), text.to_string())
        })
        .await?;
        Ok(())
    }
}
