use async_trait::async_trait;

use crate::{domain::ChatId, messaging::types::MessagingCapabilities, Result};

/// Outbound messenger port.
///
/// Telegram is the only implementation; adapters map their transport errors
/// into [`crate::Error::Delivery`].
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;
}
