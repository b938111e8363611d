use std::sync::Arc;

use crate::{
    domain::ChatId,
    messaging::{port::MessagingPort, types::truncate_chars},
};

/// Best-effort sender to the single destination chat.
#[derive(Clone)]
pub struct Notifier {
    messenger: Arc<dyn MessagingPort>,
    chat_id: ChatId,
}

impl Notifier {
    pub fn new(messenger: Arc<dyn MessagingPort>, chat_id: ChatId) -> Self {
        Self { messenger, chat_id }
    }

    /// Send `message`; returns whether it was delivered. Failures are logged, never raised.
    pub async fn notify(&self, message: &str) -> bool {
        let max = self.messenger.capabilities().max_message_len;
        let text = truncate_chars(message, max);

        match self.messenger.send_text(self.chat_id, &text).await {
            Ok(()) => {
                tracing::debug!(chat_id = self.chat_id.0, "bot sent message: '{text}'");
                true
            }
            Err(e) => {
                tracing::error!(chat_id = self.chat_id.0, "failed to send message '{text}': {e}");
                false
            }
        }
    }
}
