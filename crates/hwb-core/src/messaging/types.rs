/// Capabilities / limits of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub max_message_len: usize,
}

impl Default for MessagingCapabilities {
    fn default() -> Self {
        // Telegram's hard limit for a single text message.
        Self {
            max_message_len: 4096,
        }
    }
}

/// Truncate `text` to at most `max_chars` characters, marking the cut with an ellipsis.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars < 3 {
        return text.chars().take(max_chars).collect();
    }
    let keep = max_chars.saturating_sub(3);
    format!("{}...", text.chars().take(keep).collect::<String>())
}
