use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{domain::ChatId, errors::Error, Result};

pub const DEFAULT_ENDPOINT: &str = "https://practicum.yandex.ru/api/user_api/homework_statuses/";
pub const DEFAULT_RETRY_PERIOD_SECS: u64 = 600;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Required credentials, in the order they are checked.
const REQUIRED: [&str; 3] = ["PRACTICUM_TOKEN", "TELEGRAM_TOKEN", "TELEGRAM_CHAT_ID"];

/// Typed configuration, built once at startup and handed to each component.
#[derive(Clone)]
pub struct Config {
    // Credentials
    pub practicum_token: String,
    pub telegram_token: String,
    pub telegram_chat_id: ChatId,

    // Review API
    pub endpoint: String,
    pub http_timeout: Duration,

    // Poll loop
    pub retry_period: Duration,

    // Logging
    pub log_file: Option<PathBuf>,
}

// Tokens stay out of Debug output so a config dump never lands in a log line.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("practicum_token", &"<redacted>")
            .field("telegram_token", &"<redacted>")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("endpoint", &self.endpoint)
            .field("http_timeout", &self.http_timeout)
            .field("retry_period", &self.retry_period)
            .field("log_file", &self.log_file)
            .finish()
    }
}

impl Config {
    /// Load from the process environment. Call [`load_dotenv`] first to pick up `.env`.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Fails on the first missing credential.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        for name in REQUIRED {
            if get(name).is_none() {
                return Err(Error::CredentialMissing { name });
            }
        }

        let practicum_token = get("PRACTICUM_TOKEN").unwrap_or_default();
        let telegram_token = get("TELEGRAM_TOKEN").unwrap_or_default();
        let raw_chat_id = get("TELEGRAM_CHAT_ID").unwrap_or_default();
        let telegram_chat_id = raw_chat_id
            .trim()
            .parse::<i64>()
            .map(ChatId)
            .map_err(|e| Error::Config(format!("TELEGRAM_CHAT_ID is not an integer: {e}")))?;

        let endpoint = get("PRACTICUM_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let http_timeout = Duration::from_secs(
            parse_u64(get("HTTP_TIMEOUT_SECS"), "HTTP_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        );
        let retry_period = Duration::from_secs(
            parse_u64(get("RETRY_PERIOD_SECS"), "RETRY_PERIOD_SECS")?
                .unwrap_or(DEFAULT_RETRY_PERIOD_SECS),
        );
        let log_file = get("LOG_FILE").map(PathBuf::from);

        Ok(Self {
            practicum_token,
            telegram_token,
            telegram_chat_id,
            endpoint,
            http_timeout,
            retry_period,
            log_file,
        })
    }
}

/// Load `.env` from the working directory without overriding variables already set.
pub fn load_dotenv() -> Result<()> {
    load_dotenv_from(Path::new(".env"))
}

/// A missing file is fine; an unreadable or malformed one is an error.
pub fn load_dotenv_from(path: &Path) -> Result<()> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(Error::Config(format!(
            "failed to load {}: {e}",
            path.display()
        ))),
    }
}

/// `LOG_FILE` from the environment; read before logging (and thus config) is set up.
pub fn log_file_from_env() -> Option<PathBuf> {
    env::var("LOG_FILE").ok().and_then(non_empty).map(PathBuf::from)
}

fn parse_u64(v: Option<String>, key: &str) -> Result<Option<u64>> {
    v.map(|s| {
        s.trim()
            .parse::<u64>()
            .map_err(|e| Error::Config(format!("{key} must be a non-negative integer: {e}")))
    })
    .transpose()
}

fn non_empty(s: String) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
