use std::{fs::OpenOptions, path::Path, sync::Mutex};

use crate::{errors::Error, Result};

/// Initialize logging/tracing for the bot.
///
/// Always logs to stdout; when `log_file` is given, the same events are also
/// appended to that file (without ANSI colors).
pub fn init(service_name: &str, log_file: Option<&Path>) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    // Default: debug for our crates, info for everything else.
    // Can be overridden with `RUST_LOG`.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "info,hwb_core=debug,hwb_practicum=debug,hwb_telegram=debug,{}=debug",
            service_name.replace('-', "_")
        ))
    });

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_line_number(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_ansi(true))
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("failed to install log subscriber: {e}")))?;

    Ok(())
}
