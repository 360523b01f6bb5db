use std::str::FromStr;

use tracing::{Level, warn};

use crate::config::LoggingSettings;

/// Maps a configured level name to a tracing level, case-insensitively.
/// `warning` is accepted as an alias of `warn`.
pub fn parse_level(name: &str) -> Option<Level> {
    let name = name.trim();
    if name.eq_ignore_ascii_case("warning") {
        return Some(Level::WARN);
    }
    Level::from_str(name).ok()
}

/// Installs a fmt subscriber at the level from `[logging]`.
///
/// Library code only emits events; binaries and tests call this once at their
/// boundary. If a subscriber is already installed this does nothing.
pub fn init(settings: &LoggingSettings) {
    let level = parse_level(&settings.level);

    let installed = tracing_subscriber::fmt()
        .with_max_level(level.unwrap_or(Level::INFO))
        .with_target(false)
        .with_thread_names(true)
        .try_init()
        .is_ok();

    if installed && level.is_none() {
        warn!(level = %settings.level, "unknown log level, using info");
    }
}
