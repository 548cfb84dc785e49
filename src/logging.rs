use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub(crate) const LOG_LEVEL_ENV: &str = "LLM_ONBOARD_LOG";

/// `--verbose` wins; otherwise `LLM_ONBOARD_LOG`; otherwise WARN so the
/// interactive prompts stay readable.
pub(crate) fn resolve_level(verbose: bool, env_value: Option<&str>) -> Level {
    if verbose {
        return Level::DEBUG;
    }
    env_value
        .and_then(|v| Level::from_str(v.trim()).ok())
        .unwrap_or(Level::WARN)
}

pub(crate) fn init(verbose: bool) {
    let env_value = std::env::var(LOG_LEVEL_ENV).ok();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(resolve_level(verbose, env_value.as_deref()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok(); // Already set in tests
}
