use tracing_subscriber::EnvFilter;

use super::config::LoggingConfig;

/// `RUST_LOG`, если задана, иначе директива из конфигурации.
///
/// Некорректная директива из конфигурации заменяется на `info`.
pub fn build_filter_from_config(config: &LoggingConfig) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let directive = config.build_filter_directive();
    EnvFilter::try_new(&directive).unwrap_or_else(|err| {
        eprintln!("Invalid log filter directive '{directive}': {err}; falling back to 'info'");
        EnvFilter::new("info")
    })
}
