//! Инициализация `tracing`: фильтр уровней, консольный вывод в одном из
//! трёх форматов и необязательный файл с ежедневной ротацией.

pub mod config;
mod filters;
mod formatter;
pub mod handle;
pub mod sinks;

pub use config::{ConsoleConfig, FileConfig, LogFormat, LoggingConfig};
pub use handle::LoggingHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Registry};

/// Устанавливает глобальный subscriber по конфигурации.
///
/// Повторный вызов возвращает ошибку: глобальный subscriber уже задан.
pub fn init_logging(
    mut config: LoggingConfig
) -> Result<LoggingHandle, Box<dyn std::error::Error + Send + Sync>> {
    config.apply_env_overrides();
    config.validate()?;
    config.ensure_log_dir()?;

    let env_filter = filters::build_filter_from_config(&config);
    let mut layers = Vec::new();

    if let Some(console_layer) = sinks::console::layer_with_config::<Registry>(&config) {
        layers.push(console_layer);
    }

    let file_guard = match sinks::file::layer_with_config::<Registry>(&config) {
        Some((file_layer, guard)) => {
            layers.push(file_layer);
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("REGIONBUS_GIT_COMMIT"),
        log_level = %config.level,
        console_format = ?config.console.format,
        file_enabled = config.file.enabled,
        log_dir = %config.log_dir.display(),
        "Logging system initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
