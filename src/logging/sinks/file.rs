use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::Layer, registry::LookupSpan};

use crate::logging::config::LoggingConfig;

/// Файловый слой с ежедневной ротацией и неблокирующей записью.
///
/// Пока жив `WorkerGuard`, фоновый поток дописывает буфер в файл.
pub fn layer_with_config<S>(
    config: &LoggingConfig
) -> Option<(Box<dyn Layer<S> + Send + Sync>, WorkerGuard)>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    if !config.file.enabled {
        return None;
    }

    let appender = rolling::daily(&config.log_dir, &config.file.filename);
    let (writer, guard) = non_blocking(appender);
    let layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(writer);

    Some((Box::new(layer), guard))
}
