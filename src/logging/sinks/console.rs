use tracing_subscriber::{layer::Layer, registry::LookupSpan};

use crate::logging::{config::LoggingConfig, formatter};

/// Консольный слой по конфигурации или `None`, если консоль выключена.
pub fn layer_with_config<S>(config: &LoggingConfig) -> Option<Box<dyn Layer<S> + Send + Sync>>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    config
        .console
        .enabled
        .then(|| formatter::build_formatter_from_config(&config.console))
}
