use std::io::{self, Stdout};

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::Layer,
    registry::LookupSpan,
};

use super::config::{ConsoleConfig, LogFormat};

/// Консольный слой в выбранном формате. Тип формата стирается в
/// `Box<dyn Layer>`.
pub fn build_formatter_from_config<S>(
    console: &ConsoleConfig
) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let writer: fn() -> Stdout = io::stdout;

    match console.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .event_format(fmt::format().json().with_current_span(true))
                .with_writer(writer)
                .with_ansi(false)
                .with_target(console.with_target)
                .with_thread_names(console.with_thread_names)
                .with_line_number(console.with_line_numbers);
            Box::new(layer)
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .event_format(fmt::format().pretty())
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(writer)
                .with_ansi(console.with_ansi)
                .with_target(console.with_target)
                .with_thread_names(console.with_thread_names)
                .with_line_number(console.with_line_numbers);
            Box::new(layer)
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .event_format(fmt::format().compact())
                .with_writer(writer)
                .with_ansi(console.with_ansi)
                .with_target(console.with_target)
                .with_thread_names(console.with_thread_names)
                .with_line_number(console.with_line_numbers);
            Box::new(layer)
        }
    }
}
