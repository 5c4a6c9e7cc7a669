use tracing_subscriber::{
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::Layer as LayerTrait,
    registry::LookupSpan,
};

use crate::logging::config::{ConsoleConfig, LogFormat};

/// Boxed fmt-слой: конкретный тип формата (json/pretty/compact) стёрт.
pub type BoxedLayer<S> = Box<dyn LayerTrait<S> + Send + Sync>;

/// Параметры оформления строки лога.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    pub ansi: bool,
    pub target: bool,
    pub thread_ids: bool,
    pub line_numbers: bool,
}

impl FormatOptions {
    /// Оформление для файла: без ANSI-последовательностей.
    pub fn plain() -> Self {
        Self {
            ansi: false,
            target: true,
            thread_ids: false,
            line_numbers: false,
        }
    }
}

impl From<&ConsoleConfig> for FormatOptions {
    fn from(console: &ConsoleConfig) -> Self {
        Self {
            ansi: console.with_ansi,
            target: console.with_target,
            thread_ids: console.with_thread_ids,
            line_numbers: console.with_line_numbers,
        }
    }
}

/// Собирает fmt-слой заданного формата поверх произвольного writer.
pub fn build_layer<S, W>(
    format: LogFormat,
    writer: W,
    options: FormatOptions,
) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let base = fmt::layer()
        .with_writer(writer)
        .with_ansi(options.ansi)
        .with_target(options.target)
        .with_thread_ids(options.thread_ids)
        .with_line_number(options.line_numbers);

    match format {
        LogFormat::Json => base.json().with_current_span(true).boxed(),
        LogFormat::Pretty => base.pretty().with_span_events(FmtSpan::CLOSE).boxed(),
        LogFormat::Compact => base.compact().boxed(),
    }
}
