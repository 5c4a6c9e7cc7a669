use std::io::{self, Stdout};

use tracing_subscriber::registry::LookupSpan;

use crate::logging::{
    config::LoggingConfig,
    formatter::{self, BoxedLayer, FormatOptions},
};

/// Консольный слой в формате `config.format`.
pub fn layer<S>(config: &LoggingConfig) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    let writer: fn() -> Stdout = io::stdout;
    formatter::build_layer(config.format, writer, FormatOptions::from(&config.console))
}
