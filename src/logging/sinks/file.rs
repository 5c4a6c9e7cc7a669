use std::{fs, io};

use tracing_appender::{non_blocking::WorkerGuard, rolling::RollingFileAppender};
use tracing_subscriber::registry::LookupSpan;

use crate::logging::{
    config::FileConfig,
    formatter::{self, BoxedLayer, FormatOptions},
};

/// Файловый слой с ротацией и неблокирующей записью.
///
/// Возвращённый [`WorkerGuard`] нужно держать до конца работы: при его drop
/// буфер сбрасывается на диск.
pub fn layer<S>(config: &FileConfig) -> io::Result<(BoxedLayer<S>, WorkerGuard)>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    fs::create_dir_all(&config.dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(config.rotation.to_appender())
        .filename_prefix(&config.filename)
        .build(&config.dir)
        .map_err(io::Error::other)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = formatter::build_layer(config.format, writer, FormatOptions::plain());
    Ok((layer, guard))
}
