//! Логирование на `tracing`: фильтр, консольный и файловый sink-и.

pub mod config;
mod filters;
pub mod formatter;
pub mod handle;
pub mod sinks;

pub use config::{ConsoleConfig, FileConfig, LogFormat, LoggingConfig, Rotation};
pub use handle::LoggingHandle;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Registry};

use postbox_error::{GenericError, PostboxResult, StatusCode};

/// Инициализация глобального подписчика `tracing` по конфигурации.
///
/// `RUST_LOG` имеет приоритет над `config.level`. Повторный вызов в том же
/// процессе возвращает ошибку `AlreadyExists`.
pub fn init_logging(config: &LoggingConfig) -> PostboxResult<LoggingHandle> {
    config.validate()?;

    let env_filter = filters::build_filter(config);
    let mut layers: Vec<formatter::BoxedLayer<Registry>> = Vec::new();

    if config.console.enabled {
        layers.push(sinks::console::layer(config));
    }

    let file_guard = if config.file.enabled {
        let (file_layer, guard) = sinks::file::layer(&config.file)?;
        layers.push(file_layer);
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| GenericError::new(StatusCode::AlreadyExists, e.to_string()))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        filter = %config.build_filter_directive(),
        console_enabled = config.console.enabled,
        file_enabled = config.file.enabled,
        "Logging system initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
