use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing_appender::rolling::Rotation as AppenderRotation;
use tracing_subscriber::EnvFilter;

use crate::config::SettingsError;

/// Конфигурация логирования.
///
/// Раздел `logging` в [`Settings`](crate::config::Settings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Базовая директива фильтра (`"info"`, `"warn,postbox=debug"`).
    pub level: String,
    /// Отдельный уровень для подсистемы уведомлений (`postbox::pubsub`).
    pub pubsub_level: Option<String>,
    /// Формат консольного вывода.
    pub format: LogFormat,
    pub console: ConsoleConfig,
    pub file: FileConfig,
}

/// Формат строк лога.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub with_line_numbers: bool,
}

/// Файловый sink: ротация через `tracing-appender`, запись в фоновом потоке.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    pub filename: String,
    pub rotation: Rotation,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

impl LoggingConfig {
    /// Итоговая директива для `EnvFilter`.
    pub fn build_filter_directive(&self) -> String {
        match &self.pubsub_level {
            Some(level) => format!("{},postbox::pubsub={level}", self.level),
            None => self.level.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let directive = self.build_filter_directive();
        if let Err(e) = EnvFilter::try_new(&directive) {
            return Err(SettingsError::Invalid {
                field: "logging.level",
                reason: format!("bad filter directive \"{directive}\": {e}"),
            });
        }
        if self.file.enabled && self.file.filename.trim().is_empty() {
            return Err(SettingsError::Invalid {
                field: "logging.file.filename",
                reason: "file sink is enabled but filename is empty".to_string(),
            });
        }
        Ok(())
    }
}

impl Rotation {
    pub(crate) fn to_appender(self) -> AppenderRotation {
        match self {
            Rotation::Minutely => AppenderRotation::MINUTELY,
            Rotation::Hourly => AppenderRotation::HOURLY,
            Rotation::Daily => AppenderRotation::DAILY,
            Rotation::Never => AppenderRotation::NEVER,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            pubsub_level: None,
            format: LogFormat::default(),
            console: ConsoleConfig::default(),
            file: FileConfig::default(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
            with_line_numbers: false,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from("logs"),
            filename: "postbox.log".to_string(),
            rotation: Rotation::default(),
            format: LogFormat::Json,
        }
    }
}
