use std::{any::Any, fmt, path::Path, str::FromStr};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use postbox_error::{ErrorExt, StatusCode};

use crate::logging::LoggingConfig;

/// Префикс переменных окружения: `POSTBOX_BROKER__TRACE_DISPATCH=true`.
pub const ENV_PREFIX: &str = "POSTBOX";

/// Корневая конфигурация.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub broker: BrokerConfig,
    pub logging: LoggingConfig,
}

/// Настройки брокера.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Уровень диагностики «nobody is listening» при публикации в канал без
    /// наблюдателей.
    pub no_listener_level: DiagnosticLevel,
    /// Писать trace-событие на каждый вызов наблюдателя.
    pub trace_dispatch: bool,
}

/// Уровень, на котором брокер пишет диагностику.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Off,
    Debug,
    Info,
    Warn,
    #[default]
    Error,
}

/// Ошибки загрузки и проверки конфигурации.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Ошибка источника или десериализации (`config` crate).
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    /// Значение загружено, но не прошло проверку.
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Settings {
    /// Загружает конфигурацию из значений по умолчанию и окружения.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(None)
    }

    /// Загружает конфигурацию: значения по умолчанию, затем файл (если
    /// указан, он обязателен), затем переменные окружения `POSTBOX_*`.
    ///
    /// Вложенные ключи в окружении разделяются `__`:
    /// `POSTBOX_LOGGING__FILE__ENABLED=true`.
    pub fn load_from(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder()
            .set_default("broker.no_listener_level", "error")?
            .set_default("broker.trace_dispatch", false)?
            .set_default("logging.level", "info")?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        tracing::debug!(?path, "settings loaded");
        Ok(settings)
    }

    /// Проверяет значения, которые нельзя выразить типами.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.logging.validate()
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            no_listener_level: DiagnosticLevel::Error,
            trace_dispatch: false,
        }
    }
}

impl DiagnosticLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticLevel::Off => "off",
            DiagnosticLevel::Debug => "debug",
            DiagnosticLevel::Info => "info",
            DiagnosticLevel::Warn => "warn",
            DiagnosticLevel::Error => "error",
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for DiagnosticLevel {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagnosticLevel {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(DiagnosticLevel::Off),
            "debug" => Ok(DiagnosticLevel::Debug),
            "info" => Ok(DiagnosticLevel::Info),
            "warn" | "warning" => Ok(DiagnosticLevel::Warn),
            "error" => Ok(DiagnosticLevel::Error),
            other => Err(SettingsError::Invalid {
                field: "broker.no_listener_level",
                reason: format!("unknown level \"{other}\""),
            }),
        }
    }
}

impl ErrorExt for SettingsError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Load(_) => StatusCode::ConfigLoadFailed,
            Self::Invalid { .. } => StatusCode::ConfigInvalid,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn log_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "settings".to_string()),
            ("status_code", self.status_code().to_string()),
        ];
        if let Self::Invalid { field, .. } = self {
            tags.push(("field", (*field).to_string()));
        }
        tags
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::{env, io::Write};

    use postbox_error::StackError;
    use rstest::rstest;
    use serial_test::serial;
    use tempfile::Builder;

    use super::*;
    use crate::logging::LogFormat;

    fn clear_env() {
        for (key, _) in env::vars() {
            if key.starts_with("POSTBOX_") {
                env::remove_var(key);
            }
        }
    }

    /// Тест проверяет значения по умолчанию без файла и окружения.
    #[test]
    #[serial]
    fn test_load_defaults() {
        clear_env();
        let settings = Settings::load().unwrap();
        assert_eq!(settings.broker, BrokerConfig::default());
        assert_eq!(settings.broker.no_listener_level, DiagnosticLevel::Error);
        assert_eq!(settings.logging.level, "info");
    }

    /// Тест проверяет переопределение через переменные окружения.
    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        env::set_var("POSTBOX_BROKER__NO_LISTENER_LEVEL", "warn");
        env::set_var("POSTBOX_BROKER__TRACE_DISPATCH", "true");
        env::set_var("POSTBOX_LOGGING__LEVEL", "debug");

        let settings = Settings::load();
        clear_env();

        let settings = settings.unwrap();
        assert_eq!(settings.broker.no_listener_level, DiagnosticLevel::Warn);
        assert!(settings.broker.trace_dispatch);
        assert_eq!(settings.logging.level, "debug");
    }

    /// Тест проверяет загрузку из toml-файла и приоритет окружения над ним.
    #[test]
    #[serial]
    fn test_load_from_file() {
        clear_env();
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[broker]
no_listener_level = "off"

[logging]
level = "warn"
format = "json"
"#
        )
        .unwrap();

        let settings = Settings::load_from(Some(file.path())).unwrap();
        assert_eq!(settings.broker.no_listener_level, DiagnosticLevel::Off);
        assert_eq!(settings.logging.level, "warn");
        assert_eq!(settings.logging.format, LogFormat::Json);

        env::set_var("POSTBOX_LOGGING__LEVEL", "trace");
        let settings = Settings::load_from(Some(file.path()));
        clear_env();
        assert_eq!(settings.unwrap().logging.level, "trace");
    }

    /// Тест проверяет, что отсутствующий обязательный файл — ошибка загрузки.
    #[test]
    #[serial]
    fn test_missing_file_is_error() {
        clear_env();
        let err = Settings::load_from(Some(Path::new("/nonexistent/postbox.toml"))).unwrap_err();
        assert!(matches!(err, SettingsError::Load(_)));
        assert_eq!(err.status_code(), StatusCode::ConfigLoadFailed);
    }

    /// Тест проверяет, что некорректный уровень диагностики не проходит.
    #[test]
    #[serial]
    fn test_invalid_level_rejected() {
        clear_env();
        env::set_var("POSTBOX_BROKER__NO_LISTENER_LEVEL", "loud");
        let res = Settings::load();
        clear_env();
        assert!(matches!(res, Err(SettingsError::Load(_))));
    }

    #[test]
    fn test_validate_bad_filter_directive() {
        let mut settings = Settings::default();
        settings.logging.level = "postbox=loud".to_string();
        let err = settings.validate().unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { field: "logging.level", .. }));

        let stack: StackError = err.into();
        assert_eq!(stack.status_code(), StatusCode::ConfigInvalid);
    }

    #[rstest]
    #[case("off", DiagnosticLevel::Off)]
    #[case("none", DiagnosticLevel::Off)]
    #[case("DEBUG", DiagnosticLevel::Debug)]
    #[case("info", DiagnosticLevel::Info)]
    #[case("warning", DiagnosticLevel::Warn)]
    #[case(" error ", DiagnosticLevel::Error)]
    fn test_diagnostic_level_from_str(
        #[case] input: &str,
        #[case] expected: DiagnosticLevel,
    ) {
        assert_eq!(input.parse::<DiagnosticLevel>().unwrap(), expected);
        assert_eq!(expected.to_string().parse::<DiagnosticLevel>().unwrap(), expected);
    }

    #[test]
    fn test_diagnostic_level_from_str_unknown() {
        let err = "loud".parse::<DiagnosticLevel>().unwrap_err();
        assert!(err.to_string().contains("loud"));
    }
}
