use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки публикации.
///
/// Обычная `publish` не считает канал без слушателей ошибкой (только
/// диагностикой); строгий вариант возвращает [`PublishError::NoSubscribers`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// На канал никто не подписан.
    #[error("can't post notification on channel \"{channel}\" because nobody is listening")]
    NoSubscribers { channel: String },
}

/// Ошибки интерпретации содержимого сообщения наблюдателем.
///
/// Возникают, когда издатель и наблюдатель по-разному понимают форму
/// сообщения для канала. Это ошибка контракта, а не повод для паники:
/// наблюдатель либо логирует её и продолжает работу, либо пробрасывает `?`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// В payload нет ключа.
    #[error("payload has no field \"{key}\"")]
    MissingField { key: String },

    /// Значение по ключу имеет другой тип.
    #[error("payload field \"{key}\" is {found}, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Сообщение не несёт типизированного расширения.
    #[error("message carries no extension")]
    NoExtension,

    /// Расширение сообщения имеет другой тип.
    #[error("message extension is not a {expected}")]
    ExtensionMismatch { expected: &'static str },

    /// Структуру не удалось разложить в payload.
    #[error("failed to encode payload: {reason}")]
    Encode { reason: String },

    /// Payload не удалось разобрать в запрошенную структуру.
    #[error("failed to decode payload: {reason}")]
    Decode { reason: String },

    /// Значение нельзя положить в payload (вложенные объекты, массивы и т.п.).
    #[error("payload field \"{key}\" has unsupported kind: {kind}")]
    Unsupported { key: String, kind: &'static str },
}

impl ErrorExt for PublishError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NoSubscribers { .. } => StatusCode::NoSubscribers,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn log_tags(&self) -> Vec<(&'static str, String)> {
        let Self::NoSubscribers { channel } = self;
        vec![
            ("error_type", "pubsub_publish".to_string()),
            ("status_code", self.status_code().to_string()),
            ("channel", channel.clone()),
        ]
    }
}

impl ErrorExt for PayloadError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingField { .. } => StatusCode::MissingField,
            Self::TypeMismatch { .. } | Self::ExtensionMismatch { .. } => StatusCode::TypeError,
            Self::NoExtension => StatusCode::NotFound,
            Self::Encode { .. } => StatusCode::SerializationFailed,
            Self::Decode { .. } => StatusCode::DeserializationFailed,
            Self::Unsupported { .. } => StatusCode::Unsupported,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn log_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "pubsub_payload".to_string()),
            ("status_code", self.status_code().to_string()),
        ];

        match self {
            Self::MissingField { key }
            | Self::TypeMismatch { key, .. }
            | Self::Unsupported { key, .. } => {
                tags.push(("field", key.clone()));
            }
            Self::ExtensionMismatch { expected } => {
                tags.push(("expected", (*expected).to_string()));
            }
            _ => {}
        }

        tags
    }
}
