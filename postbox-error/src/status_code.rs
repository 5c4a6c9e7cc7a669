use std::fmt;

use num_enum::TryFromPrimitive;

/// Коды статуса для категоризации ошибок.
///
/// # Диапазоны:
/// - 0xxx: Успех
/// - 1xxx: Общие ошибки
/// - 2xxx: Ошибки данных (payload, расширения сообщений)
/// - 3xxx: Доставка уведомлений
/// - 4xxx: Конфигурация
/// - 6xxx: IO
///
/// `num_enum::TryFromPrimitive` даёт нативную реализацию `TryFrom<u32>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: Успех ===
    Success = 0,

    // === 1xxx: Общие ошибки ===
    Unknown = 1000,
    Unsupported = 1001,
    Unexpected = 1002,
    Internal = 1003,
    InvalidArgs = 1004,

    // === 2xxx: Ошибки данных ===
    NotFound = 2000,
    AlreadyExists = 2001,
    TypeError = 2002,
    MissingField = 2004,
    DeserializationFailed = 2006,
    SerializationFailed = 2007,

    // === 3xxx: Доставка ===
    NoSubscribers = 3000,
    ObserverFailed = 3001,

    // === 4xxx: Конфигурация ===
    ConfigLoadFailed = 4000,
    ConfigInvalid = 4001,

    // === 6xxx: IO ===
    Io = 6000,
    PermissionDenied = 6001,
    UnexpectedEof = 6002,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Пытается получить вариант `StatusCode` из `u32`.
    ///
    /// Возвращает `None`, если значение не соответствует ни одному варианту.
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Вернёт `true`, если переданный `code` означает успешный результат.
    pub fn is_success(code: u32) -> bool {
        Self::Success as u32 == code
    }

    /// Ошибка на стороне вызывающего кода: неверные аргументы или данные,
    /// не совпавшие с ожиданиями наблюдателя.
    pub fn is_caller_error(&self) -> bool {
        (2000..=2999).contains(&self.code()) || matches!(self, Self::InvalidArgs)
    }

    /// Внутренняя или инфраструктурная ошибка (диапазоны `1xxx` и `6xxx`).
    pub fn is_internal_error(&self) -> bool {
        !matches!(self, Self::InvalidArgs) && matches!(self.code(), 1000..=1999 | 6000..=6999)
    }

    /// Ошибка доставки уведомления (диапазон 3xxx).
    pub fn is_delivery_error(&self) -> bool {
        (3000..=3999).contains(&self.code())
    }

    /// Ошибка конфигурации (диапазон 4xxx).
    pub fn is_config_error(&self) -> bool {
        (4000..=4999).contains(&self.code())
    }

    /// Требуется ли логировать как критическую ошибку.
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Internal | Self::Unexpected | Self::Io)
    }

    /// Рекомендуемый уровень логирования для данного кода.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Success => LogLevel::Trace,
            Self::NotFound | Self::AlreadyExists | Self::NoSubscribers => LogLevel::Debug,
            Self::InvalidArgs | Self::TypeError | Self::MissingField => LogLevel::Info,
            Self::Internal | Self::Unexpected | Self::Io => LogLevel::Error,
            _ => LogLevel::Warn,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет разделение ошибок вызывающего кода и внутренних.
    #[test]
    fn test_caller_vs_internal() {
        assert!(StatusCode::InvalidArgs.is_caller_error());
        assert!(StatusCode::TypeError.is_caller_error());
        assert!(StatusCode::MissingField.is_caller_error());
        assert!(!StatusCode::InvalidArgs.is_internal_error());
        assert!(StatusCode::Internal.is_internal_error());
        assert!(StatusCode::Io.is_internal_error());
        assert!(!StatusCode::NoSubscribers.is_internal_error());
    }

    /// Тест проверяет диапазоны доставки и конфигурации.
    #[test]
    fn test_delivery_and_config_ranges() {
        assert!(StatusCode::NoSubscribers.is_delivery_error());
        assert!(StatusCode::ObserverFailed.is_delivery_error());
        assert!(!StatusCode::NotFound.is_delivery_error());
        assert!(StatusCode::ConfigInvalid.is_config_error());
        assert!(!StatusCode::ObserverFailed.is_config_error());
    }

    /// Тест проверяет конвертацию через `TryFrom<u32>` и `from_u32`.
    #[test]
    fn test_from_try_from_u32() {
        let n = StatusCode::NoSubscribers.code();
        assert_eq!(StatusCode::try_from(n).unwrap(), StatusCode::NoSubscribers);
        assert!(StatusCode::from_u32(99999).is_none());
    }

    /// Тест проверяет числовое представление и `From<StatusCode> for u32`.
    #[test]
    fn test_code_and_into() {
        let c = StatusCode::NotFound;
        assert_eq!(c.code(), 2000);
        let n: u32 = c.into();
        assert_eq!(n, 2000);
        assert!(StatusCode::is_success(StatusCode::Success.code()));
        assert!(!StatusCode::is_success(StatusCode::NotFound.code()));
    }

    /// Тест проверяет коды диапазона данных и номера без варианта.
    #[test]
    fn test_data_range_codes() {
        assert_eq!(StatusCode::from_u32(2007), Some(StatusCode::SerializationFailed));
        assert_eq!(StatusCode::from_u32(2006), Some(StatusCode::DeserializationFailed));
        assert!(StatusCode::from_u32(2003).is_none());
        assert!(StatusCode::from_u32(1005).is_none());
        assert!(StatusCode::SerializationFailed.is_caller_error());
    }

    /// Тест проверяет рекомендуемые уровни логирования.
    #[test]
    fn test_log_level_mappings() {
        assert_eq!(StatusCode::Success.log_level(), LogLevel::Trace);
        assert_eq!(StatusCode::NoSubscribers.log_level(), LogLevel::Debug);
        assert_eq!(StatusCode::TypeError.log_level(), LogLevel::Info);
        assert_eq!(StatusCode::ObserverFailed.log_level(), LogLevel::Warn);
        assert_eq!(StatusCode::Internal.log_level(), LogLevel::Error);
    }

    /// Тест проверяет формат `Display` — имя варианта и числовой код.
    #[test]
    fn test_display_contains_name_and_code() {
        let s = format!("{}", StatusCode::MissingField);
        assert!(s.contains("2004"), "Display must contain code, got: {s}");
        assert!(s.contains("MissingField"), "Display must contain name, got: {s}");
    }

    #[test]
    fn test_is_critical() {
        assert!(StatusCode::Internal.is_critical());
        assert!(!StatusCode::NoSubscribers.is_critical());
    }
}
